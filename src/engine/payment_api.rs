use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::PaymentAPI,
    auth::{Account, User},
    entities::Transaction,
    error::{invalid_input_error, invalid_state_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> PaymentAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn record_payment(
        &self,
        user: User,
        application_id: String,
        reference: String,
    ) -> Result<Transaction, Error> {
        if reference.trim().is_empty() {
            return Err(invalid_input_error());
        }

        let application =
            retry_with_backoff(&self.retry, || self.store.fetch_application(&application_id))
                .await?;

        self.authorize(user, "pay", application.clone())?;

        if application.is_paid() {
            tracing::info!("application already paid");
            return Err(invalid_state_error());
        }

        let now = Utc::now();
        let transaction = Transaction::new(&application, reference, now);

        // the store re-checks the application and annotates it in the same unit
        retry_with_backoff(&self.retry, || {
            self.store.insert_transaction(&transaction, now)
        })
        .await?;

        tracing::info!(transaction_id = %transaction.id, amount = transaction.amount, "payment recorded");

        Ok(transaction)
    }

    #[tracing::instrument(skip(self))]
    async fn list_transactions(
        &self,
        user: User,
        account_id: String,
    ) -> Result<Vec<Transaction>, Error> {
        self.authorize(user, "list_transactions", Account::new(account_id.clone()))?;

        retry_with_backoff(&self.retry, || self.store.transactions_by_account(&account_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{apply, booking, engine, rider, vendor};
    use crate::api::{ApplicationAPI, ArbitrationAPI, PaymentAPI};
    use crate::entities::Payment;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn rider_pays_accepted_application_once() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;
        engine
            .accept_application(r1.clone(), b.id.clone(), a1.id.clone())
            .await
            .unwrap();

        let transaction = engine
            .record_payment(r1.clone(), a1.id.clone(), "pay_Nx81".into())
            .await
            .unwrap();
        assert_eq!(transaction.amount, 1500.0);
        assert_eq!(transaction.booking_id, b.id);
        assert_eq!(transaction.vendor_id, "v1");
        assert_eq!(transaction.reference, "pay_Nx81");

        let paid = engine.find_application(v1.clone(), a1.id.clone()).await.unwrap();
        assert!(matches!(
            paid.payment,
            Payment::Paid { ref transaction_id, .. } if *transaction_id == transaction.id
        ));

        let err = engine
            .record_payment(r1.clone(), a1.id, "pay_Nx82".into())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state_error());

        for (user, account) in [(r1, "r1"), (v1, "v1")] {
            let ledger = engine
                .list_transactions(user, account.into())
                .await
                .unwrap();
            assert_eq!(ledger, vec![transaction.clone()]);
        }
    }

    #[tokio::test]
    async fn pending_application_cannot_be_paid() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &vendor("v1"), &b, 1500.0).await;

        let err = engine
            .record_payment(r1.clone(), a1.id, "pay_Nx81".into())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state_error());

        assert!(engine
            .list_transactions(r1, "r1".into())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn only_the_rider_pays() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");
        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;
        engine
            .accept_application(r1, b.id, a1.id.clone())
            .await
            .unwrap();

        for user in [v1, rider("r2")] {
            let err = engine
                .record_payment(user, a1.id.clone(), "pay_Nx81".into())
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Unauthorized);
        }
    }

    #[tokio::test]
    async fn blank_reference_is_invalid() {
        let engine = engine();

        let err = engine
            .record_payment(rider("r1"), "b_v1".into(), "  ".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn ledger_is_private() {
        let engine = engine();

        let err = engine
            .list_transactions(rider("r2"), "r1".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
