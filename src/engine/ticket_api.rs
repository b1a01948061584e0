use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::TicketAPI,
    auth::User,
    entities::{ApplicationStatus, Ticket},
    error::{invalid_state_error, unexpected_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> TicketAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn find_ticket(&self, user: User, booking_id: String) -> Result<Ticket, Error> {
        let booking =
            retry_with_backoff(&self.retry, || self.store.fetch_booking(&booking_id)).await?;

        self.authorize(user, "read_ticket", booking.clone())?;

        if !booking.is_settled() {
            return Err(invalid_state_error());
        }

        let applications = retry_with_backoff(&self.retry, || {
            self.store.applications_by_booking(&booking_id)
        })
        .await?;

        let application = applications
            .into_iter()
            .find(|application| application.status == ApplicationStatus::Accepted)
            .ok_or_else(|| {
                tracing::warn!("settled booking without an accepted application");
                unexpected_error()
            })?;

        let transaction = retry_with_backoff(&self.retry, || {
            self.store.transaction_for_application(&application.id)
        })
        .await?;

        Ok(Ticket {
            booking,
            application,
            transaction,
            issued_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{apply, booking, engine, rider, vendor};
    use crate::api::{ArbitrationAPI, BookingAPI, PaymentAPI, TicketAPI};
    use crate::entities::BookingStatus;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn ticket_combines_booking_quote_and_payment() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;
        apply(&engine, &vendor("v2"), &b, 1800.0).await;

        let err = engine
            .find_ticket(r1.clone(), b.id.clone())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state_error());

        engine
            .accept_application(r1.clone(), b.id.clone(), a1.id.clone())
            .await
            .unwrap();

        let ticket = engine.find_ticket(v1.clone(), b.id.clone()).await.unwrap();
        assert_eq!(ticket.booking.status, BookingStatus::Accepted);
        assert_eq!(ticket.application.id, a1.id);
        assert!(ticket.transaction.is_none());

        let transaction = engine
            .record_payment(r1.clone(), a1.id, "pay_Nx81".into())
            .await
            .unwrap();

        engine
            .update_booking_status(v1, b.id.clone(), BookingStatus::Completed)
            .await
            .unwrap();

        let ticket = engine.find_ticket(r1, b.id).await.unwrap();
        assert_eq!(ticket.booking.status, BookingStatus::Completed);
        assert!(ticket.application.is_paid());
        assert_eq!(ticket.transaction, Some(transaction));
    }

    #[tokio::test]
    async fn losing_vendor_gets_no_ticket() {
        let engine = engine();
        let r1 = rider("r1");
        let v2 = vendor("v2");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &vendor("v1"), &b, 1500.0).await;
        apply(&engine, &v2, &b, 1800.0).await;
        engine
            .accept_application(r1, b.id.clone(), a1.id)
            .await
            .unwrap();

        let err = engine.find_ticket(v2, b.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
