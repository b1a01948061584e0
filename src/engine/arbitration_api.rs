use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::ArbitrationAPI,
    arbitration::Settlement,
    auth::User,
    error::{invalid_state_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> ArbitrationAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn accept_application(
        &self,
        user: User,
        booking_id: String,
        application_id: String,
    ) -> Result<Settlement, Error> {
        let booking =
            retry_with_backoff(&self.retry, || self.store.fetch_booking(&booking_id)).await?;

        self.authorize(user, "accept", booking.clone())?;

        if !booking.is_pending() {
            return Err(invalid_state_error());
        }

        // the store settles under an exclusive hold on the booking, so a
        // concurrent accept observes the settled state and fails
        let settlement = retry_with_backoff(&self.retry, || {
            self.store
                .settle_booking(&booking_id, &application_id, Utc::now())
        })
        .await?;

        tracing::info!(
            vendor_id = %settlement.accepted.vendor_id,
            notification_id = %settlement.notification.id,
            "application accepted"
        );

        Ok(settlement)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::fixtures::{apply, booking, engine, rider, vendor};
    use crate::api::{ApplicationAPI, ArbitrationAPI, BookingAPI, NotificationAPI};
    use crate::entities::{ApplicationStatus, BookingStatus, APPLICATION_ACCEPTED};
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn accepting_settles_booking_and_notifies_vendor() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");
        let v2 = vendor("v2");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;
        let a2 = apply(&engine, &v2, &b, 1800.0).await;

        let settlement = engine
            .accept_application(r1.clone(), b.id.clone(), a1.id.clone())
            .await
            .unwrap();

        assert_eq!(settlement.booking.status, BookingStatus::Accepted);
        assert_eq!(settlement.booking.vendor_id.as_deref(), Some("v1"));
        assert_eq!(settlement.accepted.id, a1.id);
        assert_eq!(settlement.rejected.len(), 1);
        assert_eq!(settlement.rejected[0].id, a2.id);

        let stored = engine.find_booking(r1.clone(), b.id.clone()).await.unwrap();
        assert_eq!(stored, settlement.booking);

        let a1 = engine.find_application(v1.clone(), a1.id).await.unwrap();
        let a2 = engine.find_application(v2.clone(), a2.id).await.unwrap();
        assert_eq!(a1.status, ApplicationStatus::Accepted);
        assert_eq!(a2.status, ApplicationStatus::Rejected);

        let inbox = engine
            .list_notifications(v1.clone(), "v1".into())
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, APPLICATION_ACCEPTED);
        assert_eq!(inbox[0].booking_id, b.id);
        assert!(!inbox[0].read);

        assert!(engine
            .list_notifications(v2, "v2".into())
            .await
            .unwrap()
            .is_empty());

        // a settled booking drops out of the open listing
        assert!(engine.list_open_bookings(v1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_accept_fails_without_duplicate_notification() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");
        let v2 = vendor("v2");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;
        let a2 = apply(&engine, &v2, &b, 1800.0).await;

        engine
            .accept_application(r1.clone(), b.id.clone(), a1.id.clone())
            .await
            .unwrap();

        for target in [&a1.id, &a2.id] {
            let err = engine
                .accept_application(r1.clone(), b.id.clone(), target.clone())
                .await
                .unwrap_err();
            assert!(err.is_invalid_state_error());
        }

        let inbox = engine.list_notifications(v1, "v1".into()).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(engine
            .list_notifications(v2.clone(), "v2".into())
            .await
            .unwrap()
            .is_empty());

        let a2 = engine.find_application(v2, a2.id).await.unwrap();
        assert_eq!(a2.status, ApplicationStatus::Rejected);
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_settled() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;

        engine
            .update_booking_status(r1.clone(), b.id.clone(), BookingStatus::Cancelled)
            .await
            .unwrap();

        let err = engine
            .accept_application(r1.clone(), b.id.clone(), a1.id.clone())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state_error());

        let a1 = engine.find_application(v1.clone(), a1.id).await.unwrap();
        assert_eq!(a1.status, ApplicationStatus::Pending);
        assert!(engine
            .list_notifications(v1, "v1".into())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;

        let err = engine
            .accept_application(r1.clone(), b.id.clone(), "missing".into())
            .await
            .unwrap_err();
        assert!(err.is_not_found_error());

        let booking = engine.find_booking(r1, b.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn only_the_rider_accepts() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &v1, &b, 1500.0).await;

        for user in [v1, rider("r2")] {
            let err = engine
                .accept_application(user, b.id.clone(), a1.id.clone())
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Unauthorized);
        }
    }

    #[tokio::test]
    async fn accept_retries_through_transient_outage() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;
        let a1 = apply(&engine, &vendor("v1"), &b, 1500.0).await;

        engine.store().inject_unavailable(2);

        let settlement = engine
            .accept_application(r1, b.id, a1.id)
            .await
            .unwrap();
        assert_eq!(settlement.booking.status, BookingStatus::Accepted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_accepts_settle_exactly_once() {
        let engine = Arc::new(engine());
        let r1 = rider("r1");

        let b = booking(&engine, &r1).await;
        let mut applications = Vec::new();
        for (vendor_id, price) in [("v1", 1500.0), ("v2", 1800.0), ("v3", 1300.0)] {
            applications.push(apply(&engine, &vendor(vendor_id), &b, price).await);
        }

        let handles = applications
            .iter()
            .map(|application| {
                let engine = engine.clone();
                let rider = r1.clone();
                let booking_id = b.id.clone();
                let application_id = application.id.clone();
                tokio::spawn(async move {
                    engine
                        .accept_application(rider, booking_id, application_id)
                        .await
                })
            })
            .collect::<Vec<_>>();

        let mut accepted = 0;
        for outcome in futures::future::join_all(handles).await {
            match outcome.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert!(err.is_invalid_state_error()),
            }
        }
        assert_eq!(accepted, 1);

        let stored = engine
            .list_applications_by_booking(r1.clone(), b.id.clone())
            .await
            .unwrap();
        let winners = stored
            .iter()
            .filter(|application| application.status == ApplicationStatus::Accepted)
            .collect::<Vec<_>>();
        assert_eq!(winners.len(), 1);
        assert!(stored
            .iter()
            .filter(|application| application.id != winners[0].id)
            .all(|application| application.status == ApplicationStatus::Rejected));

        let booking = engine.find_booking(r1, b.id).await.unwrap();
        assert_eq!(booking.vendor_id.as_deref(), Some(winners[0].vendor_id.as_str()));

        let mut notified = 0;
        for vendor_id in ["v1", "v2", "v3"] {
            notified += engine
                .list_notifications(vendor(vendor_id), vendor_id.into())
                .await
                .unwrap()
                .len();
        }
        assert_eq!(notified, 1);
    }
}
