use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::BookingAPI,
    auth::{Account, Platform, User},
    entities::{Booking, BookingRequest, BookingStatus},
    error::{invalid_state_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> BookingAPI for Engine<S> {
    #[tracing::instrument(skip(self, request))]
    async fn create_booking(&self, user: User, request: BookingRequest) -> Result<Booking, Error> {
        self.authorize(user.clone(), "create_booking", Platform::default())?;

        let booking = Booking::new(user.id, request, Utc::now())?;

        retry_with_backoff(&self.retry, || self.store.insert_booking(&booking)).await?;

        tracing::info!(booking_id = %booking.id, "booking created");

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, user: User, id: String) -> Result<Booking, Error> {
        let booking = retry_with_backoff(&self.retry, || self.store.fetch_booking(&id)).await?;

        self.authorize(user, "read", booking.clone())?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn list_bookings_by_rider(
        &self,
        user: User,
        rider_id: String,
    ) -> Result<Vec<Booking>, Error> {
        self.authorize(user, "list_bookings", Account::new(rider_id.clone()))?;

        retry_with_backoff(&self.retry, || self.store.bookings_by_rider(&rider_id)).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_open_bookings(&self, user: User) -> Result<Vec<Booking>, Error> {
        self.authorize(user, "list_open_bookings", Platform::default())?;

        retry_with_backoff(&self.retry, || self.store.open_bookings()).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_booking_status(
        &self,
        user: User,
        id: String,
        status: BookingStatus,
    ) -> Result<Booking, Error> {
        let booking = retry_with_backoff(&self.retry, || self.store.fetch_booking(&id)).await?;

        let action = match status {
            BookingStatus::Cancelled => "cancel",
            BookingStatus::Completed => "complete",
            BookingStatus::Pending | BookingStatus::Accepted => "read",
        };
        self.authorize(user, action, booking.clone())?;

        // refuse an impossible transition before touching the store
        let expected = booking.status;
        booking.clone().transition(status, Utc::now())?;

        let booking = retry_with_backoff(&self.retry, || {
            self.store
                .transition_booking(&id, expected, status, Utc::now())
        })
        .await?;

        tracing::info!(from = expected.name(), to = status.name(), "booking status updated");

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_booking(&self, user: User, id: String) -> Result<(), Error> {
        let booking = retry_with_backoff(&self.retry, || self.store.fetch_booking(&id)).await?;

        self.authorize(user, "delete", booking.clone())?;

        if !booking.is_pending() {
            return Err(invalid_state_error());
        }

        retry_with_backoff(&self.retry, || self.store.delete_booking(&id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{apply, booking, engine, rider, vendor};
    use crate::api::{ApplicationAPI, BookingAPI};
    use crate::entities::{sample_request, BookingStatus};
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn create_then_find_returns_the_same_booking() {
        let engine = engine();
        let rider = rider("r1");

        let request = sample_request();
        let created = engine
            .create_booking(rider.clone(), request.clone())
            .await
            .unwrap();

        assert_eq!(created.rider_id, "r1");
        assert_eq!(created.route, request.route);
        assert_eq!(created.vehicle, request.vehicle);
        assert_eq!(created.passengers, request.passengers);
        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(created.vendor_id, None);
        assert!(!created.id.is_empty());

        let found = engine.find_booking(rider, created.id.clone()).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn vendors_cannot_create_bookings() {
        let engine = engine();

        let err = engine
            .create_booking(vendor("v1"), sample_request())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn missing_booking_is_not_found() {
        let engine = engine();

        let err = engine
            .find_booking(rider("r1"), "missing".into())
            .await
            .unwrap_err();

        assert!(err.is_not_found_error());
    }

    #[tokio::test]
    async fn riders_only_list_their_own_bookings() {
        let engine = engine();
        let r1 = rider("r1");
        let r2 = rider("r2");

        let first = booking(&engine, &r1).await;
        let second = booking(&engine, &r1).await;
        booking(&engine, &r2).await;

        let listed = engine
            .list_bookings_by_rider(r1.clone(), "r1".into())
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id) && ids.contains(&second.id));

        let err = engine
            .list_bookings_by_rider(r2, "r1".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn open_bookings_exclude_cancelled() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let open = booking(&engine, &r1).await;
        let cancelled = booking(&engine, &r1).await;
        engine
            .update_booking_status(r1.clone(), cancelled.id.clone(), BookingStatus::Cancelled)
            .await
            .unwrap();

        let listed = engine.list_open_bookings(v1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);

        let err = engine.list_open_bookings(r1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn status_cannot_be_set_to_accepted_directly() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;

        for status in [BookingStatus::Accepted, BookingStatus::Pending, BookingStatus::Completed] {
            let err = engine
                .update_booking_status(r1.clone(), b.id.clone(), status)
                .await
                .unwrap_err();
            assert!(err.is_invalid_state_error());
        }

        let stored = engine.find_booking(r1, b.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn only_the_rider_cancels() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;

        let err = engine
            .update_booking_status(rider("r2"), b.id.clone(), BookingStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let cancelled = engine
            .update_booking_status(r1, b.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn delete_only_while_pending() {
        let engine = engine();
        let r1 = rider("r1");
        let v1 = vendor("v1");

        let b = booking(&engine, &r1).await;
        let application = apply(&engine, &v1, &b, 1500.0).await;

        engine.delete_booking(r1.clone(), b.id.clone()).await.unwrap();

        assert!(engine
            .find_booking(r1.clone(), b.id.clone())
            .await
            .unwrap_err()
            .is_not_found_error());
        assert!(engine
            .find_application(v1, application.id)
            .await
            .unwrap_err()
            .is_not_found_error());

        let b = booking(&engine, &r1).await;
        engine
            .update_booking_status(r1.clone(), b.id.clone(), BookingStatus::Cancelled)
            .await
            .unwrap();

        let err = engine.delete_booking(r1, b.id).await.unwrap_err();
        assert!(err.is_invalid_state_error());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let engine = engine();
        let r1 = rider("r1");
        let b = booking(&engine, &r1).await;

        engine.store().inject_unavailable(2);
        let found = engine.find_booking(r1.clone(), b.id.clone()).await.unwrap();
        assert_eq!(found.id, b.id);

        engine.store().inject_unavailable(3);
        let err = engine.find_booking(r1, b.id).await.unwrap_err();
        assert!(err.is_store_unavailable_error());
    }
}
