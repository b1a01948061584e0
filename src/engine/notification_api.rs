use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::NotificationAPI,
    auth::{Account, Platform, User},
    entities::{Notification, NotificationRequest},
    error::{invalid_input_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> NotificationAPI for Engine<S> {
    #[tracing::instrument(skip(self))]
    async fn append_notification(
        &self,
        user: User,
        request: NotificationRequest,
    ) -> Result<Notification, Error> {
        self.authorize(user, "append_notification", Platform::default())?;

        if request.recipient_id.is_empty() || request.kind.is_empty() {
            return Err(invalid_input_error());
        }

        let notification = Notification::new(request, Utc::now());

        retry_with_backoff(&self.retry, || {
            self.store.append_notification(&notification)
        })
        .await?;

        Ok(notification)
    }

    #[tracing::instrument(skip(self))]
    async fn list_notifications(
        &self,
        user: User,
        recipient_id: String,
    ) -> Result<Vec<Notification>, Error> {
        self.authorize(user, "list_notifications", Account::new(recipient_id.clone()))?;

        retry_with_backoff(&self.retry, || self.store.notifications_for(&recipient_id)).await
    }

    #[tracing::instrument(skip(self))]
    async fn mark_notification_read(&self, user: User, id: String) -> Result<Notification, Error> {
        let mut notification =
            retry_with_backoff(&self.retry, || self.store.fetch_notification(&id)).await?;

        self.authorize(user, "mark_read", notification.clone())?;

        if notification.read {
            return Ok(notification);
        }

        notification.mark_read();

        retry_with_backoff(&self.retry, || {
            self.store.update_notification(&notification)
        })
        .await?;

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{engine, vendor};
    use crate::api::NotificationAPI;
    use crate::auth::User;
    use crate::entities::NotificationRequest;
    use crate::error::ErrorKind;

    fn request(recipient_id: &str, booking_id: &str) -> NotificationRequest {
        NotificationRequest {
            recipient_id: recipient_id.into(),
            kind: "trip_reminder".into(),
            booking_id: booking_id.into(),
            message: "Your trip starts tomorrow".into(),
        }
    }

    #[tokio::test]
    async fn appended_notifications_list_newest_first() {
        let engine = engine();
        let system = User::new_system_user();

        let first = engine
            .append_notification(system.clone(), request("v1", "b1"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = engine
            .append_notification(system.clone(), request("v1", "b2"))
            .await
            .unwrap();
        engine
            .append_notification(system, request("v2", "b1"))
            .await
            .unwrap();

        assert!(!first.read);
        assert_eq!(first.kind, "trip_reminder");

        let inbox = engine
            .list_notifications(vendor("v1"), "v1".into())
            .await
            .unwrap();
        assert_eq!(inbox, vec![second, first]);
    }

    #[tokio::test]
    async fn only_system_appends() {
        let engine = engine();

        let err = engine
            .append_notification(vendor("v1"), request("v1", "b1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn empty_recipient_is_invalid() {
        let engine = engine();

        let err = engine
            .append_notification(User::new_system_user(), request("", "b1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn inbox_is_private() {
        let engine = engine();

        let err = engine
            .list_notifications(vendor("v2"), "v1".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        // an empty inbox is not an error
        assert!(engine
            .list_notifications(vendor("v1"), "v1".into())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn recipient_marks_notification_read() {
        let engine = engine();
        let notification = engine
            .append_notification(User::new_system_user(), request("v1", "b1"))
            .await
            .unwrap();

        let err = engine
            .mark_notification_read(vendor("v2"), notification.id.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let read = engine
            .mark_notification_read(vendor("v1"), notification.id.clone())
            .await
            .unwrap();
        assert!(read.read);

        let again = engine
            .mark_notification_read(vendor("v1"), notification.id)
            .await
            .unwrap();
        assert_eq!(again, read);

        let inbox = engine
            .list_notifications(vendor("v1"), "v1".into())
            .await
            .unwrap();
        assert!(inbox[0].read);
    }
}
