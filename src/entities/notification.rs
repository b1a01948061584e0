use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const APPLICATION_ACCEPTED: &str = "application_accepted";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub booking_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub booking_id: String,
    #[serde(default)]
    pub message: String,
}

impl Notification {
    pub fn new(request: NotificationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id: request.recipient_id,
            kind: request.kind,
            booking_id: request.booking_id,
            message: request.message,
            read: false,
            created_at: now,
        }
    }

    pub fn application_accepted(vendor_id: String, booking_id: String, now: DateTime<Utc>) -> Self {
        Self::new(
            NotificationRequest {
                recipient_id: vendor_id,
                kind: APPLICATION_ACCEPTED.into(),
                booking_id,
                message: "Your application has been accepted!".into(),
            },
            now,
        )
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

impl PolarClass for Notification {
    fn get_polar_class_builder() -> oso::ClassBuilder<Notification> {
        oso::Class::builder()
            .name("Notification")
            .add_attribute_getter("id", |recv: &Notification| recv.id.clone())
            .add_attribute_getter("recipient_id", |recv: &Notification| {
                recv.recipient_id.clone()
            })
    }
}
