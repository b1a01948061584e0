use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Application;

/// A payment recorded against an accepted application. The payment itself
/// happens at an external gateway; `reference` is the id it issued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub application_id: String,
    pub booking_id: String,
    pub rider_id: String,
    pub vendor_id: String,
    pub amount: f64,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(application: &Application, reference: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            application_id: application.id.clone(),
            booking_id: application.booking_id.clone(),
            rider_id: application.rider_id.clone(),
            vendor_id: application.vendor_id.clone(),
            amount: application.price,
            reference,
            created_at: now,
        }
    }

    pub fn involves(&self, account_id: &str) -> bool {
        self.rider_id == account_id || self.vendor_id == account_id
    }
}
