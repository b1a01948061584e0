use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Application, Booking, Transaction};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub booking: Booking,
    pub application: Application,
    pub transaction: Option<Transaction>,
    pub issued_at: DateTime<Utc>,
}
