use oso::PolarClass;
use serde::{Deserialize, Serialize};

/// A rider or vendor account, as the owner of per-account listings.
#[derive(Clone, Debug, Serialize, Deserialize, PolarClass)]
pub struct Account {
    #[polar(attribute)]
    pub id: String,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
