//! The store contract the engine runs against.
//!
//! Single-record status writes are compare-and-swap: they only land if the
//! stored status still equals `expected`, and fail with `InvalidState`
//! otherwise. Operations touching several records are atomic.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::arbitration::Settlement;
use crate::entities::{
    Application, ApplicationStatus, Booking, BookingStatus, Notification, Profile, Transaction,
};
use crate::error::Error;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error>;
    async fn fetch_booking(&self, id: &str) -> Result<Booking, Error>;
    /// Newest first.
    async fn bookings_by_rider(&self, rider_id: &str) -> Result<Vec<Booking>, Error>;
    /// Pending bookings without a vendor, newest first.
    async fn open_bookings(&self) -> Result<Vec<Booking>, Error>;
    /// Moves the stored booking from `expected` to `status`, applying the
    /// transition to the stored record so concurrent changes to other fields
    /// survive.
    async fn transition_booking(
        &self,
        id: &str,
        expected: BookingStatus,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error>;
    /// Deletes a pending booking together with its applications.
    async fn delete_booking(&self, id: &str) -> Result<(), Error>;

    /// Inserts `application` if its booking is still open and the vendor has
    /// not applied yet, flagging the booking as having applications.
    async fn insert_application(&self, application: &Application, now: DateTime<Utc>)
        -> Result<(), Error>;
    async fn fetch_application(&self, id: &str) -> Result<Application, Error>;
    /// Oldest first.
    async fn applications_by_booking(&self, booking_id: &str) -> Result<Vec<Application>, Error>;
    /// Oldest first.
    async fn applications_by_vendor(&self, vendor_id: &str) -> Result<Vec<Application>, Error>;
    async fn update_application(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> Result<(), Error>;
    /// Deletes a pending application.
    async fn delete_application(&self, id: &str) -> Result<(), Error>;

    /// Accepts `application_id` for `booking_id`, rejecting its siblings and
    /// appending the vendor notification, as a single unit.
    async fn settle_booking(
        &self,
        booking_id: &str,
        application_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Settlement, Error>;

    async fn append_notification(&self, notification: &Notification) -> Result<(), Error>;
    async fn fetch_notification(&self, id: &str) -> Result<Notification, Error>;
    /// Newest first.
    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, Error>;
    async fn update_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Stores `transaction` and marks its application paid, as a single unit.
    async fn insert_transaction(
        &self,
        transaction: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Application, Error>;
    async fn transaction_for_application(
        &self,
        application_id: &str,
    ) -> Result<Option<Transaction>, Error>;
    /// Transactions where the account is rider or vendor, newest first.
    async fn transactions_by_account(&self, account_id: &str) -> Result<Vec<Transaction>, Error>;

    /// Fails with `InvalidState` if the account already has a profile.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), Error>;
    async fn fetch_profile(&self, id: &str) -> Result<Profile, Error>;
    async fn update_profile(&self, profile: &Profile) -> Result<(), Error>;
}
