use async_trait::async_trait;

use crate::arbitration::Settlement;
use crate::auth::User;
use crate::entities::{
    Application, Booking, BookingRequest, BookingStatus, Notification, NotificationRequest,
    Profile, ProfileRequest, ProfileUpdate, Quote, Ticket, Transaction,
};
use crate::error::Error;

#[async_trait]
pub trait BookingAPI {
    async fn create_booking(&self, user: User, request: BookingRequest) -> Result<Booking, Error>;
    async fn find_booking(&self, user: User, id: String) -> Result<Booking, Error>;
    async fn list_bookings_by_rider(&self, user: User, rider_id: String)
        -> Result<Vec<Booking>, Error>;
    async fn list_open_bookings(&self, user: User) -> Result<Vec<Booking>, Error>;
    async fn update_booking_status(
        &self,
        user: User,
        id: String,
        status: BookingStatus,
    ) -> Result<Booking, Error>;
    async fn delete_booking(&self, user: User, id: String) -> Result<(), Error>;
}

#[async_trait]
pub trait ApplicationAPI {
    async fn create_application(
        &self,
        user: User,
        booking_id: String,
        quote: Quote,
    ) -> Result<Application, Error>;
    async fn find_application(&self, user: User, id: String) -> Result<Application, Error>;
    async fn list_applications_by_booking(
        &self,
        user: User,
        booking_id: String,
    ) -> Result<Vec<Application>, Error>;
    async fn list_applications_by_vendor(
        &self,
        user: User,
        vendor_id: String,
    ) -> Result<Vec<Application>, Error>;
    async fn reject_application(&self, user: User, id: String) -> Result<Application, Error>;
    async fn withdraw_application(&self, user: User, id: String) -> Result<(), Error>;
}

#[async_trait]
pub trait ArbitrationAPI {
    async fn accept_application(
        &self,
        user: User,
        booking_id: String,
        application_id: String,
    ) -> Result<Settlement, Error>;
}

#[async_trait]
pub trait NotificationAPI {
    async fn append_notification(
        &self,
        user: User,
        request: NotificationRequest,
    ) -> Result<Notification, Error>;
    async fn list_notifications(
        &self,
        user: User,
        recipient_id: String,
    ) -> Result<Vec<Notification>, Error>;
    async fn mark_notification_read(&self, user: User, id: String) -> Result<Notification, Error>;
}

#[async_trait]
pub trait PaymentAPI {
    async fn record_payment(
        &self,
        user: User,
        application_id: String,
        reference: String,
    ) -> Result<Transaction, Error>;
    async fn list_transactions(
        &self,
        user: User,
        account_id: String,
    ) -> Result<Vec<Transaction>, Error>;
}

#[async_trait]
pub trait TicketAPI {
    async fn find_ticket(&self, user: User, booking_id: String) -> Result<Ticket, Error>;
}

#[async_trait]
pub trait ProfileAPI {
    async fn create_profile(&self, user: User, request: ProfileRequest) -> Result<Profile, Error>;
    async fn find_profile(&self, user: User, account_id: String) -> Result<Profile, Error>;
    async fn update_profile(
        &self,
        user: User,
        account_id: String,
        update: ProfileUpdate,
    ) -> Result<Profile, Error>;
}

pub trait API:
    BookingAPI
    + ApplicationAPI
    + ArbitrationAPI
    + NotificationAPI
    + PaymentAPI
    + TicketAPI
    + ProfileAPI
{
}
