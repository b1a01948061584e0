mod application;
mod booking;
mod notification;
mod profile;
mod ticket;
mod transaction;

pub use application::{
    Application, Payment, Quote, Status as ApplicationStatus, VendorDetails,
};
pub use booking::{
    Booking, BookingRequest, Route, Status as BookingStatus, TripType, Vehicle,
};
pub use notification::{Notification, NotificationRequest, APPLICATION_ACCEPTED};
pub use profile::{Business, Profile, ProfileRequest, ProfileUpdate};
pub use ticket::Ticket;
pub use transaction::Transaction;

#[cfg(test)]
pub(crate) use application::sample_quote;
#[cfg(test)]
pub(crate) use booking::sample_request;
#[cfg(test)]
pub(crate) use profile::sample_business;
