pub mod accounts;
pub mod applications;
pub mod bookings;
pub mod notifications;
pub mod profiles;
