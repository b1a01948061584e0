pub mod authorizor;

mod account;
mod platform;
mod user;

pub use account::Account;
pub use platform::Platform;
pub use user::{User, RIDER, SYSTEM, VENDOR};
