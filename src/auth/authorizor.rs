use oso::{Oso, PolarClass};

use crate::auth::{Account, Platform, User};
use crate::entities::{Application, Booking, Notification};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;
    o.register_class(Account::get_polar_class())?;
    o.register_class(Booking::get_polar_class())?;
    o.register_class(Application::get_polar_class())?;
    o.register_class(Notification::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}
