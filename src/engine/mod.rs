mod application_api;
mod arbitration_api;
mod booking_api;
mod notification_api;
mod payment_api;
mod profile_api;
mod ticket_api;

use oso::Oso;

use crate::{
    api::API,
    auth::authorizor,
    error::{unauthorized_error, Error},
    retry::RetryPolicy,
    store::Store,
};

pub struct Engine<S> {
    store: S,
    authorizor: Oso,
    retry: RetryPolicy,
}

impl<S: Store> Engine<S> {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(store: S, retry: RetryPolicy) -> Result<Self, Error> {
        Ok(Self {
            store,
            authorizor: authorizor::new()?,
            retry,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Engine<S> {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        tracing::info!("authorization denied");
        Err(unauthorized_error())
    }
}

impl<S: Store> API for Engine<S> {}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::Duration;

    use super::Engine;
    use crate::auth::{User, RIDER, VENDOR};
    use crate::entities::{sample_quote, sample_request, Application, Booking};
    use crate::retry::RetryPolicy;
    use crate::store::MemoryStore;
    use crate::api::{ApplicationAPI, BookingAPI};

    pub fn engine() -> Engine<MemoryStore> {
        let retry = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        };

        Engine::new(MemoryStore::new(), retry).unwrap()
    }

    pub fn rider(id: &str) -> User {
        User::new(id, &[RIDER])
    }

    pub fn vendor(id: &str) -> User {
        User::new(id, &[VENDOR])
    }

    pub async fn booking(engine: &Engine<MemoryStore>, rider: &User) -> Booking {
        engine
            .create_booking(rider.clone(), sample_request())
            .await
            .unwrap()
    }

    pub async fn apply(
        engine: &Engine<MemoryStore>,
        vendor: &User,
        booking: &Booking,
        price: f64,
    ) -> Application {
        engine
            .create_application(vendor.clone(), booking.id.clone(), sample_quote(price))
            .await
            .unwrap()
    }
}
