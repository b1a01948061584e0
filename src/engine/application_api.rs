use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::ApplicationAPI,
    auth::{Account, Platform, User},
    entities::{Application, Quote},
    error::{invalid_state_error, Error},
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> ApplicationAPI for Engine<S> {
    #[tracing::instrument(skip(self, quote))]
    async fn create_application(
        &self,
        user: User,
        booking_id: String,
        mut quote: Quote,
    ) -> Result<Application, Error> {
        self.authorize(user.clone(), "submit_application", Platform::default())?;

        let booking =
            retry_with_backoff(&self.retry, || self.store.fetch_booking(&booking_id)).await?;

        if !booking.is_open() {
            tracing::info!(status = booking.status.name(), "booking no longer takes applications");
            return Err(invalid_state_error());
        }

        self.authorize(user.clone(), "apply", booking.clone())?;

        match retry_with_backoff(&self.retry, || self.store.fetch_profile(&user.id)).await {
            Ok(profile) => quote.vendor_details.fill_blanks(&profile),
            Err(err) if err.is_not_found_error() => {}
            Err(err) => return Err(err),
        }

        let now = Utc::now();
        let application = Application::new(&booking, user.id, quote, now)?;

        // the store re-checks the booking and the vendor's previous application
        retry_with_backoff(&self.retry, || {
            self.store.insert_application(&application, now)
        })
        .await?;

        tracing::info!(application_id = %application.id, "application submitted");

        Ok(application)
    }

    #[tracing::instrument(skip(self))]
    async fn find_application(&self, user: User, id: String) -> Result<Application, Error> {
        let application =
            retry_with_backoff(&self.retry, || self.store.fetch_application(&id)).await?;

        self.authorize(user, "read", application.clone())?;

        Ok(application)
    }

    #[tracing::instrument(skip(self))]
    async fn list_applications_by_booking(
        &self,
        user: User,
        booking_id: String,
    ) -> Result<Vec<Application>, Error> {
        let booking =
            retry_with_backoff(&self.retry, || self.store.fetch_booking(&booking_id)).await?;

        self.authorize(user, "read_applications", booking)?;

        retry_with_backoff(&self.retry, || {
            self.store.applications_by_booking(&booking_id)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn list_applications_by_vendor(
        &self,
        user: User,
        vendor_id: String,
    ) -> Result<Vec<Application>, Error> {
        self.authorize(user, "list_applications", Account::new(vendor_id.clone()))?;

        retry_with_backoff(&self.retry, || self.store.applications_by_vendor(&vendor_id)).await
    }

    #[tracing::instrument(skip(self))]
    async fn reject_application(&self, user: User, id: String) -> Result<Application, Error> {
        let mut application =
            retry_with_backoff(&self.retry, || self.store.fetch_application(&id)).await?;

        self.authorize(user, "reject", application.clone())?;

        let expected = application.status;
        application.reject(Utc::now())?;

        retry_with_backoff(&self.retry, || {
            self.store.update_application(&application, expected)
        })
        .await?;

        tracing::info!("application rejected");

        Ok(application)
    }

    #[tracing::instrument(skip(self))]
    async fn withdraw_application(&self, user: User, id: String) -> Result<(), Error> {
        let application =
            retry_with_backoff(&self.retry, || self.store.fetch_application(&id)).await?;

        self.authorize(user, "withdraw", application.clone())?;

        application.ensure_withdrawable()?;

        retry_with_backoff(&self.retry, || self.store.delete_application(&id)).await
    }
}
