use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::ProfileAPI,
    auth::{Account, Platform, User},
    entities::{Profile, ProfileRequest, ProfileUpdate},
    error::Error,
    retry::retry_with_backoff,
    store::Store,
};

#[async_trait]
impl<S: Store> ProfileAPI for Engine<S> {
    #[tracing::instrument(skip(self, request))]
    async fn create_profile(&self, user: User, request: ProfileRequest) -> Result<Profile, Error> {
        self.authorize(user.clone(), "create_profile", Platform::default())?;

        let profile = Profile::new(&user, request, Utc::now())?;

        retry_with_backoff(&self.retry, || self.store.insert_profile(&profile)).await?;

        tracing::info!(profile_id = %profile.id, "profile created");

        Ok(profile)
    }

    #[tracing::instrument(skip(self))]
    async fn find_profile(&self, user: User, account_id: String) -> Result<Profile, Error> {
        self.authorize(user, "read_profile", Account::new(account_id.clone()))?;

        retry_with_backoff(&self.retry, || self.store.fetch_profile(&account_id)).await
    }

    #[tracing::instrument(skip(self, update))]
    async fn update_profile(
        &self,
        user: User,
        account_id: String,
        update: ProfileUpdate,
    ) -> Result<Profile, Error> {
        self.authorize(user.clone(), "update_profile", Account::new(account_id.clone()))?;

        let mut profile =
            retry_with_backoff(&self.retry, || self.store.fetch_profile(&account_id)).await?;

        profile.update(&user, update, Utc::now())?;

        retry_with_backoff(&self.retry, || self.store.update_profile(&profile)).await?;

        Ok(profile)
    }
}
