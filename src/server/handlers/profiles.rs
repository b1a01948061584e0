use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;

use crate::auth::User;
use crate::entities::{Profile, ProfileRequest, ProfileUpdate};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), Error> {
    let profile = api.create_profile(user, params).await?;

    Ok((StatusCode::CREATED, profile.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Profile>, Error> {
    let profile = api.find_profile(user, id).await?;

    Ok(profile.into())
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
    Json(params): Json<ProfileUpdate>,
) -> Result<Json<Profile>, Error> {
    let profile = api.update_profile(user, id, params).await?;

    Ok(profile.into())
}
