use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::entities::{Application, Quote, Transaction};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct PaymentParams {
    reference: String,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(booking_id): Path<String>,
    Json(params): Json<Quote>,
) -> Result<(StatusCode, Json<Application>), Error> {
    let application = api.create_application(user, booking_id, params).await?;

    Ok((StatusCode::CREATED, application.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Application>, Error> {
    let application = api.find_application(user, id).await?;

    Ok(application.into())
}

pub async fn list_for_booking(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<Vec<Application>>, Error> {
    let applications = api.list_applications_by_booking(user, booking_id).await?;

    Ok(applications.into())
}

pub async fn reject(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Application>, Error> {
    let application = api.reject_application(user, id).await?;

    Ok(application.into())
}

pub async fn withdraw(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    api.withdraw_application(user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn pay(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
    Json(params): Json<PaymentParams>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let transaction = api.record_payment(user, id, params.reference).await?;

    Ok((StatusCode::CREATED, transaction.into()))
}
