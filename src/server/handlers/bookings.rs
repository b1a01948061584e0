use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::arbitration::Settlement;
use crate::auth::User;
use crate::entities::{Booking, BookingRequest, BookingStatus, Ticket};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct StatusParams {
    status: BookingStatus,
}

#[derive(Serialize, Deserialize)]
pub struct AcceptParams {
    application_id: String,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), Error> {
    let booking = api.create_booking(user, params).await?;

    Ok((StatusCode::CREATED, booking.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(user, id).await?;

    Ok(booking.into())
}

pub async fn list_open(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Vec<Booking>>, Error> {
    let bookings = api.list_open_bookings(user).await?;

    Ok(bookings.into())
}

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
    Json(params): Json<StatusParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.update_booking_status(user, id, params.status).await?;

    Ok(booking.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    api.delete_booking(user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
    Json(params): Json<AcceptParams>,
) -> Result<Json<Settlement>, Error> {
    let settlement = api
        .accept_application(user, id, params.application_id)
        .await?;

    Ok(settlement.into())
}

pub async fn ticket(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, Error> {
    let ticket = api.find_ticket(user, id).await?;

    Ok(ticket.into())
}
