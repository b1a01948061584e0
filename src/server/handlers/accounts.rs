use axum::extract::{Extension, Json, Path};

use crate::auth::User;
use crate::entities::{Application, Booking, Notification, Transaction};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn bookings(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, Error> {
    let bookings = api.list_bookings_by_rider(user, id).await?;

    Ok(bookings.into())
}

pub async fn applications(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Application>>, Error> {
    let applications = api.list_applications_by_vendor(user, id).await?;

    Ok(applications.into())
}

pub async fn notifications(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Notification>>, Error> {
    let notifications = api.list_notifications(user, id).await?;

    Ok(notifications.into())
}

pub async fn transactions(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let transactions = api.list_transactions(user, id).await?;

    Ok(transactions.into())
}
