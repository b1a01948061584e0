use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;

use crate::auth::User;
use crate::entities::{Notification, NotificationRequest};
use crate::error::Error;
use crate::server::DynAPI;

pub async fn append(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), Error> {
    let notification = api.append_notification(user, params).await?;

    Ok((StatusCode::CREATED, notification.into()))
}

pub async fn mark_read(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Notification>, Error> {
    let notification = api.mark_notification_read(user, id).await?;

    Ok(notification.into())
}
