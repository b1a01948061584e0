mod handlers;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post, put},
    Router,
};

use crate::api::API;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{accounts, applications, bookings, notifications, profiles};

type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router<T: API + Sync + Send + 'static>(api: T) -> Router {
    let api = Arc::new(api) as DynAPI;

    Router::new()
        .route("/bookings", post(bookings::create))
        .route(
            "/bookings/:id",
            get(bookings::find).delete(bookings::delete),
        )
        .route("/bookings/:id/status", patch(bookings::update_status))
        .route(
            "/bookings/:id/applications",
            get(applications::list_for_booking).post(applications::create),
        )
        .route("/bookings/:id/accept", post(bookings::accept))
        .route("/bookings/:id/ticket", get(bookings::ticket))
        .route("/open_bookings", get(bookings::list_open))
        .route(
            "/applications/:id",
            get(applications::find).delete(applications::withdraw),
        )
        .route("/applications/:id/reject", patch(applications::reject))
        .route("/applications/:id/payment", post(applications::pay))
        .route("/notifications", post(notifications::append))
        .route("/notifications/:id/read", patch(notifications::mark_read))
        .route("/accounts/:id/bookings", get(accounts::bookings))
        .route("/accounts/:id/applications", get(accounts::applications))
        .route("/accounts/:id/notifications", get(accounts::notifications))
        .route("/accounts/:id/transactions", get(accounts::transactions))
        .route("/profiles", post(profiles::create))
        .route(
            "/accounts/:id/profile",
            get(profiles::find).put(profiles::update),
        )
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {}", err);
            unexpected_error()
        })
}
