use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::HeaderMap;

use crate::auth::User;
use crate::error::{unauthorized_error, Error};

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLES_HEADER: &str = "x-user-roles";

/// The identity gateway in front of the service authenticates callers and
/// forwards who they are in request headers.
#[async_trait]
impl<B: Send> FromRequest<B> for User {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        user_from_headers(req.headers())
    }
}

fn user_from_headers(headers: &HeaderMap) -> Result<User, Error> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            tracing::info!("request without a session");
            unauthorized_error()
        })?;

    let roles = headers
        .get(USER_ROLES_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(User {
        id: id.to_string(),
        roles,
    })
}
