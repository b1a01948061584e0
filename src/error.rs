use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidState,
    NotFound,
    DuplicateApplication,
    Unauthorized,
    StoreUnavailable,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_not_found_error(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_invalid_state_error(&self) -> bool {
        self.kind == ErrorKind::InvalidState
    }

    pub fn is_store_unavailable_error(&self) -> bool {
        self.kind == ErrorKind::StoreUnavailable
    }

    /// Internal errors (codes 1-99) are not described to callers.
    pub fn public_message(&self) -> &str {
        match self.code {
            1..=99 => "Internal Server Error",
            _ => self.message.as_str(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => not_found_error(),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => store_unavailable_error(),
            // serialization failure and deadlock are safe to retry
            sqlx::Error::Database(db_err)
                if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) =>
            {
                store_unavailable_error()
            }
            _ => database_error(err),
        }
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        authorizor_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidState | ErrorKind::DuplicateApplication => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "code": self.code,
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        kind: ErrorKind::InvalidState,
        code: 100,
        message: "invalid state".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        kind: ErrorKind::InvalidInput,
        code: 101,
        message: "invalid input".into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        kind: ErrorKind::NotFound,
        code: 102,
        message: "not found".into(),
    }
}

pub fn duplicate_application_error() -> Error {
    Error {
        kind: ErrorKind::DuplicateApplication,
        code: 103,
        message: "duplicate application".into(),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        kind: ErrorKind::Unauthorized,
        code: 104,
        message: "unauthorized".into(),
    }
}

pub fn store_unavailable_error() -> Error {
    Error {
        kind: ErrorKind::StoreUnavailable,
        code: 105,
        message: "store unavailable".into(),
    }
}

pub fn profile_exists_error() -> Error {
    Error {
        kind: ErrorKind::InvalidState,
        code: 106,
        message: "profile already exists".into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        kind: ErrorKind::Internal,
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!(?err, "database error");

    Error {
        kind: ErrorKind::Internal,
        code: 2,
        message: "database error".into(),
    }
}

pub fn authorizor_error<T: Debug>(err: T) -> Error {
    tracing::error!(?err, "authorizor error");

    Error {
        kind: ErrorKind::Internal,
        code: 3,
        message: "authorizor error".into(),
    }
}

pub fn config_error(key: &str) -> Error {
    Error {
        kind: ErrorKind::Internal,
        code: 4,
        message: format!("invalid configuration value for {key}"),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        kind: ErrorKind::Internal,
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn client_errors_keep_their_message() {
    let err = duplicate_application_error();
    assert_eq!(err.public_message(), err.message);
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

    let err = unauthorized_error();
    assert_eq!(err.public_message(), err.message);
    assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
}

#[test]
fn internal_errors_hide_their_message() {
    let err = database_error("connection reset by peer");
    assert_eq!(err.public_message(), "Internal Server Error");
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let err = config_error("BIND_ADDR");
    assert_eq!(err.public_message(), "Internal Server Error");
}

#[test]
fn transient_sqlx_errors_are_store_unavailable() {
    let err: Error = sqlx::Error::PoolTimedOut.into();
    assert!(err.is_store_unavailable_error());

    let err: Error = sqlx::Error::RowNotFound.into();
    assert!(err.is_not_found_error());

    let err: Error = sqlx::Error::ColumnNotFound("data".into()).into();
    assert_eq!(err.kind, ErrorKind::Internal);
}
