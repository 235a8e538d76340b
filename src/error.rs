use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    // unknown email and wrong password share this variant
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("storage unavailable")]
    StorageUnavailable(#[source] sqlx::Error),
    // reachable store that refused the write, e.g. a constraint
    #[error("storage rejected the write")]
    StorageRejected(#[source] sqlx::Error),
    #[error("token lifetime out of range")]
    TokenLifetime,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::DuplicateEmail,
            StoreError::Unavailable(e) => AuthError::StorageUnavailable(e),
            StoreError::Rejected(e) => AuthError::StorageRejected(e),
        }
    }
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error")]
    Db(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
                AuthError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
                AuthError::InvalidEmail
                | AuthError::PasswordTooShort { .. }
                | AuthError::FieldTooLong { .. } => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                AuthError::StorageUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
                }
                AuthError::StorageRejected(_)
                | AuthError::Hashing(_)
                | AuthError::Signing(_)
                | AuthError::TokenLifetime => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Db(sqlx::Error::Database(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Db(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status.is_server_error() {
            error!(error = ?self, %status, "request failed");
            "something went wrong, please try again later".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}
