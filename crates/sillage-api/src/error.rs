//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the conversion from the
//! domain error decides the status code, and `IntoResponse` renders the
//! `{ "message": ..., "error": ... }` envelope. Internal failures are
//! logged server-side and never leak collaborator details to the client.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

/// API-level error with an HTTP status category.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(sillage_core::Error),
}

impl From<sillage_core::Error> for ApiError {
    fn from(err: sillage_core::Error) -> Self {
        use sillage_core::Error;
        match err {
            Error::NotFound(_)
            | Error::ParfumNotFound(_)
            | Error::NoteNotFound(_)
            | Error::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl From<sillage_auth::AuthError> for ApiError {
    fn from(err: sillage_auth::AuthError) -> Self {
        use sillage_auth::AuthError;
        match err {
            AuthError::TokenExpired => ApiError::Unauthorized("token expired".to_string()),
            AuthError::TokenInvalid => ApiError::Unauthorized("invalid token".to_string()),
            other => ApiError::Internal(sillage_core::Error::Internal(other.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal(err) => {
                error!(
                    subsystem = "api",
                    error = %err,
                    "Unexpected internal error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    Some("unexpected".to_string()),
                )
            }
        };

        let body = match detail {
            Some(detail) => Json(serde_json::json!({ "message": message, "error": detail })),
            None => Json(serde_json::json!({ "message": message })),
        };
        (status, body).into_response()
    }
}
