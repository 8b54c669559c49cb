//! Error helpers.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

use crate::model::ErrorBody;
use crate::store::StoreError;

/// Handler failure, rendered as `{ "error": "..." }`.
///
/// Details are logged; callers only ever see the generic message.
#[derive(Debug)]
pub enum ApiError {
    /// No `Authorization` header.
    MissingAuthorization,
    /// Token was rejected. Contains the reason, for logging.
    Unauthorized(String),
    /// Malformed request.
    BadRequest(String),
    /// Auth gateway refused to create the account. Message is shown to the caller.
    SignupRejected(String),
    /// Storage failed.
    Store {
        /// Caller-facing message, e.g. `"Failed to fetch MCs"`.
        message: &'static str,
        /// Cause.
        source: StoreError,
    },
    /// Generic internal server error.
    Internal {
        /// Caller-facing message.
        message: &'static str,
        /// Cause, for logging.
        detail: String,
    },
    /// No route matched.
    NotFound,
}
impl ApiError {
    /// For `map_err`: wraps a [`StoreError`] with the caller-facing message.
    pub fn store(message: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { message, source }
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingAuthorization | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::SignupRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Store { .. } | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Message shown to the caller.
    pub fn message(&self) -> &str {
        match self {
            ApiError::MissingAuthorization => "No authorization header",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::BadRequest(msg) | ApiError::SignupRejected(msg) => msg,
            ApiError::Store { message, .. } | ApiError::Internal { message, .. } => message,
            ApiError::NotFound => "Route not found",
        }
    }
}
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Unauthorized(reason) => log::warn!("Rejected token: {}", reason),
            ApiError::SignupRejected(msg) => log::warn!("Signup rejected: {}", msg),
            ApiError::Store { message, source } => log::error!("{}: {}", message, source),
            ApiError::Internal { message, detail } => log::error!("{}: {}", message, detail),
            _ => {}
        }
        let body = ErrorBody {
            error: self.message().to_owned(),
        };
        (self.status(), Json(body)).into_response()
    }
}
