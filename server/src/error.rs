//! Caller-facing error taxonomy and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seats::wire::ErrorBody;
use seats::{SeatId, StoreError};
use thiserror::Error;

/// Why a reservation was not granted.
#[derive(Error, Debug)]
pub enum ReserveError {
    /// Rejected before the store was touched.
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("seat {0} not found")]
    NotFound(SeatId),

    #[error("seat {0} already reserved")]
    Conflict(SeatId),

    /// Seat state is unknown but unchanged; the caller may retry.
    #[error(transparent)]
    Infra(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("Seat not found")]
    NotFound,

    #[error("Seat already reserved")]
    Conflict,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReserveError> for ApiError {
    fn from(e: ReserveError) -> Self {
        match e {
            ReserveError::Invalid(msg) => ApiError::Validation(msg),
            ReserveError::NotFound(_) => ApiError::NotFound,
            ReserveError::Conflict(_) => ApiError::Conflict,
            ReserveError::Infra(_) => ApiError::Internal,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(_: StoreError) -> Self {
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
