//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, ErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A checkout or order operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// The caller did not identify themselves.
    #[error("{0}")]
    Unauthorized(String),
}

impl ApiError {
    /// The machine-readable kind reported in the response body.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Checkout(err) => err.kind(),
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::Unauthorized(_) => ErrorKind::Permission,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Checkout(err) => status_for(err.kind()),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
        }

        let body = serde_json::json!({ "error": self.to_string(), "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}
