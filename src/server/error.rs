//! Server error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::bridge::BridgeUnavailable;

/// Errors that can occur while starting or running the server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error.
    #[error("Server error: {0}")]
    ServerError(#[from] std::io::Error),

    /// A configured CORS origin is not a valid header value.
    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),
}

/// Errors returned by HTTP handlers.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// A required gateway query failed.
    #[error(transparent)]
    Unavailable(#[from] BridgeUnavailable),

    /// The requested item does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Unavailable(e) = &self {
            tracing::warn!(error = %e, "Gateway query failed");
        }
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
