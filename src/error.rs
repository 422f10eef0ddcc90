//! Handler error type and its HTTP mapping.
//!
//! Every failure leaving a handler is an [`ApiError`]. The router turns it into
//! `{"error": "<message>"}`; the status code depends on the configured
//! [`ErrorStatusMode`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::config::ErrorStatusMode;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed JSON or a missing required field.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response for a handler that panicked: a 500 with the panic message, so the
/// caller still gets the `{"error": ...}` shape instead of a dropped connection.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %message, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { error: message }),
    )
        .into_response()
}

impl ApiError {
    pub fn status(&self, mode: ErrorStatusMode) -> StatusCode {
        if mode == ErrorStatusMode::Legacy {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Config(_) | StoreError::Task(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn into_response_with(self, mode: ErrorStatusMode) -> Response {
        let status = self.status(mode);
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
