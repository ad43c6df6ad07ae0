//! HTTP error bodies.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::Error;

/// Top-level message for any explanation failure that is not the caller's fault.
pub const EXPLAIN_FAILURE: &str = "Failed to generate explanations";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                details: None,
            },
        }
    }

    pub fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: message.into(),
                details,
            },
        }
    }

    /// Explanation errors carry the cause in `details` under a fixed message.
    pub fn from_explain(err: Error) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        error!(error = %err, "explanation request failed");
        Self::internal(EXPLAIN_FAILURE, Some(err.to_string()))
    }

    /// Payment errors surface the cause as the message itself.
    pub fn from_payment(err: Error) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        error!(error = %err, "payment request failed");
        Self::internal(err.to_string(), None)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
