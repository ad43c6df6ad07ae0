use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use super::error::ApiError;
use super::AppState;
use crate::explain::Origin;
use crate::types::{CaptureOrderRequest, CreateOrderRequest, ExplanationRequest};

/// `cache` or `generated`; informational only.
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-explanations-source");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn explain_exam(
    State(state): State<AppState>,
    payload: Result<Json<ExplanationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // Well-formed JSON with the wrong shape is the same caller mistake as a missing field.
        Err(JsonRejection::JsonDataError(_)) => {
            return Err(ApiError::bad_request("examId and questions are required"))
        }
        Err(rejection) => return Err(rejection.into()),
    };

    let outcome = state
        .explanations
        .explain_with_origin(&request)
        .await
        .map_err(ApiError::from_explain)?;

    let source = match outcome.origin {
        Origin::Cache => "cache",
        Origin::Generated { .. } => "generated",
    };
    Ok((
        [(SOURCE_HEADER, HeaderValue::from_static(source))],
        Json(json!({ "explanations": outcome.explanations })),
    ))
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let order = state
        .payments
        .create_order(&request)
        .await
        .map_err(ApiError::from_payment)?;
    Ok(Json(order))
}

pub async fn capture_order(
    State(state): State<AppState>,
    payload: Result<Json<CaptureOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let captured = state
        .payments
        .capture_order(&request)
        .await
        .map_err(ApiError::from_payment)?;
    Ok(Json(captured))
}
