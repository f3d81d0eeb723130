//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the gateway returns this `Error`. The
//! HTTP surface maps each variant to a status code and JSON body; the
//! mapping lives in [`Error::into_response`] so the status/body pairing
//! stays in one place rather than being re-derived at every call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Errors produced anywhere in the gateway pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request body; never reaches the pipeline.
    #[error("validation error: {0}")]
    Validation(String),

    /// Admission-watermark trip or queue full at `offer`.
    #[error("server overloaded")]
    Overloaded,

    /// Request exceeded its deadline budget.
    #[error("request timed out")]
    Timeout,

    /// The predictor raised while evaluating a batch.
    #[error("predictor error: {0}")]
    Predictor(String),

    /// Adapter rejected a non-2D input; defensive, should not occur if the
    /// HTTP surface reshapes correctly.
    #[error("shape error: {0}")]
    Shape(String),

    /// Shutdown drained an unprocessed item before the assembler consumed it.
    #[error("cancelled by shutdown")]
    Cancelled,

    /// An internal channel was closed unexpectedly (peer task gone).
    #[error("internal channel closed")]
    ChannelClosed,

    /// Configuration failed validation at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure to read or parse the model artifact at `MODEL_PATH`.
    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Error::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Error::Overloaded => (StatusCode::SERVICE_UNAVAILABLE, "Server overloaded".into()),
            Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timed out".into()),
            Error::Predictor(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Error::Shape(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "Request cancelled".into()),
            Error::ChannelClosed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal channel closed".into(),
            ),
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Error::ModelLoad(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
