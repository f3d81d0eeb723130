//! Deadline enforcement: wraps request handling in a wall-clock timeout and
//! converts an overrun into [`Error::Timeout`]. Grounded on the reference
//! `TimeoutMiddleware`, which races `call_next` against
//! `asyncio.wait_for(timeout_seconds)` and records a timeout counter on
//! expiry.
//!
//! This layer sits outside every route, including the admission guard on
//! `/predict`, so it is also the one place that sees entry-to-response-write
//! for every outcome (200, 422, 503, 504, 500) and is therefore where
//! `inference_request_latency_seconds` is observed — exactly once per
//! accepted `/predict` request, matching the reference implementation's
//! `finally` block.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::Error;
use crate::http::AppState;

/// Runs the downstream handler under `state.config.request_timeout`,
/// recording the request's total latency regardless of outcome; returns
/// [`Error::Timeout`] if it doesn't finish in time.
pub async fn enforce_deadline(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_predict = request.uri().path() == "/predict";
    let started = Instant::now();

    let response = match tokio::time::timeout(state.config.request_timeout, next.run(request))
        .await
    {
        Ok(response) => response,
        Err(_) => {
            state.metrics.record_request_timeout();
            axum::response::IntoResponse::into_response(Error::Timeout)
        }
    };

    if is_predict {
        state.metrics.observe_request_latency(started.elapsed());
    }

    response
}
