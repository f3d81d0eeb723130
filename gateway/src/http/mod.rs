//! The HTTP surface: `/health`, `/predict`, `/metrics`.
//!
//! Structured the way the teacher's `http_server` input module is
//! structured — an `AppState` shared via `axum::extract::State`, handlers
//! that talk to the pipeline only through that state, and a `CorsLayer` for
//! browser-originated callers — but with the gateway's own fixed set of
//! routes and middleware instead of a generic ingest endpoint.

pub mod admission;
pub mod deadline;

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::predictor::Predictor;
use crate::queue::{IntakeQueue, Ticket};

/// State shared by every HTTP handler and middleware layer.
#[derive(Clone)]
pub struct AppState {
    /// The intake queue requests are placed on.
    pub queue: IntakeQueue,
    /// The shared metrics registry.
    pub metrics: Arc<Metrics>,
    /// Static configuration (timeouts, watermarks).
    pub config: Arc<Config>,
    /// Retained so `/health` can report without touching the pipeline;
    /// unused by `/predict`, which only ever talks to the queue.
    pub predictor: Arc<dyn Predictor>,
}

/// Builds the router: routes, per-route admission guard on `/predict`, and
/// a blanket deadline guard over every route. Admission runs first (fast,
/// non-suspending); the deadline wraps whatever runs after it, per the
/// ordering the two middlewares are specified to preserve.
pub fn build_router(state: AppState) -> Router {
    let predict_route = post(predict_handler).route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        admission::reject_when_overloaded,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", predict_route)
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            deadline::enforce_deadline,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    features: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    pred: f64,
}

#[instrument(skip(state, payload))]
async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, axum::extract::rejection::JsonRejection>,
) -> axum::response::Response {
    // Latency is observed once per request, regardless of outcome, by the
    // deadline middleware wrapping this handler (and the admission guard in
    // front of it) — see `http::deadline::enforce_deadline`.
    let outcome = handle_predict(&state, payload).await;

    match outcome {
        Ok(pred) => {
            info!(pred, "request completed");
            Json(PredictResponse { pred }).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn handle_predict(
    state: &AppState,
    payload: Result<Json<PredictRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<f64, Error> {
    let Json(request) =
        payload.map_err(|e| Error::Validation(format!("malformed request body: {e}")))?;

    if request.features.is_empty() {
        return Err(Error::Validation("features must not be empty".into()));
    }

    let (respond_to, completion) = tokio::sync::oneshot::channel();
    let ticket = Ticket {
        features: request.features,
        respond_to,
    };

    state.queue.offer(ticket)?;
    state.metrics.set_queue_depth(state.queue.size());

    completion.await.map_err(|_| Error::Cancelled)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct EchoPredictor;

    impl Predictor for EchoPredictor {
        fn predict(&self, batch: Vec<Vec<f64>>) -> Result<Vec<f64>, Error> {
            Ok(batch.into_iter().map(|row| row[0]).collect())
        }
    }

    fn test_state() -> AppState {
        let mut config = Config::from_env().unwrap();
        config.queue_high_watermark = config.queue_max_size;
        AppState {
            queue: IntakeQueue::new(config.queue_max_size),
            metrics: Arc::new(Metrics::new_noop()),
            config: Arc::new(config),
            predictor: Arc::new(EchoPredictor),
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_rejects_empty_features() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"features":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn predict_rejects_malformed_body() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_text() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
