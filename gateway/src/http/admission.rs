//! Admission control: rejects new requests once the intake queue's
//! occupancy reaches the high watermark, rather than letting it fill all
//! the way to capacity and fail at `offer` time. Grounded on the reference
//! `BackpressureMiddleware`, which only guards the prediction route and
//! records a rejection counter before returning 503.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::Error;
use crate::http::AppState;

/// Rejects the request with [`Error::Overloaded`] if the intake queue is at
/// or above its configured high watermark; otherwise passes it through.
pub async fn reject_when_overloaded(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.queue.size() >= state.config.queue_high_watermark {
        state.metrics.record_queue_rejection();
        return axum::response::IntoResponse::into_response(Error::Overloaded);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_router;
    use crate::metrics::Metrics;
    use crate::predictor::Predictor;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubPredictor;

    impl Predictor for StubPredictor {
        fn predict(&self, batch: Vec<Vec<f64>>) -> Result<Vec<f64>, Error> {
            Ok(batch.into_iter().map(|_| 0.5).collect())
        }
    }

    #[tokio::test]
    async fn rejects_when_queue_at_watermark() {
        let queue = crate::queue::IntakeQueue::new(4);
        let (ticket, _rx) = {
            let (tx, rx) = tokio::sync::oneshot::channel();
            (
                crate::queue::Ticket {
                    features: vec![1.0],
                    respond_to: tx,
                },
                rx,
            )
        };
        queue.offer(ticket).unwrap();

        let mut config = crate::config::Config::from_env().unwrap_or_else(|_| {
            panic!("default config should be constructible in test environment")
        });
        config.queue_high_watermark = 1;

        let state = AppState {
            queue,
            metrics: Arc::new(Metrics::new_noop()),
            config: Arc::new(config),
            predictor: Arc::new(StubPredictor) as Arc<dyn Predictor>,
        };

        let app = build_router(state);
        let response = app
            .oneshot(
                HttpRequest::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"features":[1.0]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
