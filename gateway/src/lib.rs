//! Request-coalescing inference gateway.
//!
//! Wires together the five pieces described in the module table: the
//! [`config`] tunables, the bounded [`queue`], the window-based
//! [`assembler`], the [`predictor`] adapter, the [`metrics`] registry, and
//! the [`http`] surface that fronts all of it.

pub mod assembler;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod predictor;
pub mod queue;

pub use config::Config;
pub use error::Error;
pub use metrics::Metrics;
pub use predictor::{LogisticRegressionPredictor, Predictor};
pub use queue::{IntakeQueue, Ticket};

use std::sync::Arc;

use tokio::task::JoinHandle;

/// A fully wired gateway: the HTTP router plus the handle to its
/// background assembler task.
pub struct Gateway {
    /// The axum router; pass to [`axum::serve`].
    pub router: axum::Router,
    /// The intake queue, exposed so the caller can drain it on shutdown.
    pub queue: IntakeQueue,
    /// The assembler's background task.
    pub assembler: JoinHandle<()>,
}

/// Builds a [`Gateway`] from configuration and a predictor, spawning the
/// assembler task and constructing the HTTP router around the same queue
/// and metrics registry.
pub fn build(config: Config, predictor: Arc<dyn Predictor>, metrics: Arc<Metrics>) -> Gateway {
    let queue = IntakeQueue::new(config.queue_max_size);

    let assembler = tokio::spawn(assembler::run(
        queue.clone(),
        predictor.clone(),
        metrics.clone(),
        config.batch_max_size,
        config.batch_window,
    ));

    let state = http::AppState {
        queue: queue.clone(),
        metrics,
        config: Arc::new(config),
        predictor,
    };
    let router = http::build_router(state);

    Gateway {
        router,
        queue,
        assembler,
    }
}
