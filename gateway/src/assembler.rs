//! The batch assembler/dispatcher: the gateway's core coalescing loop.
//!
//! Grows a batch from the intake queue until it reaches `M` items or `W`
//! time has elapsed since the first (anchor) item arrived, whichever comes
//! first, then hands the batch to the predictor and fans the results back
//! out to each caller's completion handle. The growth loop is the same
//! shape as the teacher's `run_output_batch`: an absolute deadline computed
//! once, and a `tokio::time::timeout` around each `recv` that shrinks as
//! the deadline approaches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::metrics::Metrics;
use crate::predictor::Predictor;
use crate::queue::{IntakeQueue, Ticket};

/// Runs the assembler loop until the queue is closed (signalling shutdown).
///
/// On shutdown, any tickets still buffered in the queue are drained and
/// resolved with [`Error::Cancelled`] rather than left to hang.
pub async fn run(
    queue: IntakeQueue,
    predictor: Arc<dyn Predictor>,
    metrics: Arc<Metrics>,
    batch_max_size: usize,
    batch_window: Duration,
) {
    loop {
        match assemble_one(&queue, batch_max_size, batch_window).await {
            Some(batch) => {
                dispatch(batch, &predictor, &metrics).await;
            }
            None => {
                debug!("intake queue closed, draining remaining tickets");
                cancel_all(queue.drain());
                return;
            }
        }
    }
}

/// Blocks on the first ticket (the anchor), then grows the batch with
/// progressively shorter timeouts until it hits `batch_max_size` or the
/// window since the anchor elapses. Returns `None` once the queue is
/// permanently closed and empty.
async fn assemble_one(
    queue: &IntakeQueue,
    batch_max_size: usize,
    batch_window: Duration,
) -> Option<Vec<Ticket>> {
    let anchor = match queue.recv_async().await {
        Ok(ticket) => ticket,
        Err(_) => return None,
    };

    let deadline = Instant::now() + batch_window;
    let mut batch = Vec::with_capacity(batch_max_size);
    batch.push(anchor);

    while batch.len() < batch_max_size {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, queue.recv_async()).await {
            Ok(Ok(ticket)) => batch.push(ticket),
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    Some(batch)
}

/// Invokes the predictor on the assembled batch and resolves every ticket's
/// completion handle with either its individual prediction or the shared
/// batch-level error. The predictor is synchronous and potentially
/// CPU-bound, so the call runs on the blocking thread pool via
/// `spawn_blocking` rather than inline on this task's async worker thread.
async fn dispatch(batch: Vec<Ticket>, predictor: &Arc<dyn Predictor>, metrics: &Arc<Metrics>) {
    let batch_size = batch.len();
    metrics.observe_batch_size(batch_size);
    let started = Instant::now();

    let (tickets, features): (Vec<_>, Vec<_>) = batch
        .into_iter()
        .map(|t| (t.respond_to, t.features))
        .unzip();

    let predictor = Arc::clone(predictor);
    let result = tokio::task::spawn_blocking(move || predictor.predict(features))
        .await
        .unwrap_or_else(|e| Err(Error::Predictor(format!("predictor task panicked: {e}"))));
    metrics.observe_batch_latency(started.elapsed());

    match result {
        Ok(predictions) if predictions.len() == tickets.len() => {
            for (respond_to, prediction) in tickets.into_iter().zip(predictions) {
                let _ = respond_to.send(Ok(prediction));
            }
        }
        Ok(_) => {
            error!("predictor returned a mismatched number of predictions");
            metrics.record_predictor_error();
            fan_out_error(
                tickets,
                Error::Predictor("predictor returned a mismatched batch size".into()),
            );
        }
        Err(e) => {
            warn!(error = %e, batch_size, "predictor failed for batch");
            metrics.record_predictor_error();
            fan_out_error(tickets, e);
        }
    }
}

fn fan_out_error(
    tickets: Vec<tokio::sync::oneshot::Sender<Result<f64, Error>>>,
    error: Error,
) {
    for respond_to in tickets {
        let _ = respond_to.send(Err(error_clone(&error)));
    }
}

/// `Error` doesn't derive `Clone` (its variants wrap heap data we don't want
/// to duplicate unnecessarily), so a batch-level failure is re-described
/// per recipient from its display text.
fn error_clone(error: &Error) -> Error {
    match error {
        Error::Validation(m) => Error::Validation(m.clone()),
        Error::Overloaded => Error::Overloaded,
        Error::Timeout => Error::Timeout,
        Error::Predictor(m) => Error::Predictor(m.clone()),
        Error::Shape(m) => Error::Shape(m.clone()),
        Error::Cancelled => Error::Cancelled,
        Error::ChannelClosed => Error::ChannelClosed,
        Error::Config(m) => Error::Config(m.clone()),
        Error::ModelLoad(m) => Error::ModelLoad(m.clone()),
    }
}

fn cancel_all(tickets: Vec<Ticket>) {
    for ticket in tickets {
        let _ = ticket.respond_to.send(Err(Error::Cancelled));
    }
}
