//! The model adapter.
//!
//! The batch assembler treats the model as an opaque, synchronous,
//! batch-in/batch-out function — synchronous by contract, so the caller
//! decides where it runs (a worker thread, never the request-serving
//! scheduler) rather than the adapter assuming it can suspend on its own.
//! [`LogisticRegressionPredictor`] is the concrete adapter shipped with the
//! gateway: it loads a weight vector and bias from a JSON artifact and
//! scores rows with a plain dot product, the same shape trained by the
//! reference `train.py` script this gateway replaces the serving half of.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::Error;

/// A batch-oriented model: one call in, one call out, no partial results.
/// Implementations must be synchronous and CPU-bound only — the assembler
/// is responsible for running `predict` off the async runtime's worker
/// threads (via `tokio::task::spawn_blocking`).
pub trait Predictor: Send + Sync {
    /// Scores every row of `batch`, returning one prediction per row in the
    /// same order. `batch` must be rectangular (every row the same length);
    /// violations are reported as [`Error::Shape`].
    fn predict(&self, batch: Vec<Vec<f64>>) -> Result<Vec<f64>, Error>;
}

#[derive(Debug, Deserialize)]
struct Weights {
    weights: Vec<f64>,
    bias: f64,
}

/// Logistic regression over a fixed-width feature vector: `sigmoid(x . w +
/// b)`. Weights are loaded once at startup from the JSON file at
/// `MODEL_PATH` and held immutably for the life of the process.
pub struct LogisticRegressionPredictor {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegressionPredictor {
    /// Loads weights from a JSON file shaped `{"weights": [...], "bias": f64}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::ModelLoad(format!("reading {}: {e}", path.display())))?;
        let parsed: Weights = serde_json::from_str(&raw)
            .map_err(|e| Error::ModelLoad(format!("parsing {}: {e}", path.display())))?;
        if parsed.weights.is_empty() {
            return Err(Error::ModelLoad("model weight vector is empty".into()));
        }
        Ok(LogisticRegressionPredictor {
            weights: parsed.weights,
            bias: parsed.bias,
        })
    }

    fn score_row(&self, row: &[f64]) -> Result<f64, Error> {
        if row.len() != self.weights.len() {
            return Err(Error::Shape(format!(
                "expected {} features, got {}",
                self.weights.len(),
                row.len()
            )));
        }
        let dot: f64 = row.iter().zip(&self.weights).map(|(x, w)| x * w).sum();
        Ok(sigmoid(dot + self.bias))
    }
}

impl Predictor for LogisticRegressionPredictor {
    fn predict(&self, batch: Vec<Vec<f64>>) -> Result<Vec<f64>, Error> {
        if batch.is_empty() {
            return Err(Error::Shape("batch must not be empty".into()));
        }
        batch.iter().map(|row| self.score_row(row)).collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
