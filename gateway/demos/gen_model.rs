//! Generates a random logistic-regression weights file compatible with
//! [`gateway::LogisticRegressionPredictor`], for local smoke-testing
//! without a training pipeline. Mirrors the shape `training/train.py`
//! produces: a fixed-width weight vector plus a bias, serialized as JSON.
//!
//! Usage: `gen-model <output-path> [feature-count]`

use std::env;
use std::fs;

fn main() {
    let mut args = env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "model.json".to_string());
    let feature_count: usize = args
        .next()
        .map(|s| s.parse().expect("feature-count must be a positive integer"))
        .unwrap_or(10);

    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state as f64 / u64::MAX as f64) * 2.0 - 1.0
    };

    let weights: Vec<f64> = (0..feature_count).map(|_| next()).collect();
    let bias = next();

    let body = serde_json::json!({ "weights": weights, "bias": bias });
    fs::write(&output_path, serde_json::to_string_pretty(&body).unwrap())
        .unwrap_or_else(|e| panic!("failed to write {output_path}: {e}"));

    println!("wrote {feature_count}-feature model to {output_path}");
}
