//! Gateway configuration, sourced from the process environment.
//!
//! Mirrors the teacher's `default_*()`-function idiom (see
//! `HttpServerConfig` in the upstream `http_server` input module) but reads
//! from environment variables instead of a YAML document, since the
//! gateway has exactly one fixed topology rather than a pluggable pipeline.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::Error;

const DEFAULT_BATCH_MAX_SIZE: usize = 32;
const DEFAULT_BATCH_WINDOW_MS: u64 = 10;
const DEFAULT_QUEUE_MAX_SIZE: usize = 1024;
const DEFAULT_QUEUE_HIGH_WATERMARK: usize = 900;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct Config {
    /// `M`: maximum number of items folded into a single batch.
    pub batch_max_size: usize,
    /// `W`: maximum time the assembler waits after the anchor item before
    /// dispatching a partially-filled batch.
    pub batch_window: Duration,
    /// `Q`: capacity of the intake queue.
    pub queue_max_size: usize,
    /// `H`: occupancy at or above which admission rejects new requests.
    pub queue_high_watermark: usize,
    /// `D`: wall-clock ceiling enforced by the deadline middleware.
    pub request_timeout: Duration,
    /// Path to the model weights artifact.
    pub model_path: String,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Builds a `Config` from the process environment, applying defaults
    /// for anything unset and rejecting values that violate the tunables'
    /// invariants (`H <= Q`, `D > W`).
    pub fn from_env() -> Result<Self, Error> {
        let batch_max_size = parse_env("BATCH_MAX_SIZE", DEFAULT_BATCH_MAX_SIZE)?;
        let batch_window_ms = parse_env("BATCH_WINDOW_MS", DEFAULT_BATCH_WINDOW_MS)?;
        let queue_max_size = parse_env("QUEUE_MAX_SIZE", DEFAULT_QUEUE_MAX_SIZE)?;
        let queue_high_watermark =
            parse_env("QUEUE_HIGH_WATERMARK", DEFAULT_QUEUE_HIGH_WATERMARK)?;
        let request_timeout_ms = parse_env("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        let model_path = env::var("MODEL_PATH").unwrap_or_default();
        let bind_addr_str =
            env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr_str
            .parse()
            .map_err(|e| Error::Config(format!("invalid BIND_ADDR {bind_addr_str:?}: {e}")))?;

        if queue_high_watermark > queue_max_size {
            return Err(Error::Config(format!(
                "QUEUE_HIGH_WATERMARK ({queue_high_watermark}) must be <= QUEUE_MAX_SIZE ({queue_max_size})"
            )));
        }
        if batch_max_size == 0 {
            return Err(Error::Config("BATCH_MAX_SIZE must be >= 1".into()));
        }
        if request_timeout_ms <= batch_window_ms {
            return Err(Error::Config(format!(
                "REQUEST_TIMEOUT_MS ({request_timeout_ms}) must exceed BATCH_WINDOW_MS ({batch_window_ms})"
            )));
        }

        Ok(Config {
            batch_max_size,
            batch_window: Duration::from_millis(batch_window_ms),
            queue_max_size,
            queue_high_watermark,
            request_timeout: Duration::from_millis(request_timeout_ms),
            model_path,
            bind_addr,
        })
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid {name} {raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable tests must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "BATCH_MAX_SIZE",
            "BATCH_WINDOW_MS",
            "QUEUE_MAX_SIZE",
            "QUEUE_HIGH_WATERMARK",
            "REQUEST_TIMEOUT_MS",
            "MODEL_PATH",
            "BIND_ADDR",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.batch_max_size, DEFAULT_BATCH_MAX_SIZE);
        assert_eq!(
            config.batch_window,
            Duration::from_millis(DEFAULT_BATCH_WINDOW_MS)
        );
        assert_eq!(config.queue_max_size, DEFAULT_QUEUE_MAX_SIZE);
        assert_eq!(config.queue_high_watermark, DEFAULT_QUEUE_HIGH_WATERMARK);
    }

    #[test]
    fn rejects_watermark_above_capacity() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("QUEUE_MAX_SIZE", "10");
        env::set_var("QUEUE_HIGH_WATERMARK", "20");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        clear_env();
    }

    #[test]
    fn rejects_timeout_not_exceeding_window() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("BATCH_WINDOW_MS", "500");
        env::set_var("REQUEST_TIMEOUT_MS", "500");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        clear_env();
    }

    #[test]
    fn accepts_zero_watermark_and_capacity() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("QUEUE_MAX_SIZE", "0");
        env::set_var("QUEUE_HIGH_WATERMARK", "0");
        let config = Config::from_env().unwrap();
        assert_eq!(config.queue_max_size, 0);
        assert_eq!(config.queue_high_watermark, 0);
        clear_env();
    }
}
