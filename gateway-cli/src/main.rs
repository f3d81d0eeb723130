//! CLI entry point: loads configuration from the environment, installs the
//! model, sets up structured logging, and serves the gateway until
//! interrupted, draining the intake queue on shutdown.
//!
//! Logging setup follows the teacher CLI's `setup_subscriber`: an
//! `EnvFilter` sourced from `RUST_LOG` (defaulting to `info`), JSON output.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gateway::{Config, Error, LogisticRegressionPredictor, Metrics, Predictor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Request-coalescing inference gateway.
#[derive(Debug, Parser)]
#[command(name = "gateway", version, about)]
struct Cli {
    /// Log level filter, e.g. "info", "gateway=debug". Overrides RUST_LOG.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn setup_subscriber(log_level: Option<&str>) {
    let filter = log_level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_subscriber(cli.log_level.as_deref());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    info!(
        batch_max_size = config.batch_max_size,
        queue_max_size = config.queue_max_size,
        bind_addr = %config.bind_addr,
        "starting gateway"
    );

    let predictor: Arc<dyn Predictor> = Arc::new(LogisticRegressionPredictor::load(&config.model_path)?);
    let metrics = Arc::new(Metrics::install());
    let bind_addr = config.bind_addr;

    let gateway = gateway::build(config, predictor, metrics);
    let queue = gateway.queue.clone();

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {bind_addr}: {e}")))?;

    let serve = axum::serve(listener, gateway.router).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = serve.await {
        error!(error = %e, "http server error");
    }

    info!("shutting down, draining intake queue");
    gateway.assembler.abort();
    for ticket in queue.drain() {
        let _ = ticket.respond_to.send(Err(Error::Cancelled));
    }

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!(error = %e, "failed to install signal handler"),
    }
}
