//! # skillswap-node
//!
//! Runs the SkillSwap engine as a local process.
//!
//! ## Architecture
//!
//! ```text
//!            SKILLSWAP_CONFIG ──▶ NodeConfig ──▶ tracing subscriber
//!                                    │
//!   data_file ──restore──▶ Exchange (Arc) ◀──── scheduler (matching, fraud)
//!                            ▲      │
//!   stdin ──JSON lines──▶ serve     └──persist on shutdown──▶ data_file
//!                            │
//!                            ▼
//!                          stdout
//! ```
//!
//! The node stops on end of input or Ctrl+C. Either way the scheduler is
//! stopped, the ledger is re-verified, and the snapshot is written.

use std::path::PathBuf;
use std::sync::Arc;

use skillswap_exchange::Exchange;
use skillswap_types::constants::{ENGINE_NAME, VERSION};
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod scheduler;
mod serve;
mod snapshot;

use config::{LogConfig, LogFormat, NodeConfig};
use error::NodeResult;
use scheduler::Cadence;

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    // Logs go to stderr; stdout carries answers only.
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> NodeResult<()> {
    let config = NodeConfig::from_env()?;
    init_logging(&config.log);
    tracing::info!(engine = ENGINE_NAME, version = VERSION, "starting");

    let exchange = Arc::new(Exchange::new(config.exchange.clone()));
    let data_file = config.data_file.as_ref().map(PathBuf::from);
    if let Some(path) = &data_file {
        snapshot::restore_into(&exchange, path)?;
    }

    let (stop, shutdown) = watch::channel(false);
    let jobs = tokio::spawn(scheduler::run(
        Arc::clone(&exchange),
        Cadence::from_config(&config.exchange),
        shutdown,
    ));

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        served = serve::serve(&exchange, stdin, tokio::io::stdout()) => {
            if let Err(err) = served {
                tracing::error!(error = %err, "input stream failed");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
                Err(err) => tracing::error!(error = %err, "signal handler failed, shutting down"),
            }
        }
    }

    // The receiver may already be gone if the scheduler task ended early.
    let _ = stop.send(true);
    match jobs.await {
        Ok(stats) => tracing::info!(?stats, "scheduled jobs finished"),
        Err(err) => tracing::error!(error = %err, "scheduler task failed"),
    }

    if let Err(err) = exchange.verify_integrity() {
        tracing::warn!(error = %err, "integrity check failed at shutdown");
    }
    if let Some(path) = &data_file {
        snapshot::persist(&exchange, path)?;
    }
    tracing::info!("stopped");
    Ok(())
}
