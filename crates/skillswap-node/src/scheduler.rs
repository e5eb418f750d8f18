//! Fixed-interval driver for the engine's scheduled jobs.
//!
//! ```text
//! every matching.interval_secs → find_new_matches_for_open_requests
//! every fraud.interval_secs    → detect_abnormal_credit_activity
//! ```
//!
//! Both jobs are idempotent, so a missed tick is simply picked up by the
//! next one. A failed run is logged and the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use skillswap_exchange::Exchange;
use skillswap_types::ExchangeConfig;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub matching: Duration,
    pub fraud: Duration,
}

impl Cadence {
    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self {
            matching: Duration::from_secs(config.matching.interval_secs.max(1)),
            fraud: Duration::from_secs(config.fraud.interval_secs.max(1)),
        }
    }
}

/// Counters for one scheduler lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub matching_runs: u64,
    pub matches_created: usize,
    pub fraud_runs: u64,
    pub alerts_raised: usize,
}

/// Run both jobs until `shutdown` flips to `true`. The first tick of each
/// fires immediately.
pub async fn run(
    exchange: Arc<Exchange>,
    cadence: Cadence,
    mut shutdown: watch::Receiver<bool>,
) -> JobStats {
    let mut matching = interval(cadence.matching);
    let mut fraud = interval(cadence.fraud);
    matching.set_missed_tick_behavior(MissedTickBehavior::Skip);
    fraud.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stats = JobStats::default();
    tracing::info!(?cadence, "scheduler started");
    loop {
        tokio::select! {
            _ = matching.tick() => {
                stats.matching_runs += 1;
                match exchange.find_new_matches_for_open_requests() {
                    Ok(created) => stats.matches_created += created,
                    Err(err) => tracing::error!(error = %err, "matching sweep failed"),
                }
            }
            _ = fraud.tick() => {
                stats.fraud_runs += 1;
                match exchange.detect_abnormal_credit_activity() {
                    Ok(raised) => stats.alerts_raised += raised.len(),
                    Err(err) => tracing::error!(error = %err, "fraud scan failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::info!(?stats, "scheduler stopped");
    stats
}
