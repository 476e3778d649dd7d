//! Periodic expiry of invocations that stopped checking in.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::registry::{LedgerRegistry, SweepReport};
use crate::telemetry::{record_license_stats, record_sweep};

/// Liveness policy for the sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often clients are expected to check in.
    pub checkin_interval: Duration,
    /// Number of missed check-in intervals before an invocation expires.
    pub expiry_multiplier: u32,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            checkin_interval: Duration::from_secs(10),
            expiry_multiplier: 3,
            sweep_interval: Duration::from_secs(5),
        }
    }
}

impl SweeperConfig {
    /// Time without a check-in after which an invocation is reclaimed.
    pub fn expiry_window(&self) -> Duration {
        self.checkin_interval.saturating_mul(self.expiry_multiplier)
    }

    /// Cutoff timestamp for a sweep running at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match chrono::Duration::from_std(self.expiry_window()) {
            Ok(window) => now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC),
            Err(_) => DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Run one sweep against the registry using the current time.
pub fn sweep_once(registry: &LedgerRegistry, config: &SweeperConfig) -> SweepReport {
    let report = registry.sweep(config.cutoff(Utc::now()));
    record_sweep(&report);
    report
}

/// Spawn the sweep loop. Stops when `shutdown` is cancelled.
pub fn spawn_sweeper(
    registry: Arc<LedgerRegistry>,
    config: SweeperConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("sweeper: shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let report = sweep_once(&registry, &config);
                    if !report.is_noop() {
                        tracing::info!(
                            ledgers = report.ledgers,
                            expired_allocations = report.expired_allocations,
                            expired_queued = report.expired_queued,
                            promoted = report.promoted,
                            reaped = report.reaped,
                            "sweep complete"
                        );
                    }
                }
            }
        }
    })
}

/// Spawn a loop that publishes per-license usage gauges.
pub fn spawn_stats_exporter(
    registry: Arc<LedgerRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    for stats in registry.stats() {
                        record_license_stats(&stats);
                        tracing::debug!(
                            license = %stats.license,
                            total = stats.total_license_count,
                            allocated = stats.allocated_count,
                            queued = stats.queued_count,
                            "license usage"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_multiplier_intervals_back() {
        let config = SweeperConfig {
            checkin_interval: Duration::from_secs(10),
            expiry_multiplier: 3,
            sweep_interval: Duration::from_secs(1),
        };
        let now = Utc::now();
        assert_eq!(config.cutoff(now), now - chrono::Duration::seconds(30));
    }

    #[test]
    fn huge_window_saturates_instead_of_panicking() {
        let config = SweeperConfig {
            checkin_interval: Duration::MAX,
            expiry_multiplier: u32::MAX,
            sweep_interval: Duration::from_secs(1),
        };
        assert_eq!(config.cutoff(Utc::now()), DateTime::<Utc>::MIN_UTC);
    }
}
