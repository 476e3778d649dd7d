//! Flextape license arbitration engine.
//!
//! Arbitrates a countable pool of licenses per (vendor, feature) pair among
//! concurrent invocations. Each invocation is either allocated a license at
//! once or queued in strict arrival order until one frees up. Clients check
//! in periodically; allocations and queue slots of clients that stop
//! checking in are reclaimed by a periodic sweep.
//!
//! The engine is in-memory and transport-agnostic: a request-handling layer
//! holds an `Arc<LedgerRegistry>` and maps its own wire messages onto
//! [`LedgerRegistry::request`], [`LedgerRegistry::checkin`],
//! [`LedgerRegistry::release`] and [`LedgerRegistry::stats`].

pub mod config;
pub mod license;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use license::{spawn_stats_exporter, spawn_sweeper, LedgerRegistry, RegistryConfig, SweeperConfig};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub registry: RegistryConfig,
    pub sweeper: SweeperConfig,
    pub stats_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            sweeper: SweeperConfig::default(),
            stats_interval: Duration::from_secs(60),
        }
    }
}

impl From<config::EnvConfig> for ServiceConfig {
    fn from(env: config::EnvConfig) -> Self {
        Self {
            registry: env.registry,
            sweeper: env.sweeper,
            stats_interval: env.stats_interval,
        }
    }
}

/// A running license service: the registry plus its background tasks.
pub struct Service {
    pub registry: Arc<LedgerRegistry>,
    shutdown: CancellationToken,
    sweeper: JoinHandle<()>,
    stats_exporter: JoinHandle<()>,
}

impl Service {
    /// Build the registry and spawn the sweeper and stats exporter.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ServiceConfig) -> Self {
        let registry = Arc::new(LedgerRegistry::new(config.registry));
        let shutdown = CancellationToken::new();
        let sweeper = spawn_sweeper(registry.clone(), config.sweeper, shutdown.clone());
        let stats_exporter =
            spawn_stats_exporter(registry.clone(), config.stats_interval, shutdown.clone());

        Self {
            registry,
            shutdown,
            sweeper,
            stats_exporter,
        }
    }

    /// Stop accepting requests and wait for background tasks to exit.
    pub async fn shutdown(self) {
        self.registry.shutdown();
        self.shutdown.cancel();
        for (name, handle) in [("sweeper", self.sweeper), ("stats_exporter", self.stats_exporter)] {
            if let Err(e) = handle.await {
                tracing::error!(task = name, error = %e, "background task failed");
            }
        }
    }
}
