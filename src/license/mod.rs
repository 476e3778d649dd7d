//! License arbitration engine.
//!
//! Tracks per-license-type capacity, a FIFO wait queue and the set of
//! allocated invocations, promotes waiters as licenses free up, and
//! reclaims invocations whose clients stop checking in.

mod error;
mod invocation;
mod ledger;
mod ledger_tests;
mod license_type;
mod registry;
pub mod sweeper;

pub use error::LicenseError;
pub use invocation::Invocation;
pub use ledger::{AllocateOutcome, LicenseStats, ResourceLedger};
pub use license_type::{LicenseType, KEY_SEPARATOR, UNKNOWN_VENDOR};
pub use registry::{LedgerRegistry, LicenseStatus, RegistryConfig, SweepReport};
pub use sweeper::{spawn_stats_exporter, spawn_sweeper, sweep_once, SweeperConfig};
