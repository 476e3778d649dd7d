//! Telemetry for the license engine.
//!
//! Structured logging via `tracing`, operation spans, and usage metrics via
//! the `metrics` facade.

mod logging;
mod usage;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use usage::{record_license_stats, record_sweep};
pub use spans::{license_span, SpanExt};
