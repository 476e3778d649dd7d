//! Metrics facade hooks for license usage.
//!
//! Only the `metrics` facade is used; installing an exporter is left to the
//! embedding process.

use crate::license::{LicenseStats, SweepReport};

/// Publish usage gauges for one license type.
pub fn record_license_stats(stats: &LicenseStats) {
    let labels = [
        ("vendor", stats.license.vendor.clone()),
        ("feature", stats.license.feature.clone()),
    ];
    metrics::gauge!("flextape_license_total", &labels).set(f64::from(stats.total_license_count));
    metrics::gauge!("flextape_license_allocated", &labels).set(f64::from(stats.allocated_count));
    metrics::gauge!("flextape_license_queued", &labels).set(f64::from(stats.queued_count));
}

/// Count the work done by a sweep.
pub fn record_sweep(report: &SweepReport) {
    metrics::counter!("flextape_sweeps_total").increment(1);
    metrics::counter!("flextape_expired_allocations_total")
        .increment(report.expired_allocations as u64);
    metrics::counter!("flextape_expired_queued_total").increment(report.expired_queued as u64);
    metrics::counter!("flextape_promotions_total").increment(report.promoted as u64);
}
