//! Thread-safe registry of license ledgers.
//!
//! One [`ResourceLedger`] exists per license type, created on first request.
//! Each ledger sits behind its own mutex so operations on different license
//! types never contend; the composite operations (allocate-or-enqueue,
//! check-in, release-and-promote, expire-and-promote) each run under a
//! single acquisition of that lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use super::error::LicenseError;
use super::invocation::Invocation;
use super::ledger::{AllocateOutcome, LicenseStats, ResourceLedger};
use super::license_type::LicenseType;
use crate::telemetry::{license_span, SpanExt};

/// Capacity policy for lazily created ledgers.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Capacity per configured license type.
    pub capacities: HashMap<LicenseType, u32>,
    /// Capacity for license types absent from `capacities`. `None` rejects
    /// requests for unconfigured license types.
    pub default_capacity: Option<u32>,
    /// Drop ledgers with nothing allocated or queued during sweeps.
    pub reap_empty: bool,
}

impl RegistryConfig {
    /// Config that gives every license type the same capacity.
    pub fn uniform(capacity: u32) -> Self {
        Self {
            default_capacity: Some(capacity),
            ..Default::default()
        }
    }

    fn capacity_for(&self, license: &LicenseType) -> Option<u32> {
        self.capacities.get(license).copied().or(self.default_capacity)
    }
}

/// Where an invocation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseStatus {
    Allocated,
    /// Waiting, with the 1-based queue position at the time of the call.
    Queued { position: u32 },
}

/// Totals from one sweep across all ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub ledgers: usize,
    pub expired_allocations: usize,
    pub expired_queued: usize,
    pub promoted: usize,
    pub reaped: usize,
}

impl SweepReport {
    /// True if the sweep changed no ledger.
    pub fn is_noop(&self) -> bool {
        self.expired_allocations == 0
            && self.expired_queued == 0
            && self.promoted == 0
            && self.reaped == 0
    }
}

struct LedgerSlot {
    license: LicenseType,
    ledger: ResourceLedger,
}

type SharedSlot = Arc<Mutex<LedgerSlot>>;

/// Owns every license ledger and routes client operations to them.
pub struct LedgerRegistry {
    ledgers: DashMap<String, SharedSlot>,
    config: RegistryConfig,
    accepting: AtomicBool,
}

impl LedgerRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            ledgers: DashMap::new(),
            config,
            accepting: AtomicBool::new(true),
        }
    }

    /// Number of ledgers currently held.
    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    /// Check if new requests are accepted.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stop accepting new requests. Existing invocations can still check
    /// in and release.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            tracing::info!(ledgers = self.ledgers.len(), "license registry shutting down");
        }
    }

    fn existing(&self, license: &LicenseType) -> Option<SharedSlot> {
        self.ledgers.get(&license.key()).map(|slot| Arc::clone(slot.value()))
    }

    fn ledger_for(&self, license: &LicenseType) -> Result<SharedSlot, LicenseError> {
        if let Some(slot) = self.existing(license) {
            return Ok(slot);
        }

        let Some(capacity) = self.config.capacity_for(license) else {
            tracing::warn!(
                vendor = %license.vendor,
                feature = %license.feature,
                "request for unconfigured license type"
            );
            return Err(LicenseError::UnknownLicense {
                license: license.to_string(),
            });
        };

        let slot = self
            .ledgers
            .entry(license.key())
            .or_insert_with(|| {
                tracing::debug!(
                    vendor = %license.vendor,
                    feature = %license.feature,
                    capacity,
                    "created license ledger"
                );
                Arc::new(Mutex::new(LedgerSlot {
                    license: license.clone(),
                    ledger: ResourceLedger::new(capacity),
                }))
            })
            .value()
            .clone();
        Ok(slot)
    }

    /// Allocate a license to `inv`, or queue it if none is free.
    pub fn request(
        &self,
        license: &LicenseType,
        inv: Invocation,
    ) -> Result<LicenseStatus, LicenseError> {
        let span = license_span(license, &inv.id);
        let _enter = span.enter();

        let result = self.request_inner(license, inv);
        span.record_result(&result);
        result
    }

    fn request_inner(
        &self,
        license: &LicenseType,
        inv: Invocation,
    ) -> Result<LicenseStatus, LicenseError> {
        if !self.is_accepting() {
            return Err(LicenseError::ShuttingDown);
        }

        let slot = self.ledger_for(license)?;
        let mut slot = slot.lock();
        let ledger = &mut slot.ledger;

        match ledger.allocate(inv)? {
            AllocateOutcome::Allocated => {
                tracing::debug!(allocated = ledger.allocated_count(), "license allocated");
                Ok(LicenseStatus::Allocated)
            }
            AllocateOutcome::Exhausted(inv) => {
                let position = ledger.enqueue(inv)?;
                tracing::debug!(position, "license exhausted, invocation queued");
                Ok(LicenseStatus::Queued { position })
            }
        }
    }

    /// Refresh the liveness of invocation `id`.
    pub fn checkin(&self, license: &LicenseType, id: &str) -> Result<LicenseStatus, LicenseError> {
        self.checkin_at(license, id, Utc::now())
    }

    /// Refresh the liveness of invocation `id` as of `now`.
    pub fn checkin_at(
        &self,
        license: &LicenseType,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<LicenseStatus, LicenseError> {
        let not_found = || LicenseError::InvocationNotFound { id: id.to_string() };
        let slot = self.existing(license).ok_or_else(not_found)?;
        let mut slot = slot.lock();
        let ledger = &mut slot.ledger;

        if let Some(inv) = ledger.get_allocated_mut(id) {
            inv.checkin(now);
            return Ok(LicenseStatus::Allocated);
        }
        if let Some((inv, position)) = ledger.get_queued_mut(id) {
            inv.checkin(now);
            return Ok(LicenseStatus::Queued { position });
        }

        tracing::debug!(invocation_id = %id, license = %license, "check-in for unknown invocation");
        Err(not_found())
    }

    /// Current status of invocation `id` without touching its liveness.
    pub fn status(&self, license: &LicenseType, id: &str) -> Result<LicenseStatus, LicenseError> {
        let not_found = || LicenseError::InvocationNotFound { id: id.to_string() };
        let slot = self.existing(license).ok_or_else(not_found)?;
        let slot = slot.lock();

        if slot.ledger.get_allocated(id).is_some() {
            return Ok(LicenseStatus::Allocated);
        }
        slot.ledger
            .get_queued(id)
            .map(|(_, position)| LicenseStatus::Queued { position })
            .ok_or_else(not_found)
    }

    /// Drop invocation `id` and hand any freed license to the queue.
    ///
    /// Returns the number of records removed; releasing an unknown ID is
    /// not an error.
    pub fn release(&self, license: &LicenseType, id: &str) -> usize {
        let Some(slot) = self.existing(license) else {
            return 0;
        };
        let mut slot = slot.lock();
        let removed = slot.ledger.forget(id);
        let promoted = slot.ledger.promote();

        tracing::info!(
            invocation_id = %id,
            license = %license,
            removed,
            promoted,
            "license released"
        );
        removed
    }

    /// Reclaim every allocation and queue slot whose last check-in is at or
    /// before `cutoff`, then promote waiters into the freed licenses.
    pub fn sweep(&self, cutoff: DateTime<Utc>) -> SweepReport {
        let slots: Vec<SharedSlot> = self.ledgers.iter().map(|e| Arc::clone(e.value())).collect();
        let mut report = SweepReport {
            ledgers: slots.len(),
            ..Default::default()
        };

        for slot in &slots {
            let mut slot = slot.lock();
            let expired_allocations = slot.ledger.expire_allocations(cutoff);
            let expired_queued = slot.ledger.expire_queued(cutoff);
            let promoted = slot.ledger.promote();

            if expired_allocations + expired_queued + promoted > 0 {
                tracing::info!(
                    license = %slot.license,
                    expired_allocations,
                    expired_queued,
                    promoted,
                    "expired stale invocations"
                );
            }
            report.expired_allocations += expired_allocations;
            report.expired_queued += expired_queued;
            report.promoted += promoted;
        }
        drop(slots);

        if self.config.reap_empty {
            report.reaped = self.reap_idle();
        }
        report
    }

    /// Remove ledgers that are idle and referenced only by the map.
    ///
    /// The map's shard lock is held while checking, so no other caller can
    /// obtain a handle to a ledger that is being removed.
    fn reap_idle(&self) -> usize {
        let mut reaped = 0;
        self.ledgers.retain(|_, slot| {
            let idle = Arc::strong_count(slot) == 1
                && slot.try_lock().map_or(false, |s| s.ledger.is_idle());
            if idle {
                reaped += 1;
            }
            !idle
        });
        if reaped > 0 {
            tracing::debug!(reaped, "dropped idle license ledgers");
        }
        reaped
    }

    /// One usage snapshot per license type, ordered by license.
    pub fn stats(&self) -> Vec<LicenseStats> {
        let now = Utc::now();
        let slots: Vec<SharedSlot> = self.ledgers.iter().map(|e| Arc::clone(e.value())).collect();
        let mut stats: Vec<LicenseStats> = slots
            .iter()
            .map(|slot| {
                let slot = slot.lock();
                slot.ledger.snapshot(slot.license.clone(), now)
            })
            .collect();
        stats.sort_by(|a, b| a.license.cmp(&b.license));
        stats
    }
}

impl Default for LedgerRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
