//! Per-license-type allocation and queueing state.
//!
//! A ledger holds a fixed capacity, a FIFO wait queue and the set of
//! allocated invocations. It performs no locking of its own; the registry
//! serializes every operation on a ledger behind a per-ledger mutex.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::LicenseError;
use super::invocation::Invocation;
use super::license_type::LicenseType;

/// Result of an allocation attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum AllocateOutcome {
    Allocated,
    /// No free capacity. The invocation is handed back untouched so the
    /// caller can enqueue it instead.
    Exhausted(Invocation),
}

/// Point-in-time usage snapshot for one license type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    pub license: LicenseType,
    pub timestamp: DateTime<Utc>,
    pub total_license_count: u32,
    pub allocated_count: u32,
    pub queued_count: u32,
}

/// Allocations and waiters for a single license type.
#[derive(Debug)]
pub struct ResourceLedger {
    capacity: u32,
    /// Waiting invocations in arrival order.
    queue: VecDeque<Invocation>,
    allocations: HashMap<String, Invocation>,
}

impl ResourceLedger {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
            allocations: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn allocated_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is allocated or waiting.
    pub fn is_idle(&self) -> bool {
        self.allocations.is_empty() && self.queue.is_empty()
    }

    /// True if `id` is allocated or queued in this ledger.
    pub fn contains(&self, id: &str) -> bool {
        self.allocations.contains_key(id) || self.queue.iter().any(|inv| inv.id == id)
    }

    fn free_slots(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.allocations.len())
    }

    /// Append an invocation to the back of the queue.
    ///
    /// Returns the 1-based position it was queued at. The position is a
    /// snapshot; promotions and expiries move it without notice.
    pub fn enqueue(&mut self, inv: Invocation) -> Result<u32, LicenseError> {
        if self.contains(&inv.id) {
            return Err(LicenseError::DuplicateInvocation { id: inv.id });
        }
        self.queue.push_back(inv);
        Ok(self.queue.len() as u32)
    }

    /// Allocate a license to `inv` if one is free.
    pub fn allocate(&mut self, inv: Invocation) -> Result<AllocateOutcome, LicenseError> {
        if self.contains(&inv.id) {
            return Err(LicenseError::DuplicateInvocation { id: inv.id });
        }
        if self.free_slots() == 0 {
            return Ok(AllocateOutcome::Exhausted(inv));
        }
        self.allocations.insert(inv.id.clone(), inv);
        Ok(AllocateOutcome::Allocated)
    }

    /// Move waiters from the front of the queue into allocations until
    /// either capacity or the queue runs out. Returns the number promoted.
    pub fn promote(&mut self) -> usize {
        let count = self.free_slots().min(self.queue.len());
        for inv in self.queue.drain(..count) {
            self.allocations.insert(inv.id.clone(), inv);
        }
        count
    }

    pub fn get_allocated(&self, id: &str) -> Option<&Invocation> {
        self.allocations.get(id)
    }

    /// Queued invocation for `id` with its current 1-based position.
    pub fn get_queued(&self, id: &str) -> Option<(&Invocation, u32)> {
        self.queue
            .iter()
            .enumerate()
            .find(|(_, inv)| inv.id == id)
            .map(|(i, inv)| (inv, i as u32 + 1))
    }

    pub(crate) fn get_allocated_mut(&mut self, id: &str) -> Option<&mut Invocation> {
        self.allocations.get_mut(id)
    }

    pub(crate) fn get_queued_mut(&mut self, id: &str) -> Option<(&mut Invocation, u32)> {
        self.queue
            .iter_mut()
            .enumerate()
            .find(|(_, inv)| inv.id == id)
            .map(|(i, inv)| (inv, i as u32 + 1))
    }

    /// Drop allocations that have not checked in since `cutoff`.
    /// Returns the number removed.
    pub fn expire_allocations(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.allocations.len();
        self.allocations.retain(|_, inv| inv.is_live(cutoff));
        before - self.allocations.len()
    }

    /// Drop queued invocations that have not checked in since `cutoff`,
    /// keeping survivors in order. Returns the number removed.
    pub fn expire_queued(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.queue.len();
        self.queue.retain(|inv| inv.is_live(cutoff));
        before - self.queue.len()
    }

    /// Remove `id` from both allocations and the queue.
    ///
    /// Returns the number of records removed. Anything above 1 means the
    /// ledger held the same ID twice.
    pub fn forget(&mut self, id: &str) -> usize {
        let mut count = usize::from(self.allocations.remove(id).is_some());
        let before = self.queue.len();
        self.queue.retain(|inv| inv.id != id);
        count += before - self.queue.len();

        if count > 1 {
            tracing::error!(
                invocation_id = %id,
                removed = count,
                "ledger invariant violated: invocation held more than once"
            );
        }
        count
    }

    /// Usage snapshot for the license type encoded in `key`.
    pub fn stats(&self, key: &str) -> LicenseStats {
        self.snapshot(LicenseType::from_key(key), Utc::now())
    }

    /// Usage snapshot for an already-decoded license type.
    pub fn snapshot(&self, license: LicenseType, timestamp: DateTime<Utc>) -> LicenseStats {
        LicenseStats {
            license,
            timestamp,
            total_license_count: self.capacity,
            allocated_count: self.allocations.len() as u32,
            queued_count: self.queue.len() as u32,
        }
    }
}
