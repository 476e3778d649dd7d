//! Invocation liveness record.

use chrono::{DateTime, Utc};

/// One client's outstanding claim against a license type.
///
/// The ID is assigned by the caller and must be unique among the
/// invocations outstanding for the same license type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub id: String,
    pub last_checkin: DateTime<Utc>,
}

impl Invocation {
    /// Create an invocation that last checked in at `now`.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            last_checkin: now,
        }
    }

    /// Record a liveness signal from the owning client.
    pub fn checkin(&mut self, now: DateTime<Utc>) {
        self.last_checkin = now;
    }

    /// True if the invocation has checked in strictly after `cutoff`.
    pub fn is_live(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_checkin > cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn checkin_moves_timestamp_forward() {
        let t0 = Utc::now();
        let mut inv = Invocation::new("a", t0);
        inv.checkin(t0 + Duration::seconds(5));
        assert_eq!(inv.last_checkin, t0 + Duration::seconds(5));
    }

    #[test]
    fn checkin_at_cutoff_is_not_live() {
        let t0 = Utc::now();
        let inv = Invocation::new("a", t0);
        assert!(!inv.is_live(t0));
        assert!(inv.is_live(t0 - Duration::milliseconds(1)));
    }
}
