//! Tests for ledger allocation, promotion and expiry.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use crate::license::{AllocateOutcome, Invocation, LicenseError, ResourceLedger};

    fn inv(id: &str, at: DateTime<Utc>) -> Invocation {
        Invocation::new(id, at)
    }

    fn allocate_ok(ledger: &mut ResourceLedger, invocation: Invocation) {
        assert_eq!(ledger.allocate(invocation).unwrap(), AllocateOutcome::Allocated);
    }

    #[test]
    fn allocate_respects_capacity() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(1);
        allocate_ok(&mut ledger, inv("a", now));

        match ledger.allocate(inv("b", now)).unwrap() {
            AllocateOutcome::Exhausted(returned) => assert_eq!(returned.id, "b"),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(ledger.allocated_count(), 1);
        assert!(ledger.get_allocated("b").is_none());
    }

    #[test]
    fn zero_capacity_never_allocates() {
        let mut ledger = ResourceLedger::new(0);
        let outcome = ledger.allocate(inv("a", Utc::now())).unwrap();
        assert!(matches!(outcome, AllocateOutcome::Exhausted(_)));
        ledger.enqueue(inv("b", Utc::now())).unwrap();
        assert_eq!(ledger.promote(), 0);
        assert_eq!(ledger.queued_count(), 1);
    }

    #[test]
    fn enqueue_then_get_queued_round_trip() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(0);
        assert_eq!(ledger.enqueue(inv("a", now)).unwrap(), 1);
        assert_eq!(ledger.enqueue(inv("b", now)).unwrap(), 2);

        let (found, position) = ledger.get_queued("a").unwrap();
        assert_eq!(found, &inv("a", now));
        assert_eq!(position, 1);
        assert_eq!(ledger.get_queued("b").unwrap().1, 2);
        assert!(ledger.get_queued("missing").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(1);
        allocate_ok(&mut ledger, inv("a", now));
        ledger.enqueue(inv("b", now)).unwrap();

        assert_eq!(
            ledger.enqueue(inv("a", now)),
            Err(LicenseError::DuplicateInvocation { id: "a".into() })
        );
        assert_eq!(
            ledger.allocate(inv("b", now)),
            Err(LicenseError::DuplicateInvocation { id: "b".into() })
        );
        assert_eq!(ledger.allocated_count(), 1);
        assert_eq!(ledger.queued_count(), 1);
    }

    #[test]
    fn promote_is_fifo_and_bounded_by_free_slots() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(2);
        for id in ["a", "b", "c"] {
            ledger.enqueue(inv(id, now)).unwrap();
        }

        assert_eq!(ledger.promote(), 2);
        assert!(ledger.get_allocated("a").is_some());
        assert!(ledger.get_allocated("b").is_some());
        assert_eq!(ledger.get_queued("c").unwrap().1, 1);
        assert_eq!(ledger.allocated_count(), 2);
    }

    #[test]
    fn promote_twice_promotes_nothing_the_second_time() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(1);
        ledger.enqueue(inv("a", now)).unwrap();
        ledger.enqueue(inv("b", now)).unwrap();

        assert_eq!(ledger.promote(), 1);
        assert_eq!(ledger.promote(), 0);
        assert_eq!(ledger.queued_count(), 1);
    }

    #[test]
    fn later_arrival_never_promoted_before_earlier() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(1);
        allocate_ok(&mut ledger, inv("holder", now));
        for id in ["w1", "w2", "w3"] {
            ledger.enqueue(inv(id, now)).unwrap();
        }

        let mut holder = "holder";
        for expected in ["w1", "w2", "w3"] {
            assert_eq!(ledger.forget(holder), 1);
            assert_eq!(ledger.promote(), 1);
            assert!(ledger.get_allocated(expected).is_some());
            assert_eq!(ledger.allocated_count(), 1);
            holder = expected;
        }
        assert_eq!(ledger.queued_count(), 0);
    }

    #[test]
    fn expired_allocation_frees_capacity_for_queue_front() {
        let t0 = Utc::now();
        let cutoff = t0 + Duration::seconds(10);
        let mut ledger = ResourceLedger::new(1);
        allocate_ok(&mut ledger, inv("stale", t0));
        ledger.enqueue(inv("fresh", cutoff + Duration::seconds(1))).unwrap();

        assert_eq!(ledger.expire_allocations(cutoff), 1);
        assert!(ledger.get_allocated("stale").is_none());
        assert_eq!(ledger.promote(), 1);
        assert!(ledger.get_allocated("fresh").is_some());
        assert!(ledger.get_queued("fresh").is_none());
    }

    #[test]
    fn checkin_exactly_at_cutoff_expires() {
        let cutoff = Utc::now();
        let mut ledger = ResourceLedger::new(1);
        allocate_ok(&mut ledger, inv("edge", cutoff));
        assert_eq!(ledger.expire_allocations(cutoff), 1);
    }

    #[test]
    fn expire_queued_preserves_survivor_order() {
        let t0 = Utc::now();
        let cutoff = t0 + Duration::seconds(5);
        let live = cutoff + Duration::seconds(1);
        let mut ledger = ResourceLedger::new(0);
        ledger.enqueue(inv("a", live)).unwrap();
        ledger.enqueue(inv("b", t0)).unwrap();
        ledger.enqueue(inv("c", live)).unwrap();
        ledger.enqueue(inv("d", t0)).unwrap();

        assert_eq!(ledger.expire_queued(cutoff), 2);
        assert_eq!(ledger.get_queued("a").unwrap().1, 1);
        assert_eq!(ledger.get_queued("c").unwrap().1, 2);
        assert!(ledger.get_queued("b").is_none());
    }

    #[test]
    fn release_scenario_promotes_waiter() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(2);
        allocate_ok(&mut ledger, inv("A", now));
        allocate_ok(&mut ledger, inv("B", now));

        let c = match ledger.allocate(inv("C", now)).unwrap() {
            AllocateOutcome::Exhausted(c) => c,
            AllocateOutcome::Allocated => panic!("capacity exceeded"),
        };
        assert_eq!(ledger.enqueue(c).unwrap(), 1);

        assert_eq!(ledger.forget("A"), 1);
        assert_eq!(ledger.promote(), 1);
        assert_eq!(ledger.get_allocated("C").unwrap().id, "C");
        assert!(ledger.get_queued("C").is_none());
        assert_eq!(ledger.allocated_count(), 2);
    }

    #[test]
    fn forget_unknown_id_returns_zero() {
        let mut ledger = ResourceLedger::new(1);
        ledger.enqueue(inv("a", Utc::now())).unwrap();
        assert_eq!(ledger.forget("nobody"), 0);
        assert_eq!(ledger.queued_count(), 1);
    }

    #[test]
    fn forget_removes_queued_invocation() {
        let mut ledger = ResourceLedger::new(0);
        ledger.enqueue(inv("a", Utc::now())).unwrap();
        ledger.enqueue(inv("b", Utc::now())).unwrap();
        assert_eq!(ledger.forget("a"), 1);
        assert_eq!(ledger.get_queued("b").unwrap().1, 1);
    }

    #[test]
    fn stats_decode_key_and_count() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::new(3);
        allocate_ok(&mut ledger, inv("a", now));
        allocate_ok(&mut ledger, inv("b", now));
        ledger.enqueue(inv("c", now)).unwrap();

        let stats = ledger.stats("acme::sim");
        assert_eq!(stats.license.vendor, "acme");
        assert_eq!(stats.license.feature, "sim");
        assert_eq!(stats.total_license_count, 3);
        assert_eq!(stats.allocated_count, 2);
        assert_eq!(stats.queued_count, 1);
    }

    #[test]
    fn stats_on_malformed_key_reports_unknown_vendor() {
        let stats = ResourceLedger::new(1).stats("nosep");
        assert_eq!(stats.license.vendor, "<UNKNOWN>");
        assert_eq!(stats.license.feature, "nosep");
    }
}
