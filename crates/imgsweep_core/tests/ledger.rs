use std::sync::Once;

use imgsweep_core::{DedupLedger, Fingerprint, LedgerSnapshot, Observation, StopReason};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(imgsweep_logging::initialize_for_tests);
}

fn feed(ledger: &mut DedupLedger, payload: &[u8]) -> Observation {
    ledger.observe(Fingerprint::of(payload))
}

fn is_new(observation: Observation) -> bool {
    matches!(observation, Observation::Novel { .. })
}

#[test]
fn unique_count_tracks_distinct_payloads_at_every_step() {
    init_logging();
    let mut ledger = DedupLedger::new(1_000, 0);
    let payloads: [&[u8]; 8] = [b"a", b"b", b"a", b"c", b"c", b"d", b"a", b"e"];
    let mut distinct = std::collections::HashSet::new();

    for payload in payloads {
        feed(&mut ledger, payload);
        distinct.insert(payload);
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.unique_count, distinct.len() as u64);
        assert_eq!(snapshot.seen_len as u64, snapshot.unique_count);
    }
}

#[test]
fn same_payload_n_times_is_one_new_and_n_minus_one_duplicates() {
    init_logging();
    let mut ledger = DedupLedger::new(1_000, 0);
    let results: Vec<_> = (0..6).map(|_| feed(&mut ledger, b"same")).collect();

    assert_eq!(results[0], Observation::Novel { ordinal: 1 });
    assert_eq!(results.iter().filter(|o| is_new(**o)).count(), 1);
    assert_eq!(results[5], Observation::Duplicate { streak: 5 });
    assert_eq!(
        ledger.snapshot(),
        LedgerSnapshot {
            unique_count: 1,
            duplicate_streak: 5,
            seen_len: 1,
        }
    );
}

#[test]
fn novel_payload_resets_the_streak() {
    init_logging();
    let mut ledger = DedupLedger::new(1_000, 0);
    feed(&mut ledger, b"x");
    for _ in 0..4 {
        feed(&mut ledger, b"x");
    }
    assert_eq!(ledger.snapshot().duplicate_streak, 4);

    assert_eq!(feed(&mut ledger, b"y"), Observation::Novel { ordinal: 2 });
    assert_eq!(ledger.snapshot().duplicate_streak, 0);
}

#[test]
fn repeat_limit_scenario_stops_after_three_duplicates() {
    init_logging();
    let mut ledger = DedupLedger::new(3, 0);
    let results: Vec<bool> = [b"A", b"B", b"A", b"A", b"A"]
        .iter()
        .map(|p| is_new(feed(&mut ledger, *p)))
        .collect();

    assert_eq!(results, vec![true, true, false, false, false]);
    assert!(ledger.should_stop());
    assert_eq!(
        ledger.stop_reason(),
        Some(StopReason::RepeatLimitReached { streak: 3 })
    );
}

#[test]
fn unique_cap_scenario_stops_after_two_uniques() {
    init_logging();
    let mut ledger = DedupLedger::new(100, 2);
    feed(&mut ledger, b"A");
    assert!(!ledger.should_stop());
    feed(&mut ledger, b"B");
    assert!(ledger.should_stop());
    assert_eq!(
        ledger.stop_reason(),
        Some(StopReason::UniqueCapReached { count: 2 })
    );
}

#[test]
fn zero_cap_never_stops_on_count() {
    init_logging();
    let mut ledger = DedupLedger::new(100, 0);
    for i in 0..500u32 {
        feed(&mut ledger, &i.to_le_bytes());
    }
    assert_eq!(ledger.unique_count(), 500);
    assert!(!ledger.should_stop());
}

#[test]
fn stop_predicate_is_stable_for_an_unchanged_state() {
    init_logging();
    let mut ledger = DedupLedger::new(2, 0);
    feed(&mut ledger, b"q");
    feed(&mut ledger, b"q");
    feed(&mut ledger, b"q");
    let reason = ledger.stop_reason();
    assert!(reason.is_some());
    for _ in 0..10 {
        assert_eq!(ledger.stop_reason(), reason);
        assert!(ledger.should_stop());
    }
}
