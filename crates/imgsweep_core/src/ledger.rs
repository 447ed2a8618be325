use std::collections::HashSet;
use std::fmt;

use crate::Fingerprint;

/// Result of feeding one fingerprint into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sighting. `ordinal` is the new unique count (1-based).
    Novel { ordinal: u64 },
    /// Already seen. `streak` is the duplicate streak including this one.
    Duplicate { streak: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    RepeatLimitReached { streak: u64 },
    UniqueCapReached { count: u64 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::RepeatLimitReached { streak } => {
                write!(f, "{streak} consecutive duplicates")
            }
            StopReason::UniqueCapReached { count } => write!(f, "unique cap reached ({count})"),
        }
    }
}

/// Read-only copy of the ledger counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    pub unique_count: u64,
    pub duplicate_streak: u64,
    pub seen_len: usize,
}

/// Dedup accounting: the set of seen fingerprints plus the counters that
/// drive the stop predicate.
///
/// The ledger itself is single-threaded; callers serialize access (the engine
/// keeps it behind one mutex).
#[derive(Debug, Clone)]
pub struct DedupLedger {
    seen: HashSet<Fingerprint>,
    unique_count: u64,
    duplicate_streak: u64,
    repeat_limit: u64,
    unique_cap: u64,
}

impl DedupLedger {
    /// `unique_cap == 0` disables the cap.
    pub fn new(repeat_limit: u64, unique_cap: u64) -> Self {
        Self {
            seen: HashSet::new(),
            unique_count: 0,
            duplicate_streak: 0,
            repeat_limit,
            unique_cap,
        }
    }

    pub fn observe(&mut self, fingerprint: Fingerprint) -> Observation {
        if self.seen.insert(fingerprint) {
            self.unique_count += 1;
            self.duplicate_streak = 0;
            Observation::Novel {
                ordinal: self.unique_count,
            }
        } else {
            self.duplicate_streak += 1;
            Observation::Duplicate {
                streak: self.duplicate_streak,
            }
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.duplicate_streak >= self.repeat_limit {
            return Some(StopReason::RepeatLimitReached {
                streak: self.duplicate_streak,
            });
        }
        if self.unique_cap > 0 && self.unique_count >= self.unique_cap {
            return Some(StopReason::UniqueCapReached {
                count: self.unique_count,
            });
        }
        None
    }

    pub fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }

    pub fn unique_count(&self) -> u64 {
        self.unique_count
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            unique_count: self.unique_count,
            duplicate_streak: self.duplicate_streak,
            seen_len: self.seen.len(),
        }
    }
}
