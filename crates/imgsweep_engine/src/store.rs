use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use imgsweep_core::{DedupLedger, Fingerprint, LedgerSnapshot, Observation, StopReason};
use imgsweep_logging::{sweep_debug, sweep_error, sweep_warn};

use crate::{image_file_name, PayloadSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Counted as unique. `stored_at` is `None` when the write failed; the
    /// payload still counts.
    New {
        name: String,
        stored_at: Option<PathBuf>,
    },
    Duplicate { streak: u64 },
}

impl RecordOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, RecordOutcome::New { .. })
    }
}

/// Shared dedup store: the ledger behind a single lock plus the sink that
/// receives unique payloads.
pub struct DedupStore {
    ledger: Mutex<DedupLedger>,
    sink: Arc<dyn PayloadSink>,
}

impl DedupStore {
    pub fn new(repeat_limit: u64, unique_cap: u64, sink: Box<dyn PayloadSink>) -> Self {
        Self {
            ledger: Mutex::new(DedupLedger::new(repeat_limit, unique_cap)),
            sink: Arc::from(sink),
        }
    }

    /// Counts `payload` and, if it is new, hands it to the sink on the
    /// blocking pool. The ordinal is assigned under the lock but the write
    /// is not, so `unique_count == N` does not imply file N is on disk yet.
    pub async fn record_if_new(&self, payload: Vec<u8>) -> RecordOutcome {
        let fingerprint = Fingerprint::of(&payload);
        let observation = self.lock().observe(fingerprint);

        match observation {
            Observation::Duplicate { streak } => {
                sweep_debug!("Fingerprint {} seen before (streak {})", fingerprint.short(), streak);
                RecordOutcome::Duplicate { streak }
            }
            Observation::Novel { ordinal } => {
                let name = image_file_name(ordinal);
                let stored_at = self.persist(&name, payload).await;
                RecordOutcome::New { name, stored_at }
            }
        }
    }

    pub fn should_stop(&self) -> bool {
        self.lock().should_stop()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.lock().stop_reason()
    }

    /// Removes stored payloads numbered above `cap` and returns how many were
    /// deleted. The ledger keeps counting them as seen.
    pub async fn discard_beyond(&self, cap: u64) -> u64 {
        let count = self.lock().unique_count();
        let sink = Arc::clone(&self.sink);
        let removal = tokio::task::spawn_blocking(move || {
            let mut removed = 0;
            for ordinal in cap.saturating_add(1)..=count {
                let name = image_file_name(ordinal);
                match sink.remove(&name) {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(err) => sweep_warn!("Failed to discard {}: {}", name, err),
                }
            }
            removed
        });
        match removal.await {
            Ok(removed) => removed,
            Err(err) => {
                sweep_error!("Discard task failed: {}", err);
                0
            }
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    // Sink writes may fsync; keep them off the runtime threads.
    async fn persist(&self, name: &str, payload: Vec<u8>) -> Option<PathBuf> {
        let sink = Arc::clone(&self.sink);
        let target = name.to_string();
        match tokio::task::spawn_blocking(move || sink.store(&target, &payload)).await {
            Ok(Ok(path)) => Some(path),
            Ok(Err(err)) => {
                sweep_error!("Error saving {}: {}", name, err);
                None
            }
            Err(err) => {
                sweep_error!("Write task for {} failed: {}", name, err);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DedupLedger> {
        // The ledger has no invariants a panicking holder could break halfway.
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
