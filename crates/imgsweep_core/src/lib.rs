//! imgsweep core: pure dedup accounting and the dispatch state machine.
mod dispatch;
mod fingerprint;
mod ledger;
mod settings;

pub use dispatch::{update, DispatchEffect, DispatchMsg, DispatchPhase, DispatchState, TaskId};
pub use fingerprint::Fingerprint;
pub use ledger::{DedupLedger, LedgerSnapshot, Observation, StopReason};
pub use settings::{CacheBust, SweepSettings};
