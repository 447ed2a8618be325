use std::fmt;

use imgsweep_core::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Cancelled,
    Network,
    Body,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Body => write!(f, "body read error"),
        }
    }
}

/// How a single fetch task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    New { name: String },
    Duplicate,
    Failed(FetchError),
    Cancelled,
}

/// Final report of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub unique_count: u64,
    pub launched: u64,
    pub duplicates: u64,
    pub failures: u64,
    pub cancelled: u64,
    /// Files deleted by the strict cap filter.
    pub pruned: u64,
    /// `None` when the sweep was stopped by an external cancellation.
    pub stop_reason: Option<StopReason>,
}

impl SweepSummary {
    pub(crate) fn tally(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::New { .. } => {}
            TaskOutcome::Duplicate => self.duplicates += 1,
            TaskOutcome::Failed(_) => self.failures += 1,
            TaskOutcome::Cancelled => self.cancelled += 1,
        }
    }
}
