use std::time::Duration;

/// How a task id is folded into the request target so intermediate caches
/// do not short-circuit repeated hits on the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBust {
    /// Append `?{name}={task_id}` (or `&...` when a query is already present).
    QueryParam { name: String },
    /// Append `?` repeated `task_id` times.
    RepeatedMarker,
}

impl Default for CacheBust {
    fn default() -> Self {
        CacheBust::QueryParam {
            name: "cb".to_string(),
        }
    }
}

/// Tunables for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSettings {
    /// Upper bound on in-flight fetches.
    pub max_concurrency: usize,
    /// Consecutive duplicates that end the sweep.
    pub repeat_limit: u64,
    /// Unique payloads that end the sweep; 0 disables the cap.
    pub unique_cap: u64,
    /// Delay between task launches.
    pub pacing_interval: Duration,
    /// Delete files numbered above `unique_cap` once the sweep drains.
    pub enforce_cap_strictly: bool,
    pub cache_bust: CacheBust,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 30,
            repeat_limit: 100,
            unique_cap: 0,
            pacing_interval: Duration::from_millis(50),
            enforce_cap_strictly: false,
            cache_bust: CacheBust::default(),
        }
    }
}
