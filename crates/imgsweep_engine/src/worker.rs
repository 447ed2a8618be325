use imgsweep_core::{CacheBust, TaskId};
use imgsweep_logging::{sweep_info, sweep_warn};
use tokio_util::sync::CancellationToken;

use crate::{variant, DedupStore, FailureKind, Fetcher, RecordOutcome, TaskOutcome};

/// Runs one fetch task to completion. Failures are logged and reported in the
/// outcome; they never touch the store.
pub async fn run_worker(
    task_id: TaskId,
    base_endpoint: &str,
    cache_bust: &CacheBust,
    store: &DedupStore,
    fetcher: &dyn Fetcher,
    cancel: &CancellationToken,
) -> TaskOutcome {
    let target = match variant(base_endpoint, task_id, cache_bust) {
        Ok(target) => target,
        Err(err) => {
            sweep_warn!("[#{}] Error creating request: {}", task_id, err);
            return TaskOutcome::Failed(err);
        }
    };

    let body = match fetcher.fetch(&target, cancel).await {
        Ok(body) => body,
        Err(err) if err.kind == FailureKind::Cancelled => {
            sweep_info!("[#{}] Cancelled", task_id);
            return TaskOutcome::Cancelled;
        }
        Err(err) => {
            sweep_warn!("[#{}] Download failed: {}", task_id, err);
            return TaskOutcome::Failed(err);
        }
    };

    match store.record_if_new(body).await {
        RecordOutcome::New { name, .. } => {
            sweep_info!("[#{}] New image saved: {}", task_id, name);
            TaskOutcome::New { name }
        }
        RecordOutcome::Duplicate { streak } => {
            sweep_info!("[#{}] Repeated image (streak {})", task_id, streak);
            TaskOutcome::Duplicate
        }
    }
}
