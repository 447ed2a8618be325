use std::sync::Arc;

use imgsweep_core::{
    update, DispatchEffect, DispatchMsg, DispatchPhase, DispatchState, SweepSettings, TaskId,
};
use imgsweep_logging::{sweep_debug, sweep_error, sweep_info};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{run_worker, DedupStore, Fetcher, SweepSummary, TaskOutcome};

/// Launches fetch tasks against one endpoint until the store's stop predicate
/// fires (or cancellation is requested), then drains in-flight tasks.
pub struct Dispatcher {
    settings: SweepSettings,
    store: Arc<DedupStore>,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(settings: SweepSettings, store: Arc<DedupStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            settings,
            store,
            fetcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Token shared with every worker. Cancelling it stops new launches and
    /// aborts in-flight requests; `run` still waits for the drain.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, base_endpoint: &str) -> SweepSummary {
        let slots = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let base: Arc<str> = Arc::from(base_endpoint);
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut state = DispatchState::new();
        let mut summary = SweepSummary::default();

        sweep_info!(
            "Sweep started: max_concurrency={} repeat_limit={} unique_cap={} pacing={:?}",
            self.settings.max_concurrency,
            self.settings.repeat_limit,
            self.settings.unique_cap,
            self.settings.pacing_interval
        );

        loop {
            match state.phase() {
                DispatchPhase::Running => {
                    let mut permit = self.acquire_slot(&slots).await;
                    let msg = match permit {
                        Some(_) => DispatchMsg::SlotAcquired {
                            should_stop: self.store.should_stop(),
                        },
                        None => DispatchMsg::CancelRequested,
                    };
                    let (next, effects) = update(state, msg);
                    state = next;

                    let mut launched = false;
                    for effect in effects {
                        match effect {
                            DispatchEffect::Launch { task_id } => {
                                if let Some(slot) = permit.take() {
                                    self.launch(&mut tasks, task_id, base.clone(), slot);
                                    launched = true;
                                }
                            }
                            DispatchEffect::ReleaseSlot => drop(permit.take()),
                            DispatchEffect::BroadcastCancel => {
                                match self.store.stop_reason() {
                                    Some(reason) => sweep_info!("Stopping: {}", reason),
                                    None => sweep_info!("Stopping: cancellation requested"),
                                }
                                self.cancel.cancel();
                            }
                            DispatchEffect::Report => {}
                        }
                    }

                    while let Some(joined) = tasks.try_join_next() {
                        collect(joined, &mut summary);
                    }

                    if launched {
                        tokio::select! {
                            _ = self.cancel.cancelled() => {}
                            _ = tokio::time::sleep(self.settings.pacing_interval) => {}
                        }
                    }
                }
                DispatchPhase::Stopping => {
                    sweep_debug!("Draining {} in-flight tasks", tasks.len());
                    while let Some(joined) = tasks.join_next().await {
                        collect(joined, &mut summary);
                    }
                    let (next, effects) = update(state, DispatchMsg::AllSlotsReleased);
                    state = next;
                    if effects.contains(&DispatchEffect::Report) {
                        break;
                    }
                }
                DispatchPhase::Drained => break,
            }
        }

        summary.launched = state.launched();
        summary.unique_count = self.store.snapshot().unique_count;
        summary.stop_reason = self.store.stop_reason();

        let cap = self.settings.unique_cap;
        if self.settings.enforce_cap_strictly && cap > 0 && summary.unique_count > cap {
            summary.pruned = self.store.discard_beyond(cap).await;
            sweep_info!(
                "Strict cap: discarded {} images above {}",
                summary.pruned,
                cap
            );
            summary.unique_count = cap;
        }

        sweep_info!(
            "Total images downloaded: {} (tasks={} duplicates={} failures={} cancelled={})",
            summary.unique_count,
            summary.launched,
            summary.duplicates,
            summary.failures,
            summary.cancelled
        );
        summary
    }

    async fn acquire_slot(&self, slots: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = slots.clone().acquire_owned() => permit.ok(),
        }
    }

    fn launch(
        &self,
        tasks: &mut JoinSet<TaskOutcome>,
        task_id: TaskId,
        base: Arc<str>,
        slot: OwnedSemaphorePermit,
    ) {
        let store = self.store.clone();
        let fetcher = self.fetcher.clone();
        let cancel = self.cancel.clone();
        let cache_bust = self.settings.cache_bust.clone();
        tasks.spawn(async move {
            // Held until the task finishes, whatever the outcome.
            let _slot = slot;
            run_worker(task_id, &base, &cache_bust, &store, fetcher.as_ref(), &cancel).await
        });
    }
}

fn collect(joined: Result<TaskOutcome, JoinError>, summary: &mut SweepSummary) {
    match joined {
        Ok(outcome) => summary.tally(&outcome),
        Err(err) => {
            sweep_error!("Fetch task aborted: {}", err);
            summary.failures += 1;
        }
    }
}
