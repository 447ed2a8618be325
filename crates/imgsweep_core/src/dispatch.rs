/// Sequence number of a fetch task; only used to derive the request variant.
pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPhase {
    #[default]
    Running,
    Stopping,
    Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMsg {
    /// A worker slot is held and the stop predicate was evaluated.
    SlotAcquired { should_stop: bool },
    /// Cancellation was requested from outside the dispatch loop.
    CancelRequested,
    /// Every launched task has released its slot.
    AllSlotsReleased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEffect {
    /// Spawn a worker for `task_id`; it takes ownership of the held slot.
    Launch { task_id: TaskId },
    /// Give back a slot that will not be used.
    ReleaseSlot,
    BroadcastCancel,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchState {
    phase: DispatchPhase,
    next_task_id: TaskId,
}

impl DispatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Number of tasks launched so far.
    pub fn launched(&self) -> u64 {
        self.next_task_id
    }
}

/// Pure transition function for the dispatcher: applies a message and returns
/// the effects the async loop has to carry out.
///
/// In `Running` the stop predicate is evaluated only after a slot is held
/// (`SlotAcquired { should_stop }`). Checking later never launches more than
/// checking first would, and it keeps at most `max_concurrency - 1` other
/// tasks in flight when a launch is decided.
pub fn update(mut state: DispatchState, msg: DispatchMsg) -> (DispatchState, Vec<DispatchEffect>) {
    let effects = match (state.phase, msg) {
        (DispatchPhase::Running, DispatchMsg::SlotAcquired { should_stop: false }) => {
            let task_id = state.next_task_id;
            state.next_task_id += 1;
            vec![DispatchEffect::Launch { task_id }]
        }
        (DispatchPhase::Running, DispatchMsg::SlotAcquired { should_stop: true }) => {
            state.phase = DispatchPhase::Stopping;
            vec![DispatchEffect::ReleaseSlot, DispatchEffect::BroadcastCancel]
        }
        (_, DispatchMsg::SlotAcquired { .. }) => vec![DispatchEffect::ReleaseSlot],
        (DispatchPhase::Running, DispatchMsg::CancelRequested) => {
            state.phase = DispatchPhase::Stopping;
            vec![DispatchEffect::BroadcastCancel]
        }
        (DispatchPhase::Stopping, DispatchMsg::AllSlotsReleased) => {
            state.phase = DispatchPhase::Drained;
            vec![DispatchEffect::Report]
        }
        // Draining only means something once new launches have stopped.
        (_, DispatchMsg::CancelRequested) | (_, DispatchMsg::AllSlotsReleased) => Vec::new(),
    };

    (state, effects)
}
