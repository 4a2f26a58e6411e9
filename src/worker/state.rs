use std::fmt;

/// The lifecycle state of a `TrainingWorker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Paused,
    /// The worker reached the stop threshold and parked.
    Successful,
    /// The worker was told to give up and parked.
    Cancelled,
    /// The worker's thread has exited.
    Stopped,
}

impl WorkerState {
    /// Whether the worker is done training until it's restarted.
    pub fn is_finished(self) -> bool {
        matches!(self, WorkerState::Successful | WorkerState::Cancelled)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Paused => "paused",
            WorkerState::Successful => "successful",
            WorkerState::Cancelled => "cancelled",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A point in time view of a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSnapshot {
    pub state: WorkerState,
    pub epoch: usize,
    pub error: f32,
}
