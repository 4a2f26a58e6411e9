use super::WorkerId;

/// A progress report sent by a worker to whoever listens on its channel.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerEvent {
    pub id: WorkerId,
    pub generation: u64,
    pub kind: WorkerEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEventKind {
    /// Sent every `milestone_interval` epochs.
    Milestone { epoch: usize, error: f32 },
    /// Sent once when the epoch error drops below the stop threshold.
    Converged { epoch: usize, error: f32 },
    /// An epoch was aborted, training goes on with the next one.
    Failed { epoch: usize, reason: String },
}
