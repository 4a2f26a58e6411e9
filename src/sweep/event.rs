use super::stats::GridStatistics;

/// What observers of a sweep are told.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    Milestone {
        grid_index: usize,
        replicate_index: usize,
        epoch: usize,
        error: f32,
    },
    /// A replicate converged or was cancelled as an outlier.
    Final {
        grid_index: usize,
        replicate_index: usize,
        epoch: usize,
        converged: bool,
    },
    /// Every replicate of the grid point is done.
    Statistics {
        grid_index: usize,
        stats: GridStatistics,
    },
    WorkerFailed {
        grid_index: usize,
        replicate_index: usize,
        reason: String,
    },
    /// Every worker of the sweep is done.
    SweepStopped,
}

impl SweepEvent {
    /// The grid point the event is about, `None` for sweep wide events.
    pub fn grid_index(&self) -> Option<usize> {
        match *self {
            SweepEvent::Milestone { grid_index, .. }
            | SweepEvent::Final { grid_index, .. }
            | SweepEvent::Statistics { grid_index, .. }
            | SweepEvent::WorkerFailed { grid_index, .. } => Some(grid_index),
            SweepEvent::SweepStopped => None,
        }
    }
}
