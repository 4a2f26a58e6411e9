use std::{fmt, num::NonZeroUsize};

/// The position of a worker in the sweep grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId {
    pub grid_index: usize,
    pub replicate_index: usize,
}

impl WorkerId {
    pub fn new(grid_index: usize, replicate_index: usize) -> Self {
        Self {
            grid_index,
            replicate_index,
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.grid_index, self.replicate_index)
    }
}

/// Immutable execution parameters for a worker instance.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    id: WorkerId,
    milestone_interval: NonZeroUsize,
    generation: u64,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `id` - The worker's position in the grid.
    /// * `milestone_interval` - The amount of epochs between milestone events.
    /// * `generation` - The grid generation the worker belongs to, echoed in every event.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(id: WorkerId, milestone_interval: NonZeroUsize, generation: u64) -> Self {
        Self {
            id,
            milestone_interval,
            generation,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn milestone_interval(&self) -> usize {
        self.milestone_interval.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
