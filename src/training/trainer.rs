use crate::{Result, arch::LearningRule};

/// The hyperparameters a trainer is created with, they never change afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyperparameters {
    pub eta: f32,
    pub momentum: f32,
    pub stop_threshold: f32,
}

impl Hyperparameters {
    pub fn rule(&self) -> LearningRule {
        LearningRule {
            eta: self.eta,
            momentum: self.momentum,
        }
    }
}

/// The outcome of a single training epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub error: f32,
    pub converged: bool,
}

/// A `Trainer` owns the numeric state of its networks and the data to train them with.
pub trait Trainer: Send {
    /// Trains every sample exactly once in a fresh random order.
    ///
    /// # Returns
    /// The epoch's report or a `ShapeMismatch` error, in which case the epoch was aborted.
    fn train_one_epoch(&mut self) -> Result<EpochReport>;

    /// Draws fresh random weights, clears the momentum and resets the epoch counter and error.
    fn reinitialize(&mut self);

    /// Returns the amount of epochs trained since the last (re)initialization.
    fn epoch(&self) -> usize;

    /// Returns the mean error of the last completed epoch.
    fn error(&self) -> f32;

    /// Returns the amount of networks trained together.
    fn replicates(&self) -> usize {
        1
    }
}
