mod network_trainer;
mod replica_trainer;
mod trainer;

pub use network_trainer::NetworkTrainer;
pub use replica_trainer::ReplicaTrainer;
pub use trainer::{EpochReport, Hyperparameters, Trainer};

/// Sums the absolute difference between every output and its expected value.
pub(crate) fn abs_error(output: &[f32], expected: &[f32]) -> f32 {
    output
        .iter()
        .zip(expected)
        .map(|(o, t)| (o - t).abs())
        .sum()
}
