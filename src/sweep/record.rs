use serde::Serialize;

use super::stats::GridStatistics;
use crate::worker::{TrainingWorker, WorkerId};

/// How a replicate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalOutcome {
    Converged { epoch: usize },
    /// Given up on as an outlier at `epoch`.
    Cancelled { epoch: usize },
}

impl FinalOutcome {
    pub fn epoch(&self) -> usize {
        match *self {
            FinalOutcome::Converged { epoch } | FinalOutcome::Cancelled { epoch } => epoch,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, FinalOutcome::Converged { .. })
    }
}

/// One sample of a worker's error curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub epoch: usize,
    pub error: f32,
}

/// A learning rate of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPoint {
    pub eta: f64,
    pub label: String,
}

impl GridPoint {
    pub fn new(eta: f64) -> Self {
        Self {
            eta,
            label: format!("η = {eta:.2}"),
        }
    }
}

/// The coordinator's bookkeeping for a single worker.
pub(crate) struct WorkerRecord {
    pub(crate) worker: TrainingWorker,
    pub(crate) last_epoch: Option<usize>,
    pub(crate) history: Vec<CurvePoint>,
    pub(crate) outcome: Option<FinalOutcome>,
}

impl WorkerRecord {
    pub(crate) fn new(worker: TrainingWorker) -> Self {
        Self {
            worker,
            last_epoch: None,
            history: Vec::new(),
            outcome: None,
        }
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.worker.id()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    pub(crate) fn report(&mut self, epoch: usize, error: f32) {
        self.last_epoch = Some(epoch);
        self.history.push(CurvePoint { epoch, error });
    }

    pub(crate) fn reset(&mut self) {
        self.last_epoch = None;
        self.history.clear();
        self.outcome = None;
    }
}

/// The final outcomes gathered for a grid point.
#[derive(Debug, Clone, Default)]
pub struct AggregateRecord {
    finals: Vec<FinalOutcome>,
    replicates: usize,
    highlighted: bool,
    published: bool,
}

impl AggregateRecord {
    pub(crate) fn new(replicates: usize) -> Self {
        Self {
            replicates,
            ..Default::default()
        }
    }

    pub fn finals(&self) -> &[FinalOutcome] {
        &self.finals
    }

    pub fn highlighted(&self) -> bool {
        self.highlighted
    }

    /// Whether every replicate of the grid point has a final outcome.
    pub fn is_complete(&self) -> bool {
        self.finals.len() >= self.replicates
    }

    pub(crate) fn push(&mut self, outcome: FinalOutcome) {
        self.finals.push(outcome);
    }

    pub(crate) fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Marks the statistics as published, returns whether they already were.
    pub(crate) fn publish(&mut self) -> bool {
        std::mem::replace(&mut self.published, true)
    }

    pub(crate) fn is_published(&self) -> bool {
        self.published
    }

    pub(crate) fn reset(&mut self) {
        self.finals.clear();
        self.published = false;
    }

    pub(crate) fn final_epochs(&self) -> Vec<f64> {
        self.finals.iter().map(|f| f.epoch() as f64).collect()
    }

    pub(crate) fn converged_epochs(&self) -> Vec<f64> {
        self.finals
            .iter()
            .filter(|f| f.is_converged())
            .map(|f| f.epoch() as f64)
            .collect()
    }

    /// Computes the statistics of the grid point once it's complete, the trimmed pair is only
    /// computed when it's highlighted.
    pub fn statistics(&self) -> Option<GridStatistics> {
        if !self.is_complete() {
            return None;
        }

        Some(GridStatistics::compute(
            &self.final_epochs(),
            &self.converged_epochs(),
            self.highlighted,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_rounds_eta() {
        assert_eq!(GridPoint::new(0.1).label, "η = 0.10");
        assert_eq!(GridPoint::new(0.30000000000000004).label, "η = 0.30");
    }

    #[test]
    fn statistics_wait_for_every_replicate() {
        let mut aggregate = AggregateRecord::new(3);
        aggregate.push(FinalOutcome::Converged { epoch: 100 });
        aggregate.push(FinalOutcome::Cancelled { epoch: 4000 });
        assert!(aggregate.statistics().is_none());

        aggregate.push(FinalOutcome::Converged { epoch: 300 });
        let stats = aggregate.statistics().unwrap();

        let raw = stats.raw.unwrap();
        assert_eq!(raw.count, 3);
        assert!((raw.mean - 4400. / 3.).abs() < 1e-9);
        assert_eq!(stats.converged, 2);
        assert_eq!(stats.cancelled, 1);
        assert!(stats.trimmed.is_none());

        aggregate.set_highlighted(true);
        let trimmed = aggregate.statistics().unwrap().trimmed.unwrap();
        assert_eq!(trimmed.count, 2);
        assert_eq!(trimmed.mean, 200.);
    }

    #[test]
    fn publishes_once_until_reset() {
        let mut aggregate = AggregateRecord::new(1);

        assert!(!aggregate.publish());
        assert!(aggregate.publish());

        aggregate.reset();
        assert!(!aggregate.is_published());
        assert!(aggregate.finals().is_empty());
    }
}
