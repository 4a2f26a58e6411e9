use std::sync::Arc;

use log::debug;
use rand::{Rng, rngs::StdRng, seq::SliceRandom};
use rand_distr::Uniform;

use super::{EpochReport, Hyperparameters, Trainer, abs_error};
use crate::{
    Result, SweepErr,
    arch::{LayerTopology, NetworkState, WEIGHT_RANGE},
    dataset::Dataset,
    initialization::RandParamGen,
};

/// Trains a group of replicate networks under the same hyperparameters.
///
/// Every replicate sees the samples in the same order, but the group only converges once the
/// error averaged over the replicates is below the stop threshold for every sample.
pub struct ReplicaTrainer<R: Rng = StdRng> {
    replicas: Vec<NetworkState>,
    dataset: Arc<Dataset>,
    hyper: Hyperparameters,
    init: Uniform<f32>,
    order: Vec<usize>,
    epoch: usize,
    error: f32,
    rng: R,
}

impl<R: Rng> ReplicaTrainer<R> {
    /// Creates a new `ReplicaTrainer`.
    ///
    /// # Arguments
    /// * `topology` - The widths of the layers every replicate shares.
    /// * `replicas` - The amount of replicate networks, at least 1.
    /// * `dataset` - The samples to train with.
    /// * `hyper` - The learning rate, momentum and stop threshold.
    /// * `rng` - The random source for the weights and the sample order.
    ///
    /// # Returns
    /// A new `ReplicaTrainer` instance or an error.
    pub fn new(
        topology: LayerTopology,
        replicas: usize,
        dataset: Arc<Dataset>,
        hyper: Hyperparameters,
        mut rng: R,
    ) -> Result<Self> {
        if replicas == 0 {
            return Err(SweepErr::InvalidConfig(
                "a replica trainer needs at least one replicate".into(),
            ));
        }

        let init = Uniform::new_inclusive(-WEIGHT_RANGE, WEIGHT_RANGE)?;
        let replicas = (0..replicas)
            .map(|_| {
                let mut network = NetworkState::new(topology.clone());
                network.fill_weights(&mut RandParamGen::new(&mut rng, &init));
                network
            })
            .collect();

        Ok(Self {
            replicas,
            order: (0..dataset.len()).collect(),
            dataset,
            hyper,
            init,
            epoch: 0,
            error: 0.,
            rng,
        })
    }

    pub fn replica(&self, i: usize) -> &NetworkState {
        &self.replicas[i]
    }
}

impl<R: Rng + Send> Trainer for ReplicaTrainer<R> {
    fn train_one_epoch(&mut self) -> Result<EpochReport> {
        self.epoch += 1;
        self.order.shuffle(&mut self.rng);

        let rule = self.hyper.rule();
        let count = self.replicas.len() as f32;
        let mut total = 0.;
        let mut within = true;

        for &i in &self.order {
            let (x, y) = self.dataset.sample(i);
            let mut sample_error = 0.;

            for network in &mut self.replicas {
                let output = network.forward(x)?;
                sample_error += abs_error(&output, y);
                network.backprop(&output, y, rule)?;
            }

            let averaged = sample_error / count;
            within &= averaged < self.hyper.stop_threshold;
            total += averaged;
        }

        self.error = total / self.order.len() as f32;

        Ok(EpochReport {
            epoch: self.epoch,
            error: self.error,
            converged: within,
        })
    }

    fn reinitialize(&mut self) {
        debug!(eta = self.hyper.eta, replicas = self.replicas.len(); "reinitializing replicas");

        for network in &mut self.replicas {
            network.fill_weights(&mut RandParamGen::new(&mut self.rng, &self.init));
        }
        self.epoch = 0;
        self.error = 0.;
    }

    fn epoch(&self) -> usize {
        self.epoch
    }

    fn error(&self) -> f32 {
        self.error
    }

    fn replicates(&self) -> usize {
        self.replicas.len()
    }
}
