use std::sync::Arc;

use log::debug;
use rand::{Rng, rngs::StdRng, seq::SliceRandom};
use rand_distr::Uniform;

use super::{EpochReport, Hyperparameters, Trainer, abs_error};
use crate::{
    Result,
    arch::{LayerTopology, NetworkState, WEIGHT_RANGE},
    dataset::Dataset,
    initialization::RandParamGen,
};

/// Trains a single network with stochastic backpropagation and momentum.
pub struct NetworkTrainer<R: Rng = StdRng> {
    network: NetworkState,
    dataset: Arc<Dataset>,
    hyper: Hyperparameters,
    init: Uniform<f32>,
    order: Vec<usize>,
    epoch: usize,
    error: f32,
    rng: R,
}

impl<R: Rng> NetworkTrainer<R> {
    /// Creates a new `NetworkTrainer` with freshly randomized weights.
    ///
    /// # Arguments
    /// * `topology` - The widths of the layers of the network.
    /// * `dataset` - The samples to train with.
    /// * `hyper` - The learning rate, momentum and stop threshold.
    /// * `rng` - The random source for the weights and the sample order.
    ///
    /// # Returns
    /// A new `NetworkTrainer` instance or an error if the weight distribution is invalid.
    pub fn new(
        topology: LayerTopology,
        dataset: Arc<Dataset>,
        hyper: Hyperparameters,
        mut rng: R,
    ) -> Result<Self> {
        let init = Uniform::new_inclusive(-WEIGHT_RANGE, WEIGHT_RANGE)?;
        let mut network = NetworkState::new(topology);
        network.fill_weights(&mut RandParamGen::new(&mut rng, &init));

        Ok(Self {
            network,
            order: (0..dataset.len()).collect(),
            dataset,
            hyper,
            init,
            epoch: 0,
            error: 0.,
            rng,
        })
    }

    /// Computes the network's output for `input` without training.
    pub fn evaluate(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.network.forward(input)
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.hyper
    }
}

impl<R: Rng + Send> Trainer for NetworkTrainer<R> {
    fn train_one_epoch(&mut self) -> Result<EpochReport> {
        self.epoch += 1;
        self.order.shuffle(&mut self.rng);

        let rule = self.hyper.rule();
        let mut total = 0.;

        for &i in &self.order {
            let (x, y) = self.dataset.sample(i);
            let output = self.network.forward(x)?;
            total += abs_error(&output, y);
            self.network.backprop(&output, y, rule)?;
        }

        self.error = total / self.order.len() as f32;

        Ok(EpochReport {
            epoch: self.epoch,
            error: self.error,
            converged: self.error < self.hyper.stop_threshold,
        })
    }

    fn reinitialize(&mut self) {
        debug!(eta = self.hyper.eta; "reinitializing network weights");

        self.network
            .fill_weights(&mut RandParamGen::new(&mut self.rng, &self.init));
        self.epoch = 0;
        self.error = 0.;
    }

    fn epoch(&self) -> usize {
        self.epoch
    }

    fn error(&self) -> f32 {
        self.error
    }
}
