use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, SweepErr, arch::LayerTopology, dataset::MAX_PARITY_BITS};

/// Learning rates below this are considered "no sweep requested".
pub const MIN_ETA_END: f64 = 1e-5;

/// The widest hidden or output layer a sweep may train.
pub const MAX_LAYER_WIDTH: usize = 1024;

/// Absorbs binary floating point error when counting the steps of a learning rate range.
const GRID_EPSILON: f64 = 1e-9;

/// How the replicates of a grid point are trained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicateMode {
    /// One worker per replicate, each converging on its own.
    #[default]
    Independent,
    /// One worker per grid point training every replicate, converging on the averaged error.
    Averaged,
}

/// The configuration of a learning rate sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub eta_start: f64,
    pub eta_end: f64,
    pub eta_increment: f64,
    pub momentum: f64,
    pub replicate_count: usize,
    pub replicate_mode: ReplicateMode,
    pub stop_threshold: f64,
    pub input_nodes: usize,
    pub output_nodes: usize,
    /// Width of the hidden layer, the input width when absent.
    pub hidden_nodes: Option<usize>,
    pub milestone_interval: usize,
    pub seed: Option<u64>,
    pub join_timeout_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            eta_start: 0.1,
            eta_end: 1.0,
            eta_increment: 0.1,
            momentum: 0.0,
            replicate_count: 1,
            replicate_mode: ReplicateMode::Independent,
            stop_threshold: 0.05,
            input_nodes: 4,
            output_nodes: 1,
            hidden_nodes: None,
            milestone_interval: 1000,
            seed: None,
            join_timeout_ms: 5000,
        }
    }
}

impl SweepConfig {
    /// Parses and validates a configuration from a JSON document, absent keys take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Checks every bound of the configuration except the emptiness of the learning rate
    /// range, which is reported by the coordinator as `EmptyRange`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(SweepErr::InvalidConfig(msg)) };

        if !(self.eta_start > 0.) {
            return invalid(format!("eta_start must be positive, got {}", self.eta_start));
        }
        if !(self.eta_increment > 0.) {
            return invalid(format!(
                "eta_increment must be positive, got {}",
                self.eta_increment
            ));
        }
        if self.eta_end >= MIN_ETA_END && self.eta_end < self.eta_start {
            return invalid(format!(
                "eta_end ({}) is below eta_start ({})",
                self.eta_end, self.eta_start
            ));
        }
        if !(0. ..1.).contains(&self.momentum) {
            return invalid(format!("momentum must be in [0, 1), got {}", self.momentum));
        }
        if self.replicate_count == 0 {
            return invalid("replicate_count must be at least 1".into());
        }
        if !(self.stop_threshold > 0.) {
            return invalid(format!(
                "stop_threshold must be positive, got {}",
                self.stop_threshold
            ));
        }
        if self.input_nodes == 0 || self.output_nodes == 0 || self.hidden_nodes == Some(0) {
            return invalid("layer widths must be positive".into());
        }
        if self.input_nodes > MAX_PARITY_BITS {
            return invalid(format!(
                "input_nodes must be at most {MAX_PARITY_BITS}, got {}",
                self.input_nodes
            ));
        }
        let hidden = self.hidden_nodes.unwrap_or(self.input_nodes);
        if hidden > MAX_LAYER_WIDTH || self.output_nodes > MAX_LAYER_WIDTH {
            return invalid(format!(
                "hidden and output layers must be at most {MAX_LAYER_WIDTH} wide"
            ));
        }
        if self.milestone_interval == 0 {
            return invalid("milestone_interval must be at least 1".into());
        }

        Ok(())
    }

    /// Returns the amount of learning rates in the range.
    ///
    /// # Returns
    /// An `EmptyRange` error when `eta_end` is negligible.
    pub fn grid_size(&self) -> Result<usize> {
        if self.eta_end < MIN_ETA_END {
            return Err(SweepErr::EmptyRange {
                eta_end: self.eta_end,
            });
        }

        let steps = (self.eta_end - self.eta_start) / self.eta_increment + GRID_EPSILON;
        Ok(steps.floor() as usize + 1)
    }

    /// Returns the learning rate of the `i`-th grid point.
    pub fn eta(&self, i: usize) -> f64 {
        self.eta_start + i as f64 * self.eta_increment
    }

    /// Builds the `input-hidden-output` topology every network of the sweep shares.
    pub fn topology(&self) -> Result<LayerTopology> {
        let hidden = self.hidden_nodes.unwrap_or(self.input_nodes);
        LayerTopology::new([self.input_nodes, hidden, self.output_nodes])
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
