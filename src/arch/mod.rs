mod network;
mod sigmoid;
mod topology;

pub use network::{LearningRule, NetworkState, WEIGHT_RANGE};
pub use sigmoid::Sigmoid;
pub use topology::LayerTopology;
