pub mod arch;
pub mod config;
pub mod dataset;
mod error;
pub mod initialization;
pub mod sweep;
pub mod training;
pub mod worker;

pub use config::{ReplicateMode, SweepConfig};
pub use dataset::Dataset;
pub use error::{Result, SweepErr};
pub use sweep::{SweepCoordinator, SweepEvent, SweepPhase};
