mod coordinator;
mod event;
pub mod policy;
mod record;
pub mod stats;

pub use coordinator::{SweepCoordinator, SweepPhase};
pub use event::SweepEvent;
pub use record::{AggregateRecord, CurvePoint, FinalOutcome, GridPoint};
pub use stats::{GridStatistics, Moments};
