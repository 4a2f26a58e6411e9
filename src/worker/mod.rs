mod config;
mod event;
mod state;
mod worker;

pub use config::{WorkerConfig, WorkerId};
pub use event::{WorkerEvent, WorkerEventKind};
pub use state::{WorkerSnapshot, WorkerState};
pub use worker::TrainingWorker;
