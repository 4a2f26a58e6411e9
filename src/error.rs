use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, SweepErr>;

/// The sweep engine's error type.
#[derive(Debug)]
pub enum SweepErr {
    InvalidTopology {
        layers: Vec<usize>,
    },
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyRange {
        eta_end: f64,
    },
    InvalidConfig(String),
    JoinTimeout {
        grid_index: usize,
        replicate_index: usize,
    },
    WorkerPanicked {
        grid_index: usize,
        replicate_index: usize,
    },
    GridIndexOutOfRange {
        grid_index: usize,
        grid_size: usize,
    },
    ShutDown,
    Spawn(io::Error),
    Io(io::Error),
    Json(serde_json::Error),
    Rand(String),
}

impl Display for SweepErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepErr::InvalidTopology { layers } => write!(
                f,
                "invalid topology {layers:?}, expected at least 2 layers of non-zero width"
            ),
            SweepErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch on {what}: got length {got}, expected {expected}"
            ),
            SweepErr::EmptyRange { eta_end } => {
                write!(f, "empty learning rate range, eta_end={eta_end}")
            }
            SweepErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            SweepErr::JoinTimeout {
                grid_index,
                replicate_index,
            } => write!(
                f,
                "worker ({grid_index}, {replicate_index}) did not stop within the teardown timeout"
            ),
            SweepErr::WorkerPanicked {
                grid_index,
                replicate_index,
            } => write!(f, "worker ({grid_index}, {replicate_index}) panicked"),
            SweepErr::GridIndexOutOfRange {
                grid_index,
                grid_size,
            } => write!(
                f,
                "grid index {grid_index} out of range for a grid of {grid_size} points"
            ),
            SweepErr::ShutDown => write!(f, "the sweep coordinator has been shut down"),
            SweepErr::Spawn(e) => write!(f, "failed to spawn thread: {e}"),
            SweepErr::Io(e) => write!(f, "io error: {e}"),
            SweepErr::Json(e) => write!(f, "json error: {e}"),
            SweepErr::Rand(msg) => write!(f, "random distribution error: {msg}"),
        }
    }
}

impl Error for SweepErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SweepErr::Spawn(e) | SweepErr::Io(e) => Some(e),
            SweepErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SweepErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SweepErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<rand_distr::uniform::Error> for SweepErr {
    fn from(value: rand_distr::uniform::Error) -> Self {
        Self::Rand(value.to_string())
    }
}
