use std::fmt;

use thiserror::Error;

/// Boxed hardware-layer cause carried by pin and sensor failures.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of the matrix a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Row,
    Column,
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinKind::Row => write!(f, "row"),
            PinKind::Column => write!(f, "column"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("accelerometer device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to fetch accelerometer sample: {0}")]
    SampleFetchFailed(#[source] Cause),

    #[error("GPIO of {kind} {index} is not ready")]
    PinNotReady { kind: PinKind, index: usize },

    #[error("failed to configure GPIO of {kind} {index}: {cause}")]
    PinConfigureFailed {
        kind: PinKind,
        index: usize,
        #[source]
        cause: Cause,
    },

    #[error("failed to set GPIO of {kind} {index}: {cause}")]
    PinWriteFailed {
        kind: PinKind,
        index: usize,
        #[source]
        cause: Cause,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
