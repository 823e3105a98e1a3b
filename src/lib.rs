//! Tilt Matrix Controller - reads a 3-axis accelerometer and shows the board's tilt
//! direction on a 5×5 row/column multiplexed LED matrix.
//!
//! The LED matrix is driven through the [`matrix::LedMatrix`] capability table, so the
//! classifier and the poll loop never see pin numbers or polarities.

pub mod accel;
pub mod classifier;
pub mod config;
pub mod daemon;
pub mod error;
pub mod gpio;
pub mod logging;
pub mod matrix;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use accel::{AccelSample, Accelerometer};
pub use classifier::{classify, OrientationCommand};
pub use daemon::{Daemon, PollOutcome};
pub use error::{Error, PinKind, Result};
pub use matrix::{DisplayPattern, LedMatrix, MatrixConfig, MatrixDriver, PinSpec};
