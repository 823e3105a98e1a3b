//! Orientation classification.
//!
//! With the LED matrix facing up (the accelerometer sits on the reverse side of the
//! board), turning the board onto a side moves gravity from the Z axis onto X or Y:
//! left is negative X, right positive X, up positive Y, down negative Y.

use crate::accel::AccelSample;
use crate::error::Result;
use crate::matrix::{DisplayPattern, LedMatrix};
use std::fmt;

/// Reference threshold in m/s², roughly one g.
pub const DEFAULT_THRESHOLD: f64 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationCommand {
    LeftTilt,
    RightTilt,
    UpTilt,
    DownTilt,
    Level,
}

impl OrientationCommand {
    /// Frame shown for this command.
    ///
    /// This is the reference table: `apply` must leave the matrix in exactly this frame,
    /// whichever `LedMatrix` implementation carries it out.
    pub const fn pattern(self) -> DisplayPattern {
        match self {
            OrientationCommand::LeftTilt => DisplayPattern::LEFT_COLUMN,
            OrientationCommand::RightTilt => DisplayPattern::RIGHT_COLUMN,
            OrientationCommand::UpTilt => DisplayPattern::TOP_ROW,
            OrientationCommand::DownTilt => DisplayPattern::BOTTOM_ROW,
            OrientationCommand::Level => DisplayPattern::OFF,
        }
    }

    /// Invoke the named matrix operation that shows [`pattern`](Self::pattern).
    pub fn apply(self, matrix: &mut dyn LedMatrix) -> Result<()> {
        match self {
            OrientationCommand::LeftTilt => matrix.set_left_column(),
            OrientationCommand::RightTilt => matrix.set_right_column(),
            OrientationCommand::UpTilt => matrix.set_top_row(),
            OrientationCommand::DownTilt => matrix.set_bottom_row(),
            OrientationCommand::Level => matrix.turn_off(),
        }
    }

    /// Side of the board facing down, if any.
    pub fn side(self) -> Option<&'static str> {
        match self {
            OrientationCommand::LeftTilt => Some("left"),
            OrientationCommand::RightTilt => Some("right"),
            OrientationCommand::UpTilt => Some("up"),
            OrientationCommand::DownTilt => Some("down"),
            OrientationCommand::Level => None,
        }
    }
}

impl fmt::Display for OrientationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side() {
            Some(side) => write!(f, "{} tilt", side),
            None => write!(f, "level"),
        }
    }
}

/// Classify one sample. X is checked before Y, so a reading past the threshold on
/// both axes reports left/right. Z is never looked at.
pub fn classify(sample: AccelSample, threshold: f64) -> OrientationCommand {
    if sample.x < -threshold {
        OrientationCommand::LeftTilt
    } else if sample.x > threshold {
        OrientationCommand::RightTilt
    } else if sample.y > threshold {
        OrientationCommand::UpTilt
    } else if sample.y < -threshold {
        OrientationCommand::DownTilt
    } else {
        OrientationCommand::Level
    }
}
