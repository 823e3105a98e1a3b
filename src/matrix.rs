//! Row/column multiplexed 5×5 LED matrix.
//!
//! [`MatrixDriver`] owns the ten lines of the matrix and renders [`DisplayPattern`]s onto
//! them. Patterns are expressed in logical terms (true lights the line); each
//! [`PinSpec`] carries its own polarity, so the same pattern works for active-high rows
//! and sunk-current (active-low) columns alike.

use crate::error::{Error, PinKind, Result};
use crate::gpio::{GpioBackend, Level, PinLine};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rows and columns on the matrix.
pub const MATRIX_SIZE: usize = 5;

/// Whether a logical "on" is a high or a low electrical level on a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveLevel {
    High,
    Low,
}

impl ActiveLevel {
    /// Physical level that represents the logical state `on`.
    pub fn level_for(self, on: bool) -> Level {
        match (self, on) {
            (ActiveLevel::High, true) => Level::High,
            (ActiveLevel::High, false) => Level::Low,
            (ActiveLevel::Low, true) => Level::Low,
            (ActiveLevel::Low, false) => Level::High,
        }
    }
}

/// A GPIO line together with its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSpec {
    line: PinLine,
    active: ActiveLevel,
}

impl PinSpec {
    pub const fn new(controller: u8, pin: u8, active: ActiveLevel) -> Self {
        Self {
            line: PinLine::new(controller, pin),
            active,
        }
    }

    pub const fn active_high(controller: u8, pin: u8) -> Self {
        Self::new(controller, pin, ActiveLevel::High)
    }

    pub const fn active_low(controller: u8, pin: u8) -> Self {
        Self::new(controller, pin, ActiveLevel::Low)
    }

    #[inline]
    pub fn line(&self) -> PinLine {
        self.line
    }

    #[inline]
    pub fn active(&self) -> ActiveLevel {
        self.active
    }

    #[inline]
    pub fn inactive_level(&self) -> Level {
        self.active.level_for(false)
    }
}

/// The ten lines of the matrix, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixConfig {
    rows: [PinSpec; MATRIX_SIZE],
    columns: [PinSpec; MATRIX_SIZE],
}

impl MatrixConfig {
    /// Build a configuration, rejecting any line used twice.
    pub fn new(rows: [PinSpec; MATRIX_SIZE], columns: [PinSpec; MATRIX_SIZE]) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in rows.iter().chain(columns.iter()) {
            if !seen.insert(spec.line()) {
                return Err(Error::InvalidConfig(format!(
                    "{} is assigned more than once",
                    spec.line()
                )));
            }
        }
        Ok(MatrixConfig { rows, columns })
    }

    /// Like [`MatrixConfig::new`], for pin lists whose length is only known at runtime.
    pub fn from_slices(rows: &[PinSpec], columns: &[PinSpec]) -> Result<Self> {
        let rows: [PinSpec; MATRIX_SIZE] = rows.try_into().map_err(|_| {
            Error::InvalidConfig(format!(
                "expected {} row pins, got {}",
                MATRIX_SIZE,
                rows.len()
            ))
        })?;
        let columns: [PinSpec; MATRIX_SIZE] = columns.try_into().map_err(|_| {
            Error::InvalidConfig(format!(
                "expected {} column pins, got {}",
                MATRIX_SIZE,
                columns.len()
            ))
        })?;
        Self::new(rows, columns)
    }

    pub fn rows(&self) -> &[PinSpec; MATRIX_SIZE] {
        &self.rows
    }

    pub fn columns(&self) -> &[PinSpec; MATRIX_SIZE] {
        &self.columns
    }

    /// All lines in driving order: rows 0..4, then columns 0..4.
    pub fn pins(&self) -> impl Iterator<Item = (PinKind, usize, &PinSpec)> {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, spec)| (PinKind::Row, i, spec));
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, spec)| (PinKind::Column, i, spec));
        rows.chain(columns)
    }
}

/// One frame: which rows and which columns are logically on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPattern {
    pub rows: [bool; MATRIX_SIZE],
    pub columns: [bool; MATRIX_SIZE],
}

impl DisplayPattern {
    pub const LEFT_COLUMN: DisplayPattern = DisplayPattern::new(
        [true, true, true, true, true],
        [true, false, false, false, false],
    );
    pub const RIGHT_COLUMN: DisplayPattern = DisplayPattern::new(
        [true, true, true, true, true],
        [false, false, false, false, true],
    );
    pub const TOP_ROW: DisplayPattern = DisplayPattern::new(
        [true, false, false, false, false],
        [true, true, true, true, true],
    );
    pub const BOTTOM_ROW: DisplayPattern = DisplayPattern::new(
        [false, false, false, false, true],
        [true, true, true, true, true],
    );
    pub const OFF: DisplayPattern = DisplayPattern::new([false; MATRIX_SIZE], [false; MATRIX_SIZE]);

    pub const fn new(rows: [bool; MATRIX_SIZE], columns: [bool; MATRIX_SIZE]) -> Self {
        Self { rows, columns }
    }

    /// Logical state of every line in driving order.
    pub fn activations(&self) -> impl Iterator<Item = bool> + '_ {
        self.rows.iter().chain(self.columns.iter()).copied()
    }
}

/// Capability table of a tilt indicator display.
///
/// Callers depend on these five operations only. A board with a different layout or
/// polarity scheme supplies its own implementation.
pub trait LedMatrix {
    /// Light the left-most column.
    fn set_left_column(&mut self) -> Result<()>;

    /// Light the right-most column.
    fn set_right_column(&mut self) -> Result<()>;

    /// Light the top row.
    fn set_top_row(&mut self) -> Result<()>;

    /// Light the bottom row.
    fn set_bottom_row(&mut self) -> Result<()>;

    /// Turn every LED off.
    fn turn_off(&mut self) -> Result<()>;
}

/// Matrix driver over a single-pin GPIO backend.
pub struct MatrixDriver<G: GpioBackend> {
    config: MatrixConfig,
    gpio: G,
}

impl<G: GpioBackend> MatrixDriver<G> {
    /// Claim every line and drive it to its inactive level.
    ///
    /// All lines are attempted even after a failure. The error returned is the first one
    /// in driving order, and no driver is handed out unless all ten lines are configured.
    pub fn initialize(config: MatrixConfig, mut gpio: G) -> Result<Self> {
        info!("Initiating LED matrix");

        let mut first_error: Option<Error> = None;
        for (kind, index, spec) in config.pins() {
            debug!("Initiating GPIO {} pin {}", kind, spec.line());

            let failure = if !gpio.probe_ready(spec.line()) {
                error!("GPIO of {} {} is not ready", kind, index);
                Some(Error::PinNotReady { kind, index })
            } else {
                match gpio.configure_output(spec.line(), spec.inactive_level()) {
                    Ok(()) => None,
                    Err(e) => {
                        error!("Failed to configure GPIO of {} {}: {}", kind, index, e);
                        Some(Error::PinConfigureFailed {
                            kind,
                            index,
                            cause: Box::new(e),
                        })
                    }
                }
            };

            if first_error.is_none() {
                first_error = failure;
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(MatrixDriver { config, gpio }),
        }
    }

    /// Write a full frame: rows in index order, then columns in index order.
    ///
    /// Stops at the first failing line. Lines already written keep their new state.
    pub fn render(&mut self, pattern: DisplayPattern) -> Result<()> {
        for ((kind, index, spec), on) in self.config.pins().zip(pattern.activations()) {
            let level = spec.active().level_for(on);
            debug!(
                "Setting {} GPIO pin {} to {} ({})",
                kind,
                spec.line(),
                on,
                level
            );
            if let Err(e) = self.gpio.write(spec.line(), level) {
                error!("Failed to set GPIO of {} {}: {}", kind, index, e);
                return Err(Error::PinWriteFailed {
                    kind,
                    index,
                    cause: Box::new(e),
                });
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }
}

impl<G: GpioBackend> LedMatrix for MatrixDriver<G> {
    fn set_left_column(&mut self) -> Result<()> {
        debug!("Setting the left column LED on");
        self.render(DisplayPattern::LEFT_COLUMN)
    }

    fn set_right_column(&mut self) -> Result<()> {
        debug!("Setting the right column LED on");
        self.render(DisplayPattern::RIGHT_COLUMN)
    }

    fn set_top_row(&mut self) -> Result<()> {
        debug!("Setting the top row LED on");
        self.render(DisplayPattern::TOP_ROW)
    }

    fn set_bottom_row(&mut self) -> Result<()> {
        debug!("Setting the bottom row LED on");
        self.render(DisplayPattern::BOTTOM_ROW)
    }

    fn turn_off(&mut self) -> Result<()> {
        debug!("Turning the LED matrix off");
        self.render(DisplayPattern::OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reference_config, FakeGpio};

    fn driver() -> (MatrixDriver<FakeGpio>, FakeGpio) {
        let gpio = FakeGpio::default();
        let driver = MatrixDriver::initialize(reference_config(), gpio.clone()).unwrap();
        gpio.clear_writes();
        (driver, gpio)
    }

    #[test]
    fn test_level_translation() {
        assert_eq!(ActiveLevel::High.level_for(true), Level::High);
        assert_eq!(ActiveLevel::High.level_for(false), Level::Low);
        assert_eq!(ActiveLevel::Low.level_for(true), Level::Low);
        assert_eq!(ActiveLevel::Low.level_for(false), Level::High);
    }

    #[test]
    fn test_config_rejects_duplicate_line() {
        let rows = [
            PinSpec::active_high(0, 1),
            PinSpec::active_high(0, 2),
            PinSpec::active_high(0, 3),
            PinSpec::active_high(0, 4),
            PinSpec::active_high(0, 5),
        ];
        let columns = [
            PinSpec::active_low(0, 6),
            PinSpec::active_low(0, 7),
            PinSpec::active_low(0, 8),
            PinSpec::active_low(0, 9),
            // Same line as row 0, even with a different polarity.
            PinSpec::active_low(0, 1),
        ];
        assert!(matches!(
            MatrixConfig::new(rows, columns),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_same_pin_on_other_controller_is_distinct() {
        let rows = [
            PinSpec::active_high(0, 1),
            PinSpec::active_high(0, 2),
            PinSpec::active_high(0, 3),
            PinSpec::active_high(0, 4),
            PinSpec::active_high(0, 5),
        ];
        let columns = [
            PinSpec::active_low(1, 1),
            PinSpec::active_low(1, 2),
            PinSpec::active_low(1, 3),
            PinSpec::active_low(1, 4),
            PinSpec::active_low(1, 5),
        ];
        assert!(MatrixConfig::new(rows, columns).is_ok());
    }

    #[test]
    fn test_config_from_slices_checks_counts() {
        let cfg = reference_config();
        assert!(MatrixConfig::from_slices(cfg.rows(), cfg.columns()).is_ok());
        assert!(matches!(
            MatrixConfig::from_slices(&cfg.rows()[..4], cfg.columns()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_initialize_drives_all_lines_inactive() {
        let gpio = FakeGpio::default();
        let config = reference_config();
        MatrixDriver::initialize(config.clone(), gpio.clone()).unwrap();

        let configured = gpio.configured();
        assert_eq!(configured.len(), 10);
        for ((_, _, spec), (line, level)) in config.pins().zip(configured.iter()) {
            assert_eq!(spec.line(), *line);
            assert_eq!(spec.inactive_level(), *level);
        }
        assert_eq!(gpio.logical_state(&config), DisplayPattern::OFF);
    }

    #[test]
    fn test_initialize_reports_lowest_failing_index() {
        let gpio = FakeGpio::default();
        let config = reference_config();
        gpio.set_not_ready(config.columns()[1].line());
        gpio.set_not_ready(config.rows()[3].line());

        let result = MatrixDriver::initialize(config.clone(), gpio.clone());
        assert!(matches!(
            result,
            Err(Error::PinNotReady {
                kind: PinKind::Row,
                index: 3
            })
        ));
        // Every reachable line was still configured.
        assert_eq!(gpio.configured().len(), 8);
    }

    #[test]
    fn test_initialize_configure_failure() {
        let gpio = FakeGpio::default();
        let config = reference_config();
        gpio.fail_configure(config.columns()[4].line());

        let result = MatrixDriver::initialize(config, gpio);
        assert!(matches!(
            result,
            Err(Error::PinConfigureFailed {
                kind: PinKind::Column,
                index: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_render_writes_rows_then_columns() {
        let (mut driver, gpio) = driver();
        driver.render(DisplayPattern::TOP_ROW).unwrap();

        let expected: Vec<PinLine> = reference_config().pins().map(|(_, _, s)| s.line()).collect();
        let written: Vec<PinLine> = gpio.writes().iter().map(|(line, _)| *line).collect();
        assert_eq!(written, expected);
    }

    #[test]
    fn test_render_off_is_idempotent() {
        let (mut driver, gpio) = driver();

        driver.render(DisplayPattern::OFF).unwrap();
        let first = gpio.writes();
        gpio.clear_writes();
        driver.render(DisplayPattern::OFF).unwrap();
        let second = gpio.writes();

        assert_eq!(first, second);
        assert_eq!(gpio.logical_state(driver.config()), DisplayPattern::OFF);
    }

    #[test]
    fn test_polarity_does_not_change_logical_state() {
        let low_columns = reference_config();
        let flipped: Vec<PinSpec> = low_columns
            .columns()
            .iter()
            .map(|s| PinSpec::new(s.line().controller, s.line().pin, ActiveLevel::High))
            .collect();
        let high_columns = MatrixConfig::from_slices(low_columns.rows(), &flipped).unwrap();

        let gpio_low = FakeGpio::default();
        let mut low = MatrixDriver::initialize(low_columns.clone(), gpio_low.clone()).unwrap();
        let gpio_high = FakeGpio::default();
        let mut high = MatrixDriver::initialize(high_columns.clone(), gpio_high.clone()).unwrap();

        low.set_left_column().unwrap();
        high.set_left_column().unwrap();

        let col0 = low_columns.columns()[0].line();
        assert_eq!(gpio_low.level(col0), Some(Level::Low));
        assert_eq!(gpio_high.level(col0), Some(Level::High));

        assert_eq!(gpio_low.logical_state(&low_columns), DisplayPattern::LEFT_COLUMN);
        assert_eq!(gpio_high.logical_state(&high_columns), DisplayPattern::LEFT_COLUMN);
    }

    #[test]
    fn test_render_stops_at_failing_row() {
        let (mut driver, gpio) = driver();
        let config = reference_config();
        gpio.fail_write(config.rows()[2].line());

        let result = driver.set_right_column();
        assert!(matches!(
            result,
            Err(Error::PinWriteFailed {
                kind: PinKind::Row,
                index: 2,
                ..
            })
        ));

        let written: Vec<PinLine> = gpio.writes().iter().map(|(line, _)| *line).collect();
        assert_eq!(written, vec![config.rows()[0].line(), config.rows()[1].line()]);
        assert!(config
            .columns()
            .iter()
            .all(|c| !written.contains(&c.line())));
    }

    #[test]
    fn test_named_operations_match_patterns() {
        let (mut driver, gpio) = driver();
        let config = reference_config();

        let cases: [(fn(&mut MatrixDriver<FakeGpio>) -> Result<()>, DisplayPattern); 5] = [
            (|d| d.set_left_column(), DisplayPattern::LEFT_COLUMN),
            (|d| d.set_right_column(), DisplayPattern::RIGHT_COLUMN),
            (|d| d.set_top_row(), DisplayPattern::TOP_ROW),
            (|d| d.set_bottom_row(), DisplayPattern::BOTTOM_ROW),
            (|d| d.turn_off(), DisplayPattern::OFF),
        ];
        for (op, pattern) in cases {
            op(&mut driver).unwrap();
            assert_eq!(gpio.logical_state(&config), pattern);
        }
    }
}
