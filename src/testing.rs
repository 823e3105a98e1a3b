//! Hardware fakes shared by the unit tests.

use crate::accel::{AccelSample, Accelerometer};
use crate::error::{Error, Result};
use crate::gpio::{GpioBackend, Level, PinLine};
use crate::matrix::{DisplayPattern, MatrixConfig, PinSpec};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use thiserror::Error;

/// Reference wiring: active-high rows, active-low columns, one column on controller 1.
pub fn reference_config() -> MatrixConfig {
    MatrixConfig::new(
        [
            PinSpec::active_high(0, 21),
            PinSpec::active_high(0, 22),
            PinSpec::active_high(0, 15),
            PinSpec::active_high(0, 24),
            PinSpec::active_high(0, 19),
        ],
        [
            PinSpec::active_low(0, 28),
            PinSpec::active_low(0, 11),
            PinSpec::active_low(0, 31),
            PinSpec::active_low(1, 5),
            PinSpec::active_low(0, 30),
        ],
    )
    .unwrap()
}

#[derive(Debug, Error)]
#[error("simulated fault on {0}")]
pub struct FakeFault(pub PinLine);

#[derive(Default)]
struct FakeGpioState {
    not_ready: HashSet<PinLine>,
    fail_configure: HashSet<PinLine>,
    fail_write: HashSet<PinLine>,
    levels: HashMap<PinLine, Level>,
    configured: Vec<(PinLine, Level)>,
    writes: Vec<(PinLine, Level)>,
}

/// GPIO fake that records every call. Clones share state, so a test keeps one handle
/// while the driver owns the other.
#[derive(Clone, Default)]
pub struct FakeGpio {
    state: Rc<RefCell<FakeGpioState>>,
}

impl FakeGpio {
    pub fn set_not_ready(&self, line: PinLine) {
        self.state.borrow_mut().not_ready.insert(line);
    }

    pub fn fail_configure(&self, line: PinLine) {
        self.state.borrow_mut().fail_configure.insert(line);
    }

    pub fn fail_write(&self, line: PinLine) {
        self.state.borrow_mut().fail_write.insert(line);
    }

    pub fn configured(&self) -> Vec<(PinLine, Level)> {
        self.state.borrow().configured.clone()
    }

    pub fn writes(&self) -> Vec<(PinLine, Level)> {
        self.state.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    pub fn level(&self, line: PinLine) -> Option<Level> {
        self.state.borrow().levels.get(&line).copied()
    }

    /// Decode the current physical levels back into a logical frame.
    pub fn logical_state(&self, config: &MatrixConfig) -> DisplayPattern {
        let decode = |spec: &PinSpec| self.level(spec.line()) == Some(spec.active().level_for(true));
        let mut pattern = DisplayPattern::OFF;
        for (i, spec) in config.rows().iter().enumerate() {
            pattern.rows[i] = decode(spec);
        }
        for (i, spec) in config.columns().iter().enumerate() {
            pattern.columns[i] = decode(spec);
        }
        pattern
    }
}

impl GpioBackend for FakeGpio {
    type Error = FakeFault;

    fn probe_ready(&mut self, line: PinLine) -> bool {
        !self.state.borrow().not_ready.contains(&line)
    }

    fn configure_output(&mut self, line: PinLine, level: Level) -> std::result::Result<(), FakeFault> {
        let mut state = self.state.borrow_mut();
        if state.fail_configure.contains(&line) {
            return Err(FakeFault(line));
        }
        state.configured.push((line, level));
        state.levels.insert(line, level);
        Ok(())
    }

    fn write(&mut self, line: PinLine, level: Level) -> std::result::Result<(), FakeFault> {
        let mut state = self.state.borrow_mut();
        if state.fail_write.contains(&line) {
            return Err(FakeFault(line));
        }
        state.writes.push((line, level));
        state.levels.insert(line, level);
        Ok(())
    }
}

/// Accelerometer fake replaying a fixed script; `None` entries fail the read.
pub struct ScriptedAccelerometer {
    script: VecDeque<Option<AccelSample>>,
}

impl ScriptedAccelerometer {
    pub fn new(script: impl IntoIterator<Item = Option<AccelSample>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl Accelerometer for ScriptedAccelerometer {
    fn read(&mut self) -> Result<AccelSample> {
        match self.script.pop_front() {
            Some(Some(sample)) => Ok(sample),
            Some(None) => Err(Error::SampleFetchFailed("scripted failure".into())),
            None => Err(Error::DeviceUnavailable("script exhausted".into())),
        }
    }
}
