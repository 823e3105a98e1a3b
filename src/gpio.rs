use log::debug;
use rppal::gpio::{Gpio, OutputPin, Pin};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Physical electrical level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// One GPIO line: a controller (gpiochip) and a pin offset on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinLine {
    pub controller: u8,
    pub pin: u8,
}

impl PinLine {
    pub const fn new(controller: u8, pin: u8) -> Self {
        Self { controller, pin }
    }
}

impl fmt::Display for PinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}.{}", self.controller, self.pin)
    }
}

/// Single-pin GPIO primitive the matrix driver is written against.
///
/// Every call is synchronous and touches exactly one line. Implementations make no
/// batching promise; ordering and partial-failure policy belong to the caller.
pub trait GpioBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the line exists and can be claimed by this process.
    fn probe_ready(&mut self, line: PinLine) -> bool;

    /// Turn a probed line into an output, starting at `level`.
    fn configure_output(&mut self, line: PinLine, level: Level) -> Result<(), Self::Error>;

    /// Drive an already configured output line.
    fn write(&mut self, line: PinLine, level: Level) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum RppalGpioError {
    #[error(transparent)]
    Gpio(#[from] rppal::gpio::Error),
    #[error("controller {0} is not handled by the rppal backend")]
    UnsupportedController(u8),
    #[error("GPIO {0} has not been probed")]
    NotProbed(u8),
    #[error("GPIO {0} is not configured as an output")]
    NotConfigured(u8),
}

/// Raspberry Pi GPIO through `rppal`. Only controller 0 is addressable.
pub struct RppalGpio {
    gpio: Gpio,
    probed: HashMap<u8, Pin>,
    outputs: HashMap<u8, OutputPin>,
}

impl RppalGpio {
    pub fn new() -> Result<Self, RppalGpioError> {
        let gpio = Gpio::new()?;
        Ok(RppalGpio {
            gpio,
            probed: HashMap::new(),
            outputs: HashMap::new(),
        })
    }

    pub(crate) fn check_controller(line: PinLine) -> Result<(), RppalGpioError> {
        if line.controller == 0 {
            Ok(())
        } else {
            Err(RppalGpioError::UnsupportedController(line.controller))
        }
    }
}

fn to_rppal(level: Level) -> rppal::gpio::Level {
    match level {
        Level::Low => rppal::gpio::Level::Low,
        Level::High => rppal::gpio::Level::High,
    }
}

impl GpioBackend for RppalGpio {
    type Error = RppalGpioError;

    fn probe_ready(&mut self, line: PinLine) -> bool {
        if Self::check_controller(line).is_err() {
            debug!("{} is on an unsupported controller", line);
            return false;
        }
        if self.probed.contains_key(&line.pin) || self.outputs.contains_key(&line.pin) {
            return true;
        }
        match self.gpio.get(line.pin) {
            Ok(pin) => {
                self.probed.insert(line.pin, pin);
                true
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", line, e);
                false
            }
        }
    }

    fn configure_output(&mut self, line: PinLine, level: Level) -> Result<(), Self::Error> {
        Self::check_controller(line)?;
        if let Some(output) = self.outputs.get_mut(&line.pin) {
            output.write(to_rppal(level));
            return Ok(());
        }
        let pin = self
            .probed
            .remove(&line.pin)
            .ok_or(RppalGpioError::NotProbed(line.pin))?;
        let output = match level {
            Level::Low => pin.into_output_low(),
            Level::High => pin.into_output_high(),
        };
        self.outputs.insert(line.pin, output);
        Ok(())
    }

    fn write(&mut self, line: PinLine, level: Level) -> Result<(), Self::Error> {
        Self::check_controller(line)?;
        let output = self
            .outputs
            .get_mut(&line.pin)
            .ok_or(RppalGpioError::NotConfigured(line.pin))?;
        output.write(to_rppal(level));
        Ok(())
    }
}
