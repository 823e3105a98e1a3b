use crate::accel::Accelerometer;
use crate::classifier::{classify, OrientationCommand};
use crate::config::Config;
use crate::error::Result;
use crate::matrix::LedMatrix;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// What one poll iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The command was classified and rendered.
    Displayed(OrientationCommand),
    /// No sample could be read; nothing was rendered.
    SampleSkipped,
    /// The command was classified but writing the matrix failed.
    RenderFailed(OrientationCommand),
}

/// Owns the sensor and the display and runs the sample → classify → render loop.
pub struct Daemon {
    accel: Box<dyn Accelerometer>,
    matrix: Box<dyn LedMatrix>,
    config: Config,
    next_poll: Instant,
}

impl Daemon {
    pub fn new(config: Config, accel: Box<dyn Accelerometer>, matrix: Box<dyn LedMatrix>) -> Self {
        info!("Tilt threshold: {} m/s²", config.classifier.threshold);
        info!(
            "Polling interval: {}ms (retry after {}ms)",
            config.polling.interval_ms, config.polling.retry_ms
        );
        Daemon {
            accel,
            matrix,
            config,
            next_poll: Instant::now(),
        }
    }

    /// One iteration without the trailing sleep.
    pub fn step(&mut self) -> PollOutcome {
        let sample = match self.accel.read() {
            Ok(sample) => sample,
            Err(e) => {
                error!(
                    "Failed to get accelerometer values: {}, retrying in {} ms",
                    e, self.config.polling.retry_ms
                );
                return PollOutcome::SampleSkipped;
            }
        };

        let command = classify(sample, self.config.classifier.threshold);
        match command.side() {
            Some(side) => info!("The board was turned on its {} side", side),
            None => debug!("The board is level"),
        }

        match command.apply(self.matrix.as_mut()) {
            Ok(()) => PollOutcome::Displayed(command),
            Err(e) => {
                warn!("Failed to display {}: {}", command, e);
                PollOutcome::RenderFailed(command)
            }
        }
    }

    /// Delay before the next iteration.
    pub fn delay_after(&self, outcome: PollOutcome) -> Duration {
        match outcome {
            PollOutcome::SampleSkipped => Duration::from_millis(self.config.polling.retry_ms),
            PollOutcome::Displayed(_) | PollOutcome::RenderFailed(_) => {
                Duration::from_millis(self.config.polling.interval_ms)
            }
        }
    }

    /// Wait for the next deadline, then run one iteration and schedule the one after.
    ///
    /// The deadline lives on the daemon, so dropping this future part-way (another
    /// `select!` branch firing) does not shorten or restart the wait.
    pub async fn poll(&mut self) -> PollOutcome {
        sleep_until(self.next_poll).await;
        let outcome = self.step();
        self.next_poll = Instant::now() + self.delay_after(outcome);
        outcome
    }

    /// Apply a new configuration. Only the classifier and polling sections can change
    /// while running; hardware sections need a restart.
    pub fn reload_config(&mut self, new_config: Config) -> Result<()> {
        new_config.validate()?;
        if new_config.matrix != self.config.matrix {
            warn!("Matrix pin changes take effect after a restart");
        }
        if new_config.accelerometer != self.config.accelerometer {
            warn!("Accelerometer changes take effect after a restart");
        }
        if new_config.logging != self.config.logging {
            warn!("Logging changes take effect after a restart");
        }

        self.config.classifier = new_config.classifier;
        self.config.polling = new_config.polling;
        info!(
            "Tilt threshold: {} m/s², polling interval: {}ms",
            self.config.classifier.threshold, self.config.polling.interval_ms
        );
        Ok(())
    }

    /// Blank the display before exit.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Turning the LED matrix off");
        self.matrix.turn_off()
    }
}
