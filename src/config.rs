use crate::accel::{IIO_DEVICES_ROOT, LIS3DH_DEFAULT_ADDRESS};
use crate::classifier::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};
use crate::matrix::{ActiveLevel, MatrixConfig, PinSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tilt-matrix/config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matrix: MatrixSection,
    pub accelerometer: AccelerometerConfig,
    pub classifier: ClassifierConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSection {
    pub rows: Vec<PinEntry>,
    pub columns: Vec<PinEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinEntry {
    #[serde(default)]
    pub controller: u8,
    pub pin: u8,
    pub active: ActiveLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccelerometerConfig {
    /// Kernel IIO device; discovered under `search_root` when `device` is unset.
    Iio {
        #[serde(default)]
        device: Option<String>,
        #[serde(default = "default_iio_root")]
        search_root: String,
    },
    /// LIS3DH on an I²C character device.
    Lis3dh {
        i2c_bus: String,
        #[serde(default = "default_lis3dh_address")]
        address: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// m/s² that an axis must exceed to count as tilted.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Delay after a failed sample read.
    pub retry_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub syslog: bool,
}

fn default_iio_root() -> String {
    IIO_DEVICES_ROOT.to_string()
}

fn default_lis3dh_address() -> u8 {
    LIS3DH_DEFAULT_ADDRESS
}

impl Default for MatrixSection {
    /// Raspberry Pi header wiring (BCM numbers, all on the main controller), leaving the
    /// I²C pins free for the accelerometer.
    fn default() -> Self {
        let row = |pin| PinEntry {
            controller: 0,
            pin,
            active: ActiveLevel::High,
        };
        let col = |pin| PinEntry {
            controller: 0,
            pin,
            active: ActiveLevel::Low,
        };
        Self {
            rows: vec![row(17), row(27), row(22), row(23), row(24)],
            columns: vec![col(5), col(6), col(13), col(19), col(26)],
        }
    }
}

impl Default for AccelerometerConfig {
    fn default() -> Self {
        AccelerometerConfig::Iio {
            device: None,
            search_root: default_iio_root(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            retry_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            syslog: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matrix: MatrixSection::default(),
            accelerometer: AccelerometerConfig::default(),
            classifier: ClassifierConfig::default(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl From<PinEntry> for PinSpec {
    fn from(entry: PinEntry) -> Self {
        PinSpec::new(entry.controller, entry.pin, entry.active)
    }
}

impl MatrixSection {
    pub fn to_matrix_config(&self) -> Result<MatrixConfig> {
        let rows: Vec<PinSpec> = self.rows.iter().copied().map(PinSpec::from).collect();
        let columns: Vec<PinSpec> = self.columns.iter().copied().map(PinSpec::from).collect();
        MatrixConfig::from_slices(&rows, &columns)
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .context(format!("Failed to load configuration from {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.matrix.to_matrix_config()?;
        if !self.classifier.threshold.is_finite() || self.classifier.threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "classifier threshold must be a positive number, got {}",
                self.classifier.threshold
            )));
        }
        if self.polling.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "polling interval must be non-zero".to_string(),
            ));
        }
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "unknown log level {:?}",
                self.logging.level
            )));
        }
        Ok(())
    }
}
