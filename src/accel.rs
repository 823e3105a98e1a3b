//! Accelerometer sources.
//!
//! Two backends are provided: the Linux IIO subsystem through sysfs, and a LIS3DH talked
//! to directly over I²C. Both report m/s².

use crate::error::{Error, Result};
use embedded_hal::i2c::{Error as _, I2c};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Standard gravity, m/s².
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Default sysfs root searched for IIO devices.
pub const IIO_DEVICES_ROOT: &str = "/sys/bus/iio/devices";

/// One 3-axis acceleration reading in m/s².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// On-demand sample source.
pub trait Accelerometer {
    /// Fetch a fresh sample.
    fn read(&mut self) -> Result<AccelSample>;
}

impl<A: Accelerometer + ?Sized> Accelerometer for Box<A> {
    fn read(&mut self) -> Result<AccelSample> {
        (**self).read()
    }
}

/// Accelerometer exposed by a kernel IIO driver.
///
/// Reads `in_accel_{x,y,z}_raw` and converts with the axis (or shared) `scale` and
/// optional `offset` attributes: `value = (raw + offset) * scale`.
#[derive(Debug)]
pub struct IioAccelerometer {
    dir: PathBuf,
}

impl IioAccelerometer {
    /// Open a specific `iio:deviceN` directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !has_accel_channels(&dir) {
            return Err(Error::DeviceUnavailable(format!(
                "{} does not expose accelerometer channels",
                dir.display()
            )));
        }
        let name = fs::read_to_string(dir.join("name")).unwrap_or_default();
        info!(
            "Using IIO accelerometer {} ({})",
            dir.display(),
            name.trim()
        );
        Ok(IioAccelerometer { dir })
    }

    /// Pick the first IIO device under `root` that has accelerometer channels.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let entries = fs::read_dir(root).map_err(|e| {
            Error::DeviceUnavailable(format!("cannot list {}: {}", root.display(), e))
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("iio:device"))
            })
            .filter(|path| has_accel_channels(path))
            .collect();
        candidates.sort();

        match candidates.into_iter().next() {
            Some(dir) => Self::open(dir),
            None => Err(Error::DeviceUnavailable(format!(
                "no accelerometer found under {}",
                root.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn read_axis(&self, axis: char) -> Result<f64> {
        let raw = read_number(&self.dir.join(format!("in_accel_{}_raw", axis)))?;
        let scale = self.read_attribute(axis, "scale")?.unwrap_or(1.0);
        let offset = self.read_attribute(axis, "offset")?.unwrap_or(0.0);
        Ok((raw + offset) * scale)
    }

    /// Per-axis attribute, falling back to the shared one only when the axis has none.
    fn read_attribute(&self, axis: char, suffix: &str) -> Result<Option<f64>> {
        match self.read_optional(&format!("in_accel_{}_{}", axis, suffix))? {
            Some(value) => Ok(Some(value)),
            None => self.read_optional(&format!("in_accel_{}", suffix)),
        }
    }

    fn read_optional(&self, attribute: &str) -> Result<Option<f64>> {
        let path = self.dir.join(attribute);
        if path.exists() {
            read_number(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

fn has_accel_channels(dir: &Path) -> bool {
    ["x", "y", "z"]
        .iter()
        .all(|axis| dir.join(format!("in_accel_{}_raw", axis)).is_file())
}

fn read_number(path: &Path) -> Result<f64> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::SampleFetchFailed(format!("{}: {}", path.display(), e).into()))?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| Error::SampleFetchFailed(format!("{}: {}", path.display(), e).into()))
}

impl Accelerometer for IioAccelerometer {
    fn read(&mut self) -> Result<AccelSample> {
        if !self.dir.is_dir() {
            return Err(Error::DeviceUnavailable(format!(
                "{} disappeared",
                self.dir.display()
            )));
        }
        let sample = AccelSample::new(
            self.read_axis('x')?,
            self.read_axis('y')?,
            self.read_axis('z')?,
        );
        debug!(
            "Accelerometer values: x={:.3} y={:.3} z={:.3}",
            sample.x, sample.y, sample.z
        );
        Ok(sample)
    }
}

/// Default 7-bit address of a LIS3DH with SA0 low.
pub const LIS3DH_DEFAULT_ADDRESS: u8 = 0x18;

const LIS3DH_WHO_AM_I: u8 = 0x0F;
const LIS3DH_DEVICE_ID: u8 = 0x33;
const LIS3DH_CTRL_REG1: u8 = 0x20;
const LIS3DH_CTRL_REG4: u8 = 0x23;
const LIS3DH_OUT_X_L: u8 = 0x28;
/// Sub-address auto-increment for multi-byte reads.
const LIS3DH_AUTO_INCREMENT: u8 = 0x80;
/// 100 Hz, normal power, X/Y/Z enabled.
const LIS3DH_CTRL_REG1_100HZ_XYZ: u8 = 0x57;
/// Block data update, ±2 g, high resolution.
const LIS3DH_CTRL_REG4_BDU_2G_HR: u8 = 0x88;
/// 1 mg per digit in 12-bit high-resolution mode at ±2 g.
const LIS3DH_G_PER_DIGIT: f64 = 0.001;

#[derive(Debug, thiserror::Error)]
#[error("I2C transfer failed: {0:?}")]
pub struct I2cFault(pub embedded_hal::i2c::ErrorKind);

/// LIS3DH on any `embedded-hal` I²C bus, e.g. `linux_embedded_hal::I2cdev`.
pub struct Lis3dh<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Lis3dh<I2C> {
    /// Verify the device identity and start continuous ±2 g sampling.
    pub fn new(i2c: I2C, address: u8) -> Result<Self> {
        let mut dev = Lis3dh { i2c, address };

        let id = dev.read_register(LIS3DH_WHO_AM_I).map_err(|e| {
            Error::DeviceUnavailable(format!("no response at 0x{:02x}: {}", address, e))
        })?;
        if id != LIS3DH_DEVICE_ID {
            return Err(Error::DeviceUnavailable(format!(
                "unexpected WHO_AM_I 0x{:02x} at 0x{:02x}",
                id, address
            )));
        }

        dev.write_register(LIS3DH_CTRL_REG1, LIS3DH_CTRL_REG1_100HZ_XYZ)
            .and_then(|_| dev.write_register(LIS3DH_CTRL_REG4, LIS3DH_CTRL_REG4_BDU_2G_HR))
            .map_err(|e| Error::DeviceUnavailable(format!("configuration failed: {}", e)))?;

        info!("LIS3DH initialized at 0x{:02x}", address);
        Ok(dev)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_register(&mut self, register: u8) -> std::result::Result<u8, I2cFault> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| I2cFault(e.kind()))?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> std::result::Result<(), I2cFault> {
        debug!("Writing LIS3DH register 0x{:02x} = 0x{:02x}", register, value);
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| I2cFault(e.kind()))
    }
}

/// Convert one left-justified 12-bit output register pair to m/s².
fn lis3dh_to_ms2(lo: u8, hi: u8) -> f64 {
    let counts = i16::from_le_bytes([lo, hi]) >> 4;
    f64::from(counts) * LIS3DH_G_PER_DIGIT * STANDARD_GRAVITY
}

impl<I2C: I2c> Accelerometer for Lis3dh<I2C> {
    fn read(&mut self) -> Result<AccelSample> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(
                self.address,
                &[LIS3DH_OUT_X_L | LIS3DH_AUTO_INCREMENT],
                &mut buf,
            )
            .map_err(|e| Error::SampleFetchFailed(Box::new(I2cFault(e.kind()))))?;

        let sample = AccelSample::new(
            lis3dh_to_ms2(buf[0], buf[1]),
            lis3dh_to_ms2(buf[2], buf[3]),
            lis3dh_to_ms2(buf[4], buf[5]),
        );
        debug!(
            "Accelerometer values: x={:.3} y={:.3} z={:.3}",
            sample.x, sample.y, sample.z
        );
        Ok(sample)
    }
}
