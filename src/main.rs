use anyhow::{Context, Result};
use linux_embedded_hal::I2cdev;
use log::{error, info};
use tilt_matrix::accel::{Accelerometer, IioAccelerometer, Lis3dh};
use tilt_matrix::config::{AccelerometerConfig, Config, DEFAULT_CONFIG_PATH};
use tilt_matrix::gpio::RppalGpio;
use tilt_matrix::{logging, Daemon, MatrixDriver};
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = Config::load(&config_path)?;
    logging::init(&config.logging)?;

    info!("Tilt Matrix Controller {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    let accel = open_accelerometer(&config.accelerometer)?;

    let matrix_config = config.matrix.to_matrix_config()?;
    let gpio = RppalGpio::new().context("Failed to open GPIO controller")?;
    let matrix = MatrixDriver::initialize(matrix_config, gpio)
        .context("Failed to initialize the LED matrix")?;

    let mut daemon = Daemon::new(config, accel, Box::new(matrix));

    // Setup signal handling via tokio
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to setup SIGHUP handler")?;

    info!("Daemon started successfully");

    loop {
        tokio::select! {
            _ = daemon.poll() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                match Config::load(&config_path) {
                    Ok(new_config) => {
                        if let Err(e) = daemon.reload_config(new_config) {
                            error!("Configuration rejected: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to reload configuration: {:#}", e),
                }
            }
        }
    }

    if let Err(e) = daemon.shutdown() {
        error!("Failed to turn the LED matrix off: {}", e);
    }

    info!("Tilt Matrix Controller shutdown complete");
    Ok(())
}

fn open_accelerometer(config: &AccelerometerConfig) -> Result<Box<dyn Accelerometer>> {
    match config {
        AccelerometerConfig::Iio {
            device: Some(device),
            ..
        } => {
            let accel = IioAccelerometer::open(device)
                .context(format!("Failed to open IIO accelerometer: {}", device))?;
            Ok(Box::new(accel))
        }
        AccelerometerConfig::Iio {
            device: None,
            search_root,
        } => {
            let accel = IioAccelerometer::discover(search_root)
                .context("No accelerometer device found")?;
            Ok(Box::new(accel))
        }
        AccelerometerConfig::Lis3dh { i2c_bus, address } => {
            let i2c = I2cdev::new(i2c_bus)
                .context(format!("Failed to open I2C bus: {}", i2c_bus))?;
            let accel = Lis3dh::new(i2c, *address)
                .context(format!("LIS3DH not ready at 0x{:02x} on {}", address, i2c_bus))?;
            Ok(Box::new(accel))
        }
    }
}
