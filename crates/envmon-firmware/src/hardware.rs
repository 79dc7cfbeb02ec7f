//! Peripheral bring-up for the envmon board

use esp_hal::Blocking;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{GPIO11, GPIO12, I2C0};
use esp_hal::time::Rate;
use log::info;
use thiserror_no_std::Error;

use envmon_core::bus::I2cRegisterBus;

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("I2C configuration rejected: {0:?}")]
    I2c(esp_hal::i2c::master::ConfigError),
    #[error("SPI configuration rejected: {0:?}")]
    Spi(esp_hal::spi::master::ConfigError),
    #[error("display controller did not initialise")]
    Display,
}

/// Register bus to the BME280 over blocking I2C0.
pub type SensorBus = I2cRegisterBus<I2c<'static, Blocking>>;

/// Create the sensor bus at 400 kHz on SDA = GPIO12, SCL = GPIO11.
pub fn create_sensor_bus(
    i2c0: I2C0<'static>,
    sda: GPIO12<'static>,
    scl: GPIO11<'static>,
    address: u8,
) -> Result<SensorBus, HardwareError> {
    let i2c = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .map_err(HardwareError::I2c)?
    .with_sda(sda)
    .with_scl(scl);

    info!("Sensor bus ready (400 kHz, address {:#04x})", address);
    Ok(I2cRegisterBus::new(i2c, address))
}
