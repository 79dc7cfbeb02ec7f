//! Sensor drivers and their error type

pub mod bme280;

use thiserror_no_std::Error;

use crate::bus::TransportError;
use crate::calibration::CalibrationError;

pub use bme280::Bme280;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{operation} failed: {error}")]
    Transport {
        operation: &'static str,
        error: TransportError,
    },
    #[error("unexpected chip id {found:#04x}, expected {expected:#04x}")]
    UnexpectedChipId { found: u8, expected: u8 },
    #[error("calibration data rejected: {0}")]
    Calibration(CalibrationError),
}

impl From<CalibrationError> for SensorError {
    fn from(value: CalibrationError) -> Self {
        Self::Calibration(value)
    }
}
