use thiserror_no_std::Error;

use crate::sensors::bme280::SensorSettings;
use crate::sensors::bme280::registers::ADDRESS_SECONDARY;

/// Site-specific offset subtracted from the hPa integer part.
pub const DEFAULT_PRESSURE_OFFSET_HPA: i32 = 200;
/// Ten minutes between readings.
pub const DEFAULT_WAKE_INTERVAL_SECS: u32 = 600;

const SECONDS_PER_DAY: u32 = 86_400;
const MAX_PRESSURE_OFFSET_HPA: i32 = 2_000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("wake interval must be between 1 and 86399 seconds, got {0}")]
    WakeInterval(u32),
    #[error("pressure offset {0} hPa is outside +/-2000 hPa")]
    PressureOffset(i32),
}

/// Deployment configuration of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Subtracted from the integer hPa part of every pressure reading.
    pub pressure_offset_hpa: i32,
    /// Time between wake-ups.
    pub wake_interval_secs: u32,
    /// 7-bit I2C address of the sensor.
    pub sensor_address: u8,
    pub sensor: SensorSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pressure_offset_hpa: DEFAULT_PRESSURE_OFFSET_HPA,
            wake_interval_secs: DEFAULT_WAKE_INTERVAL_SECS,
            sensor_address: ADDRESS_SECONDARY,
            sensor: SensorSettings::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_pressure_offset_hpa(mut self, offset: i32) -> Self {
        self.pressure_offset_hpa = offset;
        self
    }

    pub fn with_wake_interval_secs(mut self, secs: u32) -> Self {
        self.wake_interval_secs = secs;
        self
    }

    pub fn with_sensor_address(mut self, address: u8) -> Self {
        self.sensor_address = address;
        self
    }

    pub fn with_sensor(mut self, settings: SensorSettings) -> Self {
        self.sensor = settings;
        self
    }

    /// Reject values that would leave the device without a future wake-up
    /// or overflow the pressure arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wake_interval_secs == 0 || self.wake_interval_secs >= SECONDS_PER_DAY {
            return Err(ConfigError::WakeInterval(self.wake_interval_secs));
        }
        if !(-MAX_PRESSURE_OFFSET_HPA..=MAX_PRESSURE_OFFSET_HPA).contains(&self.pressure_offset_hpa)
        {
            return Err(ConfigError::PressureOffset(self.pressure_offset_hpa));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MonitorConfig::default();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.wake_interval_secs, 600);
        assert_eq!(config.pressure_offset_hpa, 200);
        assert_eq!(config.sensor_address, 0x77);
    }

    #[test]
    fn test_interval_bounds() {
        let config = MonitorConfig::default();

        assert_eq!(
            config.with_wake_interval_secs(0).validate(),
            Err(ConfigError::WakeInterval(0))
        );
        assert_eq!(
            config.with_wake_interval_secs(86_400).validate(),
            Err(ConfigError::WakeInterval(86_400))
        );
        assert_eq!(config.with_wake_interval_secs(86_399).validate(), Ok(()));
    }

    #[test]
    fn test_pressure_offset_bounds() {
        let config = MonitorConfig::default();

        assert_eq!(config.with_pressure_offset_hpa(-2_000).validate(), Ok(()));
        assert_eq!(
            config.with_pressure_offset_hpa(2_001).validate(),
            Err(ConfigError::PressureOffset(2_001))
        );
    }
}
