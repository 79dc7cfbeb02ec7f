//! Register-level BME280 driver
//!
//! Thin synchronous wrapper over a [`RegisterBus`]: identity, reset,
//! configuration, calibration readout and the measurement burst. All numeric
//! work lives in [`crate::compensation`].

pub mod registers;
pub mod settings;

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::bus::RegisterBus;
use crate::calibration::CalibrationCoefficients;
use crate::compensation::RawSample;
use crate::sensors::SensorError;

use registers::*;
pub use settings::{IirFilter, Oversampling, SensorMode, SensorSettings, StandbyTime};

/// Settle time after a soft reset before the NVM copy is guaranteed complete.
const RESET_SETTLE_MS: u32 = 100;

pub struct Bme280<B, D> {
    bus: B,
    delay: D,
    settings: SensorSettings,
    /// Normal mode was just entered; the data registers still hold reset values.
    awaiting_first_conversion: bool,
}

impl<B: RegisterBus, D: DelayNs> Bme280<B, D> {
    pub fn new(bus: B, delay: D, settings: SensorSettings) -> Self {
        Self {
            bus,
            delay,
            settings,
            awaiting_first_conversion: false,
        }
    }

    pub const fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Read the identity register. Checking it against [`CHIP_ID`] is up to
    /// the caller.
    pub fn chip_id(&mut self) -> Result<u8, SensorError> {
        let mut id = [0u8; 1];
        self.read(REG_CHIP_ID, &mut id, "read chip id")?;
        Ok(id[0])
    }

    /// Reset the sensor and wait for it to reload its NVM.
    pub fn soft_reset(&mut self) -> Result<(), SensorError> {
        self.write(REG_RESET, RESET_COMMAND, "soft reset")?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        debug!("BME280: soft reset complete");
        Ok(())
    }

    /// Write the measurement settings.
    ///
    /// `ctrl_hum` only latches on the following `ctrl_meas` write, so the
    /// order here is fixed.
    pub fn configure(&mut self) -> Result<(), SensorError> {
        let s = self.settings;
        self.write(REG_CTRL_HUM, s.ctrl_hum(), "write ctrl_hum")?;
        self.write(REG_CONFIG, s.config(), "write config")?;
        self.write(REG_CTRL_MEAS, s.ctrl_meas(), "write ctrl_meas")?;
        self.awaiting_first_conversion = s.mode == SensorMode::Normal;

        info!(
            "BME280: configured ctrl_hum={:#04x} config={:#04x} ctrl_meas={:#04x}",
            s.ctrl_hum(),
            s.config(),
            s.ctrl_meas()
        );
        Ok(())
    }

    /// Read and decode both calibration blocks.
    pub fn read_calibration(&mut self) -> Result<CalibrationCoefficients, SensorError> {
        let mut block_a = [0u8; CALIB_A_LEN];
        let mut block_b = [0u8; CALIB_B_LEN];
        self.read(REG_CALIB_A, &mut block_a, "read calibration block A")?;
        self.read(REG_CALIB_B, &mut block_b, "read calibration block B")?;

        let coefficients = CalibrationCoefficients::load(&block_a, &block_b)?;
        debug!("BME280: calibration {:?}", coefficients);
        Ok(coefficients)
    }

    /// `true` while a conversion is running.
    pub fn is_measuring(&mut self) -> Result<bool, SensorError> {
        let mut status = [0u8; 1];
        self.read(REG_STATUS, &mut status, "read status")?;
        Ok(status[0] & STATUS_MEASURING != 0)
    }

    /// Read one raw sample.
    ///
    /// In forced mode this starts a conversion and waits out the worst-case
    /// conversion time first. In normal mode it returns the latest completed
    /// conversion, waiting only for the first one after [`Self::configure`].
    pub fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        match self.settings.mode {
            SensorMode::Forced => {
                self.write(REG_CTRL_MEAS, self.settings.ctrl_meas(), "start forced conversion")?;
                self.delay.delay_ms(self.settings.max_measurement_time_ms());
                if self.is_measuring()? {
                    debug!("BME280: conversion still running after worst-case wait");
                }
            }
            SensorMode::Normal if self.awaiting_first_conversion => {
                self.delay.delay_ms(self.settings.max_measurement_time_ms());
                self.awaiting_first_conversion = false;
            }
            _ => {}
        }

        let mut burst = [0u8; BURST_LEN];
        self.read(REG_BURST, &mut burst, "read measurement burst")?;
        Ok(RawSample::from_burst(&burst))
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus and delay back.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn read(
        &mut self,
        register: u8,
        buf: &mut [u8],
        operation: &'static str,
    ) -> Result<(), SensorError> {
        self.bus
            .read_registers(register, buf)
            .map_err(|error| SensorError::Transport { operation, error })
    }

    fn write(
        &mut self,
        register: u8,
        value: u8,
        operation: &'static str,
    ) -> Result<(), SensorError> {
        self.bus
            .write_register(register, value)
            .map_err(|error| SensorError::Transport { operation, error })
    }
}

/// In-memory BME280 register map and delay used by unit tests.
#[cfg(test)]
pub(crate) mod fake {
    extern crate std;

    use std::vec::Vec;

    use embedded_hal::delay::DelayNs;
    use embedded_hal::i2c::ErrorKind;

    use super::registers::*;
    use crate::bus::{RegisterBus, TransportError};
    use crate::calibration::fixtures::{REFERENCE_BLOCK_B, reference_block_a};

    pub(crate) struct FakeBme280 {
        pub(crate) registers: [u8; 256],
        pub(crate) writes: Vec<(u8, u8)>,
        /// Reads starting at this register fail.
        pub(crate) failing_register: Option<u8>,
        /// Writes to this register fail.
        pub(crate) failing_write: Option<u8>,
        pub(crate) resets: usize,
    }

    impl FakeBme280 {
        /// A part with the reference calibration and a reference sample
        /// (415148 / 519888 / 30000) waiting in the burst registers.
        pub(crate) fn reference() -> Self {
            let mut registers = [0u8; 256];
            registers[REG_CHIP_ID as usize] = CHIP_ID;
            let a = REG_CALIB_A as usize;
            registers[a..a + CALIB_A_LEN].copy_from_slice(&reference_block_a());
            let b = REG_CALIB_B as usize;
            registers[b..b + CALIB_B_LEN].copy_from_slice(&REFERENCE_BLOCK_B);

            let mut fake = Self {
                registers,
                writes: Vec::new(),
                failing_register: None,
                failing_write: None,
                resets: 0,
            };
            fake.set_burst([0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30]);
            fake
        }

        pub(crate) fn set_burst(&mut self, burst: [u8; BURST_LEN]) {
            let start = REG_BURST as usize;
            self.registers[start..start + BURST_LEN].copy_from_slice(&burst);
        }
    }

    impl RegisterBus for FakeBme280 {
        fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), TransportError> {
            if self.failing_register == Some(register) {
                return Err(TransportError::Bus {
                    register,
                    kind: ErrorKind::Other,
                });
            }
            let start = register as usize;
            buf.copy_from_slice(&self.registers[start..start + buf.len()]);
            Ok(())
        }

        fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
            if self.failing_write == Some(register) {
                return Err(TransportError::Bus {
                    register,
                    kind: ErrorKind::Other,
                });
            }
            self.writes.push((register, value));
            if register == REG_RESET && value == RESET_COMMAND {
                self.resets += 1;
            } else {
                self.registers[register as usize] = value;
            }
            Ok(())
        }
    }

    /// Accumulates requested delay instead of sleeping.
    #[derive(Default)]
    pub(crate) struct FakeDelay {
        pub(crate) total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeBme280, FakeDelay};
    use super::*;
    use crate::calibration::fixtures::reference;
    use crate::compensation::RawSample;

    fn sensor(settings: SensorSettings) -> Bme280<FakeBme280, FakeDelay> {
        Bme280::new(FakeBme280::reference(), FakeDelay::default(), settings)
    }

    #[test]
    fn test_chip_id() {
        assert_eq!(sensor(SensorSettings::default()).chip_id().unwrap(), CHIP_ID);
    }

    #[test]
    fn test_soft_reset_waits_for_settle() {
        let mut bme = sensor(SensorSettings::default());
        bme.soft_reset().unwrap();

        let (bus, delay) = bme.release();
        assert_eq!(bus.resets, 1);
        assert_eq!(delay.total_ns, 100_000_000);
    }

    #[test]
    fn test_configure_writes_ctrl_meas_last() {
        let mut bme = sensor(SensorSettings::default());
        bme.configure().unwrap();

        let (bus, _) = bme.release();
        assert_eq!(
            bus.writes,
            [(REG_CTRL_HUM, 0x03), (REG_CONFIG, 0x10), (REG_CTRL_MEAS, 0x57)]
        );
    }

    #[test]
    fn test_read_calibration() {
        let mut bme = sensor(SensorSettings::default());

        assert_eq!(bme.read_calibration().unwrap(), reference());
    }

    #[test]
    fn test_read_calibration_transport_failure() {
        let mut fake = FakeBme280::reference();
        fake.failing_register = Some(REG_CALIB_B);
        let mut bme = Bme280::new(fake, FakeDelay::default(), SensorSettings::default());

        assert!(matches!(
            bme.read_calibration(),
            Err(SensorError::Transport {
                operation: "read calibration block B",
                ..
            })
        ));
    }

    #[test]
    fn test_read_raw_normal_mode_does_not_trigger() {
        let mut bme = sensor(SensorSettings::default());
        let raw = bme.read_raw().unwrap();

        assert_eq!(
            raw,
            RawSample {
                pressure: 415_148,
                temperature: 519_888,
                humidity: 30_000,
            }
        );
        let (bus, delay) = bme.release();
        assert!(bus.writes.is_empty());
        assert_eq!(delay.total_ns, 0);
    }

    #[test]
    fn test_read_raw_waits_for_first_normal_mode_conversion() {
        let mut bme = sensor(SensorSettings::default());
        bme.configure().unwrap();
        bme.read_raw().unwrap();
        bme.read_raw().unwrap();

        let (_, delay) = bme.release();
        assert_eq!(delay.total_ns, 53_000_000);
    }

    #[test]
    fn test_read_raw_forced_mode_triggers_and_waits() {
        let settings = SensorSettings {
            mode: SensorMode::Forced,
            ..SensorSettings::default()
        };
        let mut bme = sensor(settings);
        bme.read_raw().unwrap();

        let (bus, delay) = bme.release();
        assert_eq!(bus.writes, [(REG_CTRL_MEAS, settings.ctrl_meas())]);
        assert_eq!(delay.total_ns, 53_000_000);
    }
}
