//! BME280 register map

/// Primary I2C address (SDO tied to GND).
pub const ADDRESS_PRIMARY: u8 = 0x76;
/// Secondary I2C address (SDO tied to VDDIO).
pub const ADDRESS_SECONDARY: u8 = 0x77;

pub const REG_CHIP_ID: u8 = 0xD0;
pub const REG_RESET: u8 = 0xE0;
pub const REG_CTRL_HUM: u8 = 0xF2;
pub const REG_STATUS: u8 = 0xF3;
pub const REG_CTRL_MEAS: u8 = 0xF4;
pub const REG_CONFIG: u8 = 0xF5;

/// Start of the pressure/temperature/humidity burst (0xF7..=0xFE).
pub const REG_BURST: u8 = 0xF7;
pub const BURST_LEN: usize = 8;

/// Calibration block A: dig_T1..dig_P9, one reserved byte, dig_H1 (0x88..=0xA1).
pub const REG_CALIB_A: u8 = 0x88;
pub const CALIB_A_LEN: usize = 26;

/// Calibration block B: dig_H2..dig_H6 (0xE1..=0xE7).
pub const REG_CALIB_B: u8 = 0xE1;
pub const CALIB_B_LEN: usize = 7;

pub const CHIP_ID: u8 = 0x60;
pub const RESET_COMMAND: u8 = 0xB6;

/// `status.measuring`, set while a conversion is running.
pub const STATUS_MEASURING: u8 = 1 << 3;
