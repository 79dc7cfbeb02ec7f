//! Factory trim coefficients
//!
//! The BME280 stores its per-device trim values in two non-volatile register
//! blocks. They are read once at bring-up, decoded here, and then owned by the
//! [`CompensationEngine`](crate::compensation::CompensationEngine) until the
//! sensor is reset and recalibrated.
//!
//! Block A (0x88..=0xA1, 26 bytes):
//!
//! | Offset | Field      | Type |
//! |--------|------------|------|
//! | 0..6   | dig_T1..T3 | u16, i16, i16 (little-endian) |
//! | 6..24  | dig_P1..P9 | u16, then i16 x 8 (little-endian) |
//! | 24     | reserved   | - |
//! | 25     | dig_H1     | u8 |
//!
//! Block B (0xE1..=0xE7, 7 bytes):
//!
//! | Offset | Field  | Layout |
//! |--------|--------|--------|
//! | 0..2   | dig_H2 | i16 little-endian |
//! | 2      | dig_H3 | u8 |
//! | 3, 4   | dig_H4 | byte 3 holds bits 11..4 (signed), low nibble of byte 4 holds bits 3..0 |
//! | 4, 5   | dig_H5 | byte 5 holds bits 11..4 (signed), high nibble of byte 4 holds bits 3..0 |
//! | 6      | dig_H6 | i8 |

use thiserror_no_std::Error;

use crate::sensors::bme280::registers::{CALIB_A_LEN, CALIB_B_LEN};

/// Which calibration block a layout error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationBlock {
    /// Temperature/pressure block plus dig_H1 at 0x88.
    A,
    /// Humidity block at 0xE1.
    B,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration block {block:?} has {actual} bytes, expected {expected}")]
    Layout {
        block: CalibrationBlock,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureTrim {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureTrim {
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumidityTrim {
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    /// 12-bit signed value.
    pub h4: i16,
    /// 12-bit signed value.
    pub h5: i16,
    pub h6: i8,
}

/// All trim coefficients of one sensor. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCoefficients {
    pub temperature: TemperatureTrim,
    pub pressure: PressureTrim,
    pub humidity: HumidityTrim,
}

impl CalibrationCoefficients {
    /// Decode the two raw calibration blocks.
    ///
    /// Fails when either block does not have exactly the documented length,
    /// which is how a truncated or mis-addressed transport read shows up.
    pub fn load(block_a: &[u8], block_b: &[u8]) -> Result<Self, CalibrationError> {
        let a: &[u8; CALIB_A_LEN] =
            block_a
                .try_into()
                .map_err(|_| CalibrationError::Layout {
                    block: CalibrationBlock::A,
                    expected: CALIB_A_LEN,
                    actual: block_a.len(),
                })?;
        let b: &[u8; CALIB_B_LEN] =
            block_b
                .try_into()
                .map_err(|_| CalibrationError::Layout {
                    block: CalibrationBlock::B,
                    expected: CALIB_B_LEN,
                    actual: block_b.len(),
                })?;

        let u16_at = |i: usize| u16::from_le_bytes([a[i], a[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([a[i], a[i + 1]]);

        let temperature = TemperatureTrim {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
        };

        let pressure = PressureTrim {
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
        };

        // dig_H4 and dig_H5 share byte 4: H4 takes its low nibble, H5 its high
        // nibble. The MSB bytes are sign-extended before shifting.
        let humidity = HumidityTrim {
            h1: a[25],
            h2: i16::from_le_bytes([b[0], b[1]]),
            h3: b[2],
            h4: ((b[3] as i8 as i16) << 4) | (b[4] & 0x0F) as i16,
            h5: ((b[5] as i8 as i16) << 4) | (b[4] >> 4) as i16,
            h6: b[6] as i8,
        };

        Ok(Self {
            temperature,
            pressure,
            humidity,
        })
    }
}

/// Reference coefficients shared by the unit tests of several modules.
///
/// Temperature and pressure are the worked example from the Bosch datasheet;
/// the humidity set is a typical production part.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) const REFERENCE_TEMPERATURE: TemperatureTrim = TemperatureTrim {
        t1: 27504,
        t2: 26435,
        t3: -1000,
    };

    pub(crate) const REFERENCE_PRESSURE: PressureTrim = PressureTrim {
        p1: 36477,
        p2: -10685,
        p3: 3024,
        p4: 2855,
        p5: 140,
        p6: -7,
        p7: 15500,
        p8: -14600,
        p9: 6000,
    };

    pub(crate) const REFERENCE_HUMIDITY: HumidityTrim = HumidityTrim {
        h1: 75,
        h2: 362,
        h3: 0,
        h4: 313,
        h5: 50,
        h6: 30,
    };

    pub(crate) const fn reference() -> CalibrationCoefficients {
        CalibrationCoefficients {
            temperature: REFERENCE_TEMPERATURE,
            pressure: REFERENCE_PRESSURE,
            humidity: REFERENCE_HUMIDITY,
        }
    }

    /// Block A encoding of [`reference`].
    pub(crate) fn reference_block_a() -> [u8; CALIB_A_LEN] {
        let t = REFERENCE_TEMPERATURE;
        let p = REFERENCE_PRESSURE;
        let words: [[u8; 2]; 12] = [
            t.t1.to_le_bytes(),
            t.t2.to_le_bytes(),
            t.t3.to_le_bytes(),
            p.p1.to_le_bytes(),
            p.p2.to_le_bytes(),
            p.p3.to_le_bytes(),
            p.p4.to_le_bytes(),
            p.p5.to_le_bytes(),
            p.p6.to_le_bytes(),
            p.p7.to_le_bytes(),
            p.p8.to_le_bytes(),
            p.p9.to_le_bytes(),
        ];

        let mut block = [0u8; CALIB_A_LEN];
        for (i, word) in words.iter().enumerate() {
            block[i * 2..i * 2 + 2].copy_from_slice(word);
        }
        block[25] = REFERENCE_HUMIDITY.h1;
        block
    }

    /// Block B encoding of [`reference`]: H4 = 0x139, H5 = 0x032.
    pub(crate) const REFERENCE_BLOCK_B: [u8; CALIB_B_LEN] =
        [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];
}
