//! Integer-only BME280 compensation
//!
//! Three chained fixed-point transforms reproduce the vendor's reference
//! algorithm bit for bit. The temperature stage produces the fine temperature
//! (`t_fine`, degrees Celsius x 5120) that both later stages consume, so the
//! stages must run in order on the same sample. [`CompensationEngine::compensate`]
//! enforces that; [`FineTemperature`] can only be obtained from the temperature
//! stage of the current sample.
//!
//! Out-of-spec raw codes never fault: intermediate arithmetic wraps exactly as
//! the two's complement reference does, and only the humidity stage saturates.

use crate::calibration::{CalibrationCoefficients, HumidityTrim, PressureTrim, TemperatureTrim};

/// Upper clamp of the humidity stage: 100 %RH in Q22.10, shifted left by 12.
const HUMIDITY_MAX_Q22_10: i32 = 419_430_400;

/// A reading split into whole units and hundredths.
///
/// Both parts carry the sign of the value (truncating division), so -0.50
/// is `{ integer: 0, fraction: -50 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hundredths {
    pub integer: i32,
    pub fraction: i32,
}

impl Hundredths {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(integer: i32, fraction: i32) -> Self {
        Self { integer, fraction }
    }

    /// Split a value expressed in hundredths.
    pub const fn from_hundredths(total: i32) -> Self {
        Self::new(total / 100, total % 100)
    }

    pub const fn is_negative(&self) -> bool {
        self.integer < 0 || self.fraction < 0
    }

    /// Total value in hundredths.
    pub const fn total(&self) -> i32 {
        self.integer.wrapping_mul(100).wrapping_add(self.fraction)
    }
}

/// Uncompensated ADC codes from one burst read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20-bit pressure code.
    pub pressure: u32,
    /// 20-bit temperature code.
    pub temperature: u32,
    /// 16-bit humidity code.
    pub humidity: u16,
}

impl RawSample {
    /// Decode the 8-byte burst starting at `press_msb` (0xF7).
    ///
    /// Pressure and temperature are big-endian 20-bit values left-aligned in
    /// three bytes; humidity is a plain big-endian 16-bit value.
    pub const fn from_burst(burst: &[u8; 8]) -> Self {
        Self {
            pressure: ((burst[0] as u32) << 12) | ((burst[1] as u32) << 4) | (burst[2] as u32 >> 4),
            temperature: ((burst[3] as u32) << 12)
                | ((burst[4] as u32) << 4)
                | (burst[5] as u32 >> 4),
            humidity: u16::from_be_bytes([burst[6], burst[7]]),
        }
    }
}

/// Fine temperature shared by the pressure and humidity stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FineTemperature(i32);

impl FineTemperature {
    #[cfg(test)]
    pub(crate) const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

/// Temperature stage. Returns degrees Celsius in hundredths and the fine
/// temperature for the later stages.
pub fn compensate_temperature(raw: u32, trim: &TemperatureTrim) -> (Hundredths, FineTemperature) {
    let adc = (raw & 0xF_FFFF) as i32;
    let t1 = trim.t1 as i32;

    let var1 = ((adc >> 3).wrapping_sub(t1 << 1)).wrapping_mul(trim.t2 as i32) >> 11;
    let delta = (adc >> 4) - t1;
    let var2 = ((delta.wrapping_mul(delta) >> 12).wrapping_mul(trim.t3 as i32)) >> 14;

    let fine = var1.wrapping_add(var2);
    let centi_celsius = fine.wrapping_mul(5).wrapping_add(128) >> 8;

    (
        Hundredths::from_hundredths(centi_celsius),
        FineTemperature(fine),
    )
}

/// Pressure in pascals, or `None` when the stage-1 divisor is zero.
///
/// 64-bit variant of the vendor algorithm; the intermediate `p` is Q24.8.
pub fn pressure_pascals(raw: u32, fine: FineTemperature, trim: &PressureTrim) -> Option<i32> {
    let adc = (raw & 0xF_FFFF) as i64;

    let mut var1 = fine.0 as i64 - 128_000;
    let mut var2 = var1.wrapping_mul(var1).wrapping_mul(trim.p6 as i64);
    var2 = var2.wrapping_add(var1.wrapping_mul(trim.p5 as i64) << 17);
    var2 = var2.wrapping_add((trim.p4 as i64) << 35);
    var1 = (var1.wrapping_mul(var1).wrapping_mul(trim.p3 as i64) >> 8)
        .wrapping_add(var1.wrapping_mul(trim.p2 as i64) << 12);
    var1 = ((1_i64 << 47).wrapping_add(var1)).wrapping_mul(trim.p1 as i64) >> 33;

    if var1 == 0 {
        return None;
    }

    let mut p: i64 = 1_048_576 - adc;
    p = ((p << 31).wrapping_sub(var2))
        .wrapping_mul(3125)
        .wrapping_div(var1);
    var1 = (trim.p9 as i64).wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
    var2 = (trim.p8 as i64).wrapping_mul(p) >> 19;
    p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add((trim.p7 as i64) << 4);

    Some((p / 256) as i32)
}

/// Pressure stage. Hectopascals in hundredths with `offset_hpa` subtracted
/// from the integer part; `(0, 0)` when the pressure is undefined.
pub fn compensate_pressure(
    raw: u32,
    fine: FineTemperature,
    trim: &PressureTrim,
    offset_hpa: i32,
) -> Hundredths {
    split_pressure(pressure_pascals(raw, fine, trim), offset_hpa)
}

fn split_pressure(pascals: Option<i32>, offset_hpa: i32) -> Hundredths {
    match pascals {
        Some(pa) => Hundredths::new((pa / 100).wrapping_sub(offset_hpa), pa % 100),
        None => Hundredths::ZERO,
    }
}

/// Relative humidity in Q22.10 %RH, shifted left by 12 and clamped to
/// `[0, 419_430_400]`.
pub fn humidity_q22_10(raw: u16, fine: FineTemperature, trim: &HumidityTrim) -> i32 {
    let adc = raw as i32;
    let h1 = trim.h1 as i32;
    let h2 = trim.h2 as i32;
    let h3 = trim.h3 as i32;
    let h4 = trim.h4 as i32;
    let h5 = trim.h5 as i32;
    let h6 = trim.h6 as i32;

    let x = fine.0.wrapping_sub(76_800);

    let offset = ((adc << 14).wrapping_sub(h4 << 20).wrapping_sub(h5.wrapping_mul(x)))
        .wrapping_add(16_384)
        >> 15;
    let scale = ((((x.wrapping_mul(h6) >> 10)
        .wrapping_mul((x.wrapping_mul(h3) >> 11).wrapping_add(32_768))
        >> 10)
        .wrapping_add(2_097_152))
    .wrapping_mul(h2)
    .wrapping_add(8_192))
        >> 14;

    let mut v = offset.wrapping_mul(scale);
    v = v.wrapping_sub((((v >> 15).wrapping_mul(v >> 15) >> 7).wrapping_mul(h1)) >> 4);

    v.clamp(0, HUMIDITY_MAX_Q22_10)
}

/// Humidity stage. Percent relative humidity in hundredths, always within
/// `[0.00, 100.00]`.
pub fn compensate_humidity(raw: u16, fine: FineTemperature, trim: &HumidityTrim) -> Hundredths {
    // 1024ths of a percent
    let h = humidity_q22_10(raw, fine, trim) >> 12;
    Hundredths::new(h / 1024, (h % 1024) * 100 / 1024)
}

/// Fully compensated result of one reading cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensatedReading {
    /// Degrees Celsius.
    pub temperature: Hundredths,
    /// Hectopascals, offset applied. `(0, 0)` when undefined.
    pub pressure: Hundredths,
    /// Percent relative humidity.
    pub humidity: Hundredths,
    /// `false` when the pressure stage hit a zero divisor.
    pub pressure_defined: bool,
    pub fine_temperature: FineTemperature,
}

/// Owns the calibration for a sensor session and runs the three stages.
#[derive(Debug, Clone)]
pub struct CompensationEngine {
    coefficients: CalibrationCoefficients,
    pressure_offset_hpa: i32,
}

impl CompensationEngine {
    pub const fn new(coefficients: CalibrationCoefficients, pressure_offset_hpa: i32) -> Self {
        Self {
            coefficients,
            pressure_offset_hpa,
        }
    }

    pub const fn coefficients(&self) -> &CalibrationCoefficients {
        &self.coefficients
    }

    pub const fn pressure_offset_hpa(&self) -> i32 {
        self.pressure_offset_hpa
    }

    /// Compensate one raw sample: temperature first, then pressure and
    /// humidity from that sample's fine temperature.
    pub fn compensate(&self, raw: &RawSample) -> CompensatedReading {
        let c = &self.coefficients;

        let (temperature, fine) = compensate_temperature(raw.temperature, &c.temperature);
        let pressure_pa = pressure_pascals(raw.pressure, fine, &c.pressure);
        let pressure = split_pressure(pressure_pa, self.pressure_offset_hpa);
        let humidity = compensate_humidity(raw.humidity, fine, &c.humidity);

        CompensatedReading {
            temperature,
            pressure,
            humidity,
            pressure_defined: pressure_pa.is_some(),
            fine_temperature: fine,
        }
    }
}
