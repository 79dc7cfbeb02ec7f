//! Measurement settings and their register encodings

/// Oversampling ratio for one measurement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// Channel disabled; its burst bytes read back as 0x80000 / 0x8000.
    Skipped,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    /// Three-bit `osrs_x` field value.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Skipped => 0b000,
            Self::X1 => 0b001,
            Self::X2 => 0b010,
            Self::X4 => 0b011,
            Self::X8 => 0b100,
            Self::X16 => 0b101,
        }
    }

    /// Number of conversions averaged per measurement.
    pub const fn factor(self) -> u32 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// IIR filter coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IirFilter {
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl IirFilter {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Off => 0b000,
            Self::X2 => 0b001,
            Self::X4 => 0b010,
            Self::X8 => 0b011,
            Self::X16 => 0b100,
        }
    }
}

/// Inactive time between conversions in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyTime {
    Ms0_5,
    Ms62_5,
    Ms125,
    Ms250,
    Ms500,
    Ms1000,
    Ms10,
    Ms20,
}

impl StandbyTime {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Ms0_5 => 0b000,
            Self::Ms62_5 => 0b001,
            Self::Ms125 => 0b010,
            Self::Ms250 => 0b011,
            Self::Ms500 => 0b100,
            Self::Ms1000 => 0b101,
            Self::Ms10 => 0b110,
            Self::Ms20 => 0b111,
        }
    }
}

/// Sensor power mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    Sleep,
    /// One conversion per `ctrl_meas` write, then back to sleep.
    Forced,
    /// Continuous conversions separated by the standby time.
    Normal,
}

impl SensorMode {
    pub const fn bits(self) -> u8 {
        match self {
            Self::Sleep => 0b00,
            Self::Forced => 0b01,
            Self::Normal => 0b11,
        }
    }
}

/// Full measurement configuration written during bring-up.
///
/// The default is the datasheet "indoor navigation" profile: humidity x4,
/// temperature x2, pressure x16, IIR filter 16, 0.5 ms standby, normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSettings {
    pub humidity_oversampling: Oversampling,
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub filter: IirFilter,
    pub standby: StandbyTime,
    pub mode: SensorMode,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            humidity_oversampling: Oversampling::X4,
            temperature_oversampling: Oversampling::X2,
            pressure_oversampling: Oversampling::X16,
            filter: IirFilter::X16,
            standby: StandbyTime::Ms0_5,
            mode: SensorMode::Normal,
        }
    }
}

impl SensorSettings {
    /// Value for `ctrl_hum` (0xF2).
    pub const fn ctrl_hum(&self) -> u8 {
        self.humidity_oversampling.bits()
    }

    /// Value for `ctrl_meas` (0xF4).
    pub const fn ctrl_meas(&self) -> u8 {
        (self.temperature_oversampling.bits() << 5)
            | (self.pressure_oversampling.bits() << 2)
            | self.mode.bits()
    }

    /// Value for `config` (0xF5). SPI 3-wire mode is never enabled.
    pub const fn config(&self) -> u8 {
        (self.standby.bits() << 5) | (self.filter.bits() << 2)
    }

    /// Worst-case conversion time in whole milliseconds (datasheet appendix B).
    pub const fn max_measurement_time_ms(&self) -> u32 {
        // Computed in microseconds to stay in integers.
        let t = self.temperature_oversampling.factor();
        let p = self.pressure_oversampling.factor();
        let h = self.humidity_oversampling.factor();

        let mut us = 1250 + 2300 * t;
        if p > 0 {
            us += 2300 * p + 575;
        }
        if h > 0 {
            us += 2300 * h + 575;
        }
        us.div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_indoor_navigation_registers() {
        let settings = SensorSettings::default();

        assert_eq!(settings.ctrl_hum(), 0x03);
        assert_eq!(settings.ctrl_meas(), 0x57);
        assert_eq!(settings.config(), 0x10);
    }

    #[test]
    fn test_forced_mode_encoding() {
        let settings = SensorSettings {
            humidity_oversampling: Oversampling::X1,
            temperature_oversampling: Oversampling::X1,
            pressure_oversampling: Oversampling::X1,
            filter: IirFilter::Off,
            standby: StandbyTime::Ms1000,
            mode: SensorMode::Forced,
        };

        assert_eq!(settings.ctrl_meas(), 0b001_001_01);
        assert_eq!(settings.config(), 0b101_000_00);
    }

    #[test]
    fn test_max_measurement_time() {
        // 1.25 + 2.3*2 + (2.3*16 + 0.575) + (2.3*4 + 0.575) = 53.0 ms
        assert_eq!(SensorSettings::default().max_measurement_time_ms(), 53);

        let single = SensorSettings {
            humidity_oversampling: Oversampling::X1,
            temperature_oversampling: Oversampling::X1,
            pressure_oversampling: Oversampling::X1,
            ..SensorSettings::default()
        };
        // 1.25 + 2.3 + 2.875 + 2.875 = 9.3 ms
        assert_eq!(single.max_measurement_time_ms(), 10);
    }
}
