//! Desktop simulator for the envmon environmental monitor.
//!
//! Runs the real acquisition cycle from `envmon-core` against a simulated
//! BME280 register map and a simulated RTC alarm. Each deep sleep jumps the
//! simulated clock straight to the armed alarm, so a day of readings takes
//! seconds. Every rendered frame is printed to the terminal.
//!
//! # Usage
//!
//! ```text
//! envmon-simulator [cycles] [fail_every]
//! ```
//!
//! | Argument     | Default | Meaning                                   |
//! |--------------|---------|-------------------------------------------|
//! | `cycles`     | 12      | Wake cycles to run                        |
//! | `fail_every` | 0 (off) | Fail every N-th measurement burst read    |
//!
//! Build with `--features window` to also show the panel in an SDL2 window.

use std::convert::Infallible;
use std::process::ExitCode;
use std::time::Duration;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::SimulatorDisplay;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use log::{error, info, warn};

use envmon_core::bus::{RegisterBus, TransportError};
use envmon_core::calibration::{
    CalibrationCoefficients, HumidityTrim, PressureTrim, TemperatureTrim,
};
use envmon_core::config::MonitorConfig;
use envmon_core::cycle::{AcquisitionCycle, CycleReport};
use envmon_core::display::{DisplaySink, LINE_HEIGHT_PX, ReadingLines, TextPanel};
use envmon_core::framebuffer::{FRAME_HEIGHT_PX, FRAME_WIDTH_PX, FrameBuffer};
use envmon_core::schedule::{TimeOfDay, WakeSource};
use envmon_core::sensors::bme280::registers::*;
use envmon_core::wake::{WakeChannel, WakeEvent};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

const DEFAULT_CYCLES: u32 = 12;

/// Simulated cold boot at 23:20:00 so the default run crosses midnight.
const BOOT_TIME: TimeOfDay = TimeOfDay::from_seconds_since_midnight(23 * 3_600 + 20 * 60);

/// Pixel rows covered by the three reading lines.
const TEXT_ROWS_PX: i32 = 3 * LINE_HEIGHT_PX;

/// Datasheet worked-example trim set written into the simulated NVM.
const TRIM: CalibrationCoefficients = CalibrationCoefficients {
    temperature: TemperatureTrim {
        t1: 27504,
        t2: 26435,
        t3: -1000,
    },
    pressure: PressureTrim {
        p1: 36477,
        p2: -10685,
        p3: 3024,
        p4: 2855,
        p5: 140,
        p6: -7,
        p7: 15500,
        p8: -14600,
        p9: 6000,
    },
    humidity: HumidityTrim {
        h1: 75,
        h2: 362,
        h3: 0,
        h4: 313,
        h5: 50,
        h6: 30,
    },
};

// ---------------------------------------------------------------------------
// Simulated BME280
// ---------------------------------------------------------------------------

/// Encode trim values into the two NVM blocks, inverse of
/// [`CalibrationCoefficients::load`].
fn encode_calibration(trim: &CalibrationCoefficients) -> ([u8; CALIB_A_LEN], [u8; CALIB_B_LEN]) {
    let t = trim.temperature;
    let p = trim.pressure;
    let h = trim.humidity;

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
    let mut a = [0u8; CALIB_A_LEN];
    for (i, word) in words.iter().enumerate() {
        a[i * 2..i * 2 + 2].copy_from_slice(word);
    }
    a[25] = h.h1;

    let [h2_lo, h2_hi] = h.h2.to_le_bytes();
    let b = [
        h2_lo,
        h2_hi,
        h.h3,
        (h.h4 >> 4) as u8,
        (((h.h5 & 0x0F) << 4) | (h.h4 & 0x0F)) as u8,
        (h.h5 >> 4) as u8,
        h.h6 as u8,
    ];

    (a, b)
}

/// In-memory register map that produces a slowly varying synthetic sample
/// on every burst read.
struct SimulatedBme280 {
    registers: [u8; 256],
    burst_reads: u32,
    fail_every: Option<u32>,
}

impl SimulatedBme280 {
    fn new(fail_every: Option<u32>) -> Self {
        let mut registers = [0u8; 256];
        registers[REG_CHIP_ID as usize] = CHIP_ID;

        let (a, b) = encode_calibration(&TRIM);
        let start = REG_CALIB_A as usize;
        registers[start..start + CALIB_A_LEN].copy_from_slice(&a);
        let start = REG_CALIB_B as usize;
        registers[start..start + CALIB_B_LEN].copy_from_slice(&b);

        Self {
            registers,
            burst_reads: 0,
            fail_every,
        }
    }

    /// Latch the next synthetic conversion into the data registers.
    fn convert(&mut self) {
        let t = self.burst_reads as f64;

        // Around 25 °C, 1006 hPa and 55 %RH with different periods
        let temperature = (519_888.0 + 8_000.0 * (t / 3.0).sin()) as u32;
        let pressure = (415_148.0 + 2_500.0 * (t / 5.0).cos()) as u32;
        let humidity = (30_000.0 + 4_000.0 * (t / 4.0).sin()) as u16;

        let [_, p2, p1, p0] = (pressure << 4).to_be_bytes();
        let [_, t2, t1, t0] = (temperature << 4).to_be_bytes();
        let [h1, h0] = humidity.to_be_bytes();

        let start = REG_BURST as usize;
        self.registers[start..start + BURST_LEN].copy_from_slice(&[p2, p1, p0, t2, t1, t0, h1, h0]);
    }
}

impl RegisterBus for SimulatedBme280 {
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        if register == REG_BURST {
            self.burst_reads += 1;
            if let Some(n) = self.fail_every
                && self.burst_reads % n == 0
            {
                warn!("Injecting bus failure on burst read {}", self.burst_reads);
                return Err(TransportError::Bus {
                    register,
                    kind: ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
                });
            }
            self.convert();
        }

        let start = register as usize;
        let Some(src) = self.registers.get(start..start + buf.len()) else {
            return Err(TransportError::Bus {
                register,
                kind: ErrorKind::Other,
            });
        };
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        if register == REG_RESET {
            if value == RESET_COMMAND {
                info!("Simulated BME280: soft reset");
            }
            return Ok(());
        }
        self.registers[register as usize] = value;
        Ok(())
    }
}

struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

// ---------------------------------------------------------------------------
// Simulated RTC
// ---------------------------------------------------------------------------

/// Time-of-day clock with one alarm slot.
struct SimRtc {
    now: TimeOfDay,
    alarm: Option<TimeOfDay>,
}

impl SimRtc {
    fn new(now: TimeOfDay) -> Self {
        Self { now, alarm: None }
    }

    /// Deep sleep: jump the clock to the pending alarm. `false` if nothing
    /// is armed, in which case the device would never wake.
    fn sleep_until_alarm(&mut self) -> bool {
        let Some(alarm) = self.alarm.take() else {
            return false;
        };
        info!(
            "Sleeping {} s until {}",
            self.now.seconds_until(alarm),
            alarm
        );
        self.now = alarm;
        true
    }
}

impl WakeSource for SimRtc {
    type Error = &'static str;

    fn current_time(&mut self) -> Result<TimeOfDay, Self::Error> {
        Ok(self.now)
    }

    fn arm(&mut self, alarm: TimeOfDay) -> Result<(), Self::Error> {
        if alarm == self.now {
            return Err("alarm would fire immediately");
        }
        self.alarm = Some(alarm);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulated panel
// ---------------------------------------------------------------------------

/// Text is drawn into the framebuffer and only the changed region is
/// flushed to the simulated panel, as on the device.
struct PanelSink {
    panel: TextPanel<FrameBuffer>,
    screen: SimulatorDisplay<BinaryColor>,
}

impl PanelSink {
    fn new() -> Self {
        Self {
            panel: TextPanel::new(FrameBuffer::new(), BinaryColor::On, BinaryColor::Off),
            screen: SimulatorDisplay::new(Size::new(FRAME_WIDTH_PX, FRAME_HEIGHT_PX)),
        }
    }

    fn frame(&self) -> &FrameBuffer {
        self.panel.target()
    }

    #[cfg(feature = "window")]
    fn screen(&self) -> &SimulatorDisplay<BinaryColor> {
        &self.screen
    }
}

impl DisplaySink for PanelSink {
    type Error = Infallible;

    fn show(&mut self, lines: &ReadingLines) -> Result<(), Self::Error> {
        self.panel.show(lines)?;
        self.panel
            .target_mut()
            .flush(&mut self.screen, BinaryColor::On, BinaryColor::Off)
    }
}

/// Print the text rows of `frame`, two pixel rows per terminal line.
fn print_frame(frame: &FrameBuffer) {
    let border = "-".repeat(FRAME_WIDTH_PX as usize);
    println!("+{border}+");
    for y in (0..TEXT_ROWS_PX).step_by(2) {
        let row: String = (0..FRAME_WIDTH_PX as i32)
            .map(|x| match (frame.is_on(x, y), frame.is_on(x, y + 1)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            })
            .collect();
        println!("|{row}|");
    }
    println!("+{border}+");
}

#[cfg(feature = "window")]
mod window {
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics_simulator::{
        BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    };

    /// Pixel scale factor for the simulator window.
    const WINDOW_SCALE: u32 = 4;

    pub struct PanelWindow(Window);

    impl PanelWindow {
        pub fn open() -> Self {
            let settings = OutputSettingsBuilder::new()
                .theme(BinaryColorTheme::OledBlue)
                .scale(WINDOW_SCALE)
                .build();
            Self(Window::new("envmon simulator", &settings))
        }

        /// Show `screen`; `false` once the window was closed.
        pub fn show(&mut self, screen: &SimulatorDisplay<BinaryColor>) -> bool {
            self.0.update(screen);
            !self.0.events().any(|e| matches!(e, SimulatorEvent::Quit))
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(u32, Option<u32>), String> {
    let cycles = match args.next() {
        Some(arg) => arg
            .parse()
            .map_err(|_| format!("invalid cycle count {arg:?}"))?,
        None => DEFAULT_CYCLES,
    };
    let fail_every: u32 = match args.next() {
        Some(arg) => arg
            .parse()
            .map_err(|_| format!("invalid failure interval {arg:?}"))?,
        None => 0,
    };

    Ok((cycles, (fail_every > 0).then_some(fail_every)))
}

fn log_report(n: u32, report: &CycleReport) {
    match &report.reading {
        Some(reading) => {
            let lines = ReadingLines::from_reading(reading);
            info!(
                "Cycle {} ({:?}): {} | {} | {}",
                n, report.event, lines.temperature, lines.humidity, lines.pressure
            );
        }
        None => warn!(
            "Cycle {} ({:?}): no reading, display unchanged",
            n, report.event
        ),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (cycles, fail_every) = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\nusage: envmon-simulator [cycles] [fail_every]");
            return ExitCode::from(2);
        }
    };

    let config = MonitorConfig::default();
    info!(
        "Starting envmon simulator: {} cycles, {} s interval, boot at {}",
        cycles, config.wake_interval_secs, BOOT_TIME
    );
    if let Some(n) = fail_every {
        info!("Every {} burst read will fail", n);
    }

    let mut cycle = match AcquisitionCycle::bring_up(
        SimulatedBme280::new(fail_every),
        SimDelay,
        PanelSink::new(),
        SimRtc::new(BOOT_TIME),
        config,
    ) {
        Ok(cycle) => cycle,
        Err(e) => {
            error!("Bring-up failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    #[cfg(feature = "window")]
    let mut window = window::PanelWindow::open();

    let channel = WakeChannel::new();
    channel.notify(WakeEvent::ColdBoot);

    for n in 1..=cycles {
        let Some(result) = cycle.service(&channel) else {
            error!("No wake request pending");
            return ExitCode::FAILURE;
        };
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("Cycle {} failed, refusing to sleep: {}", n, e);
                return ExitCode::FAILURE;
            }
        };

        log_report(n, &report);
        if report.rendered {
            print_frame(cycle.display().frame());
        }

        #[cfg(feature = "window")]
        if !window.show(cycle.display().screen()) {
            break;
        }

        if !cycle.ready_to_sleep() || !cycle.wake_source_mut().sleep_until_alarm() {
            error!("No wake path armed, refusing to sleep");
            return ExitCode::FAILURE;
        }
        channel.notify(WakeEvent::Alarm);
    }

    info!("Simulator exiting");
    ExitCode::SUCCESS
}
