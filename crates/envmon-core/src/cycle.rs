//! The acquisition cycle
//!
//! One cycle runs per wake event, start to finish, with no overlap:
//!
//! ```text
//! Idle -> Sampling -> Compensating -> Rendering -> Scheduling -> Sleeping
//!                                                                   |
//!            Sampling <------------------- wake event --------------+
//! ```
//!
//! A failed measurement read skips compensation and rendering but still
//! re-arms the wake alarm; the previous reading stays current. A failed
//! display update is logged and skipped. A failure to read the clock or arm
//! the alarm is returned as [`CycleError::Schedule`] and leaves the cycle in
//! [`CycleState::Scheduling`]: the caller must not enter deep sleep.
//!
//! A sensor left unconfigured by a failed [`AcquisitionCycle::recalibrate`]
//! is reconfigured before the next sample. If that fails the cycle is treated
//! like a failed measurement read.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::bus::RegisterBus;
use crate::compensation::{CompensatedReading, CompensationEngine};
use crate::config::{ConfigError, MonitorConfig};
use crate::display::{DisplaySink, ReadingLines};
use crate::schedule::{DutyCycleScheduler, ScheduleError, SchedulerState, WakeSchedule, WakeSource};
use crate::sensors::bme280::registers::CHIP_ID;
use crate::sensors::{Bme280, SensorError};
use crate::wake::{WakeChannel, WakeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Sampling,
    Compensating,
    Rendering,
    Scheduling,
    Sleeping,
}

/// Failures that stop the device from proceeding.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("invalid configuration: {0}")]
    Config(ConfigError),
    #[error("sensor fault: {0}")]
    Sensor(SensorError),
    #[error("wake scheduling failed: {0}")]
    Schedule(ScheduleError),
}

impl From<ConfigError> for CycleError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SensorError> for CycleError {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}

impl From<ScheduleError> for CycleError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

/// What one completed cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub event: WakeEvent,
    /// `None` when the measurement read failed.
    pub reading: Option<CompensatedReading>,
    pub rendered: bool,
    pub next_wake: WakeSchedule,
}

pub struct AcquisitionCycle<B, D, S, W> {
    sensor: Bme280<B, D>,
    engine: CompensationEngine,
    display: S,
    scheduler: DutyCycleScheduler<W>,
    latest: Option<CompensatedReading>,
    state: CycleState,
    config: MonitorConfig,
    /// Cleared by a soft reset, set again once the settings are written.
    sensor_configured: bool,
}

impl<B, D, S, W> AcquisitionCycle<B, D, S, W>
where
    B: RegisterBus,
    D: DelayNs,
    S: DisplaySink,
    W: WakeSource,
{
    /// Cold-boot bring-up: validate `config`, identify, reset and configure
    /// the sensor, and load its calibration. Every failure here is fatal.
    pub fn bring_up(
        bus: B,
        delay: D,
        display: S,
        wake: W,
        config: MonitorConfig,
    ) -> Result<Self, CycleError> {
        config.validate()?;

        let mut sensor = Bme280::new(bus, delay, config.sensor);
        let found = sensor.chip_id()?;
        if found != CHIP_ID {
            error!("BME280: unexpected chip id {:#04x}", found);
            return Err(SensorError::UnexpectedChipId {
                found,
                expected: CHIP_ID,
            }
            .into());
        }
        info!("BME280 detected (chip id {:#04x})", found);

        sensor.soft_reset()?;
        sensor.configure()?;
        let coefficients = sensor.read_calibration()?;
        info!("BME280: calibration loaded");

        Ok(Self {
            sensor,
            engine: CompensationEngine::new(coefficients, config.pressure_offset_hpa),
            display,
            scheduler: DutyCycleScheduler::new(wake, config.wake_interval_secs),
            latest: None,
            state: CycleState::Idle,
            config,
            sensor_configured: true,
        })
    }

    /// Reset the sensor and replace the calibration with a fresh read.
    ///
    /// On failure the previous coefficients stay in use. A sensor that was
    /// reset but not reconfigured is reconfigured at the start of the next
    /// [`Self::run`].
    pub fn recalibrate(&mut self) -> Result<(), CycleError> {
        self.sensor_configured = false;
        self.sensor.soft_reset()?;
        self.sensor.configure()?;
        self.sensor_configured = true;
        let coefficients = self.sensor.read_calibration()?;

        self.engine = CompensationEngine::new(coefficients, self.config.pressure_offset_hpa);
        info!("BME280: calibration reloaded");
        Ok(())
    }

    /// Run one cycle for `event`.
    pub fn run(&mut self, event: WakeEvent) -> Result<CycleReport, CycleError> {
        if event == WakeEvent::Alarm {
            self.scheduler.alarm_fired();
        }

        self.enter(CycleState::Sampling);
        let reading = match self.ensure_configured().and_then(|()| self.sensor.read_raw()) {
            Ok(raw) => {
                self.enter(CycleState::Compensating);
                let reading = self.engine.compensate(&raw);
                if !reading.pressure_defined {
                    warn!("Pressure undefined for raw code {}", raw.pressure);
                }
                self.latest = Some(reading);
                Some(reading)
            }
            Err(e) => {
                warn!("Measurement read failed, skipping render: {}", e);
                None
            }
        };

        let mut rendered = false;
        if let Some(reading) = &reading {
            self.enter(CycleState::Rendering);
            let lines = ReadingLines::from_reading(reading);
            match self.display.show(&lines) {
                Ok(()) => rendered = true,
                Err(e) => warn!("Display update failed, skipping render: {:?}", e),
            }
        }

        self.enter(CycleState::Scheduling);
        let now = self.scheduler.current_time()?;
        let next_wake = self.scheduler.arm_next(now)?;

        self.enter(CycleState::Sleeping);
        Ok(CycleReport {
            event,
            reading,
            rendered,
            next_wake,
        })
    }

    /// Run a cycle if `channel` holds a wake request. The channel refuses new
    /// requests until the cycle returns.
    pub fn service(&mut self, channel: &WakeChannel) -> Option<Result<CycleReport, CycleError>> {
        let ticket = channel.take()?;
        Some(self.run(ticket.event()))
    }

    /// `true` once the last cycle armed the next wake and it is safe to sleep.
    pub fn ready_to_sleep(&self) -> bool {
        self.state == CycleState::Sleeping
            && matches!(self.scheduler.state(), SchedulerState::Armed(_))
    }

    /// Last successfully compensated reading.
    pub fn latest(&self) -> Option<&CompensatedReading> {
        self.latest.as_ref()
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn engine(&self) -> &CompensationEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &DutyCycleScheduler<W> {
        &self.scheduler
    }

    pub fn sensor_mut(&mut self) -> &mut Bme280<B, D> {
        &mut self.sensor
    }

    pub fn display(&self) -> &S {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut S {
        &mut self.display
    }

    pub fn wake_source_mut(&mut self) -> &mut W {
        self.scheduler.wake_source_mut()
    }

    fn ensure_configured(&mut self) -> Result<(), SensorError> {
        if !self.sensor_configured {
            warn!("BME280: settings lost after reset, reconfiguring");
            self.sensor.configure()?;
            self.sensor_configured = true;
        }
        Ok(())
    }

    fn enter(&mut self, next: CycleState) {
        debug!("Cycle: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
