//! Duty-cycle wake scheduling
//!
//! The device keeps a single one-shot alarm in a real-time clock that only
//! knows time of day. [`DutyCycleScheduler::arm_next`] adds the fixed interval
//! to the current time with explicit carries from seconds into minutes into
//! hours, wraps hours at midnight, and programs the result. Day and date are
//! not tracked.

use core::fmt;

use log::{error, info};
use thiserror_no_std::Error;

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3_600;
const SECONDS_PER_DAY: u32 = 86_400;

/// A valid wall-clock time of day with one second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// `None` unless hours < 24, minutes < 60 and seconds < 60.
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Option<Self> {
        if hours < 24 && minutes < 60 && seconds < 60 {
            Some(Self {
                hours,
                minutes,
                seconds,
            })
        } else {
            None
        }
    }

    /// Time of day `secs` seconds after midnight, wrapping at 24 h.
    pub const fn from_seconds_since_midnight(secs: u32) -> Self {
        let secs = secs % SECONDS_PER_DAY;
        Self {
            hours: (secs / SECONDS_PER_HOUR) as u8,
            minutes: ((secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u8,
            seconds: (secs % SECONDS_PER_MINUTE) as u8,
        }
    }

    pub const fn seconds_since_midnight(self) -> u32 {
        self.hours as u32 * SECONDS_PER_HOUR
            + self.minutes as u32 * SECONDS_PER_MINUTE
            + self.seconds as u32
    }

    pub const fn hours(self) -> u8 {
        self.hours
    }

    pub const fn minutes(self) -> u8 {
        self.minutes
    }

    pub const fn seconds(self) -> u8 {
        self.seconds
    }

    /// Advance by `secs`, carrying seconds into minutes and minutes into
    /// hours. Hours wrap at 24; whole days vanish.
    pub const fn add_seconds(self, secs: u32) -> Self {
        let secs = secs % SECONDS_PER_DAY;

        let s = self.seconds as u32 + secs % SECONDS_PER_MINUTE;
        let m = self.minutes as u32 + (secs / SECONDS_PER_MINUTE) % 60 + s / 60;
        let h = (self.hours as u32 + secs / SECONDS_PER_HOUR + m / 60) % 24;

        Self {
            hours: h as u8,
            minutes: (m % 60) as u8,
            seconds: (s % 60) as u8,
        }
    }

    /// Forward distance to `later`, in `0..86_400` seconds.
    pub const fn seconds_until(self, later: Self) -> u32 {
        (later.seconds_since_midnight() + SECONDS_PER_DAY - self.seconds_since_midnight())
            % SECONDS_PER_DAY
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// The time a schedule was computed from and the alarm it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeSchedule {
    pub current: TimeOfDay,
    pub target: TimeOfDay,
}

impl WakeSchedule {
    pub const fn after(current: TimeOfDay, interval_secs: u32) -> Self {
        Self {
            current,
            target: current.add_seconds(interval_secs),
        }
    }
}

/// Hardware that can hold exactly one pending time-of-day alarm.
pub trait WakeSource {
    type Error: fmt::Debug;

    /// Current time of day.
    fn current_time(&mut self) -> Result<TimeOfDay, Self::Error>;

    /// Program the alarm, replacing any pending one.
    fn arm(&mut self, alarm: TimeOfDay) -> Result<(), Self::Error>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("wake source rejected alarm at {alarm}")]
    AlarmRejected { alarm: TimeOfDay },
    #[error("wake source clock could not be read")]
    ClockUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No alarm pending. Only seen during reconfiguration, after a wake, or
    /// after a failed arm.
    Idle,
    Armed(WakeSchedule),
}

/// Owns the wake source and keeps at most one alarm armed.
pub struct DutyCycleScheduler<W> {
    wake: W,
    interval_secs: u32,
    state: SchedulerState,
}

impl<W: WakeSource> DutyCycleScheduler<W> {
    pub fn new(wake: W, interval_secs: u32) -> Self {
        Self {
            wake,
            interval_secs,
            state: SchedulerState::Idle,
        }
    }

    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    pub const fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    pub fn wake_source(&self) -> &W {
        &self.wake
    }

    pub fn wake_source_mut(&mut self) -> &mut W {
        &mut self.wake
    }

    pub fn current_time(&mut self) -> Result<TimeOfDay, ScheduleError> {
        self.wake.current_time().map_err(|e| {
            error!("Wake source clock read failed: {:?}", e);
            ScheduleError::ClockUnavailable
        })
    }

    /// Program the alarm one interval after `current`.
    ///
    /// Calling this again before the alarm fires reprograms the same single
    /// alarm. A rejected alarm leaves the scheduler `Idle`; the caller must
    /// not enter deep sleep in that case.
    pub fn arm_next(&mut self, current: TimeOfDay) -> Result<WakeSchedule, ScheduleError> {
        self.state = SchedulerState::Idle;

        let schedule = WakeSchedule::after(current, self.interval_secs);
        self.wake.arm(schedule.target).map_err(|e| {
            error!("Wake source rejected alarm at {}: {:?}", schedule.target, e);
            ScheduleError::AlarmRejected {
                alarm: schedule.target,
            }
        })?;

        self.state = SchedulerState::Armed(schedule);
        info!("Next wake at {} (now {})", schedule.target, current);
        Ok(schedule)
    }

    /// The pending alarm fired.
    pub fn alarm_fired(&mut self) {
        self.state = SchedulerState::Idle;
    }
}
