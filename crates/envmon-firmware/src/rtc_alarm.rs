//! Time-of-day wake alarm on the ESP32-S3 RTC
//!
//! The RTC counts microseconds across deep sleep. Its time of day is the
//! counter modulo one day, reset to 00:00:00 on every cold boot. Arming an
//! alarm converts the absolute target into the forward duration from the
//! current time of day, which becomes the deep-sleep timer wake-up.

use core::time::Duration;

use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use esp_hal::rtc_cntl::{Rtc, SleepSource, wakeup_cause};
use log::info;
use thiserror_no_std::Error;

use envmon_core::schedule::{TimeOfDay, WakeSource};
use envmon_core::wake::WakeEvent;

const MICROS_PER_SECOND: u64 = 1_000_000;
const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmError {
    #[error("alarm at {alarm} is not in the future (now {now})")]
    NotInFuture { alarm: TimeOfDay, now: TimeOfDay },
}

/// Why this boot happened.
pub fn wake_event() -> WakeEvent {
    match wakeup_cause() {
        SleepSource::Timer => WakeEvent::Alarm,
        other => {
            info!("Wake cause {:?}, treating as cold boot", other);
            WakeEvent::ColdBoot
        }
    }
}

pub struct RtcAlarm<'d> {
    rtc: Rtc<'d>,
    pending: Option<Duration>,
}

impl<'d> RtcAlarm<'d> {
    /// Wrap the RTC. A cold boot restarts the time of day at midnight.
    pub fn new(rtc: Rtc<'d>, event: WakeEvent) -> Self {
        if event == WakeEvent::ColdBoot {
            rtc.set_current_time_us(0);
            info!("RTC time of day reset to 00:00:00");
        }
        Self { rtc, pending: None }
    }

    /// Sleep time until the armed alarm.
    pub fn pending(&self) -> Option<Duration> {
        self.pending
    }

    /// Power down until `duration` has elapsed. The chip restarts on wake.
    pub fn deep_sleep(&mut self, duration: Duration) -> ! {
        let timer = TimerWakeupSource::new(duration);
        self.rtc.sleep_deep(&[&timer])
    }

    fn time_of_day(&self) -> TimeOfDay {
        let secs = self.rtc.current_time_us() / MICROS_PER_SECOND % SECONDS_PER_DAY;
        TimeOfDay::from_seconds_since_midnight(secs as u32)
    }
}

impl WakeSource for RtcAlarm<'_> {
    type Error = AlarmError;

    fn current_time(&mut self) -> Result<TimeOfDay, Self::Error> {
        Ok(self.time_of_day())
    }

    fn arm(&mut self, alarm: TimeOfDay) -> Result<(), Self::Error> {
        let now = self.time_of_day();
        let secs = now.seconds_until(alarm);
        if secs == 0 {
            return Err(AlarmError::NotInFuture { alarm, now });
        }

        self.pending = Some(Duration::from_secs(secs as u64));
        Ok(())
    }
}
