//! Wake-request hand-off between interrupt context and the acquisition cycle
//!
//! Wake sources (cold boot, RTC alarm interrupt) call [`WakeChannel::notify`];
//! the main loop calls [`WakeChannel::take`] and runs one cycle per returned
//! [`CycleTicket`]. While a ticket is alive the channel refuses new requests,
//! so a wake that arrives during a cycle is dropped instead of being queued.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, warn};

/// Why the device woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeEvent {
    /// Power-on or reset. Runs right after bring-up has loaded calibration.
    ColdBoot,
    /// The programmed time-of-day alarm fired.
    Alarm,
}

pub struct WakeChannel {
    signal: Signal<CriticalSectionRawMutex, WakeEvent>,
    in_progress: Mutex<Cell<bool>>,
}

impl Default for WakeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeChannel {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
            in_progress: Mutex::new(Cell::new(false)),
        }
    }

    /// Request a cycle. Returns `false` if a cycle is already running.
    ///
    /// Safe to call from interrupt context. Requests made before the pending
    /// one is taken coalesce into a single cycle carrying the latest event.
    pub fn notify(&self, event: WakeEvent) -> bool {
        critical_section::with(|cs| {
            if self.in_progress.borrow(cs).get() {
                warn!("Ignoring {:?} wake: cycle in progress", event);
                return false;
            }
            self.signal.signal(event);
            true
        })
    }

    /// Claim the pending request, if any and if no cycle is running.
    pub fn take(&self) -> Option<CycleTicket<'_>> {
        critical_section::with(|cs| {
            let busy = self.in_progress.borrow(cs);
            if busy.get() {
                return None;
            }
            let event = self.signal.try_take()?;
            busy.set(true);
            debug!("Starting cycle for {:?} wake", event);
            Some(CycleTicket {
                channel: self,
                event,
            })
        })
    }

    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| self.in_progress.borrow(cs).get())
    }

    fn finish(&self) {
        critical_section::with(|cs| self.in_progress.borrow(cs).set(false));
    }
}

/// Exclusive right to run one acquisition cycle. Dropping it reopens the
/// channel.
pub struct CycleTicket<'a> {
    channel: &'a WakeChannel,
    event: WakeEvent,
}

impl CycleTicket<'_> {
    pub fn event(&self) -> WakeEvent {
        self.event
    }
}

impl Drop for CycleTicket<'_> {
    fn drop(&mut self) {
        self.channel.finish();
    }
}
