use core::sync::atomic::{AtomicBool, Ordering};

use crate::{rsch::Arbiter, time::UsDuration};

/// Arbiter for a radio that is not shared with any other protocol.
///
/// Continuous mode grants an unlimited timeslot right away. Start and end of
/// the timeslot are reported synchronously through the given callbacks which
/// are expected to forward to
/// [`RadioScheduler::on_timeslot_started()`](crate::RadioScheduler::on_timeslot_started)
/// and
/// [`RadioScheduler::on_timeslot_ended()`](crate::RadioScheduler::on_timeslot_ended).
pub struct SinglePhyArbiter {
    on_started: fn(),
    on_ended: fn(),
    granted: AtomicBool,
}

impl SinglePhyArbiter {
    pub const fn new(on_started: fn(), on_ended: fn()) -> Self {
        Self {
            on_started,
            on_ended,
            granted: AtomicBool::new(false),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Relaxed)
    }
}

impl Arbiter for SinglePhyArbiter {
    fn uninit(&self) {
        self.granted.store(false, Ordering::Relaxed);
    }

    fn continuous_mode_enter(&self) {
        if !self.granted.swap(true, Ordering::Relaxed) {
            (self.on_started)();
        }
    }

    fn continuous_mode_exit(&self) {
        if self.granted.swap(false, Ordering::Relaxed) {
            (self.on_ended)();
        }
    }

    // Nobody else uses the radio.
    fn timeslot_request(&self, _length: UsDuration) -> bool {
        true
    }

    fn timeslot_us_left(&self) -> u32 {
        u32::MAX
    }
}
