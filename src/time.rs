//! Time structures shared by the scheduler and its timer collaborator.
//!
//! - [`UsInstant`] represents a point in time of the timer scheduler's
//!   microsecond clock. The clock is 32 bits wide and wraps, instants are
//!   therefore only comparable if they are less than half a counter period
//!   apart.
//! - [`UsDuration`] represents a microsecond duration.

use fugit::{Instant, MicrosDurationU32};

pub mod export {
    pub use fugit::{Duration, ExtU32, Instant};
}

pub type UsInstant = Instant<u32, 1, 1_000_000>;
pub type UsDuration = MicrosDurationU32;

/// Returns `true` if `t0 + dt` lies strictly after `now`.
///
/// All arithmetic wraps: `t0 + dt` may overflow the 32 bit counter and
/// comparison is done relative to `now` within half a counter period. This is
/// the only sound way to compare instants of a free-running wrapping clock.
#[inline]
pub fn is_in_future(now: UsInstant, t0: UsInstant, dt: UsDuration) -> bool {
    t0 + dt > now
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// The instant could not be safely scheduled, e.g. due to the timer's
    /// granularity or because the scheduled instant is in the past.
    ///
    /// The offending instant is being returned.
    Overdue(UsInstant),

    /// The timer is already running. A dedicated one-shot timer can only be
    /// armed once at a time.
    Busy,
}

#[cfg(test)]
mod tests {
    use super::{export::ExtU32, *};

    #[test]
    fn future_is_strictly_after_now() {
        let t0 = UsInstant::from_ticks(1000);
        assert!(is_in_future(UsInstant::from_ticks(100), t0, 500.micros()));
        assert!(is_in_future(UsInstant::from_ticks(1499), t0, 500.micros()));
        assert!(!is_in_future(UsInstant::from_ticks(1500), t0, 500.micros()));
        assert!(!is_in_future(UsInstant::from_ticks(1501), t0, 500.micros()));
    }

    #[test]
    fn future_survives_counter_wrap() {
        let t0 = UsInstant::from_ticks(u32::MAX - 100);

        // The trigger instant wraps past zero but still lies ahead.
        assert!(is_in_future(UsInstant::from_ticks(u32::MAX - 50), t0, 200.micros()));
        assert!(is_in_future(UsInstant::from_ticks(50), t0, 200.micros()));

        // Now has wrapped past the trigger instant.
        assert!(!is_in_future(UsInstant::from_ticks(150), t0, 200.micros()));
    }
}
