//! Collaborator interfaces of the radio scheduler.
//!
//! The scheduler does not drive any hardware itself. It requests
//! preconditions through the traits in this module and expects collaborators
//! to report back through the notification entry points of
//! [`RadioScheduler`](super::RadioScheduler). Reports MAY be issued
//! synchronously from within a request (e.g. a clock that is already running)
//! or later from interrupt context.

use crate::time::{TimerError, UsDuration, UsInstant};

use super::priority::Priority;

/// Groups the collaborator implementations of a scheduler instance.
pub trait SchedulerConfig {
    /// High-frequency clock implementation.
    type Clock: HfClock;

    /// Radio arbiter implementation.
    type Arbiter: Arbiter;

    /// One-shot timer used to sequence delayed timeslots.
    type Timer: SchedulerTimer;

    /// The radio driver core to be notified.
    type Core: SchedulerCore;

    /// Worst case time between requesting the preconditions and all of them
    /// being approved. Dominated by the HF clock start-up time.
    const RAMP_UP_TIME: UsDuration = UsDuration::micros(300);
}

/// High-frequency clock precondition.
///
/// Readiness must be reported through
/// [`RadioScheduler::on_hf_clock_ready()`](super::RadioScheduler::on_hf_clock_ready)
/// once after each start request.
pub trait HfClock {
    /// Requests the clock. Idempotent while the clock is requested.
    fn start(&self);

    /// Releases the clock. Implementations SHOULD defer the actual stop to a
    /// low-priority context ("priority drop") as stopping may take a while.
    fn stop(&self);

    /// Cancels a deferred stop that has not been executed yet.
    fn terminate_pending_stop(&self);
}

/// Radio arbiter precondition, granting exclusive access to the RADIO
/// peripheral for a contiguous timeslot.
///
/// Timeslot start and end must be reported through
/// [`RadioScheduler::on_timeslot_started()`](super::RadioScheduler::on_timeslot_started)
/// and
/// [`RadioScheduler::on_timeslot_ended()`](super::RadioScheduler::on_timeslot_ended).
/// Both MAY be reported synchronously from within
/// [`Arbiter::continuous_mode_enter()`] and
/// [`Arbiter::continuous_mode_exit()`].
pub trait Arbiter {
    fn init(&self) {}

    fn uninit(&self) {}

    /// Asks the arbiter to grant timeslots as often and as long as possible.
    fn continuous_mode_enter(&self);

    /// Stops asking for timeslots. An ongoing timeslot ends immediately.
    fn continuous_mode_exit(&self);

    /// Requests the current timeslot to last at least `length` from now.
    ///
    /// Returns `true` if the driver core has exclusive access for the full
    /// length.
    fn timeslot_request(&self, length: UsDuration) -> bool;

    /// Returns the number of microseconds left in the current timeslot.
    fn timeslot_us_left(&self) -> u32;
}

/// A dedicated one-shot timer of the timer scheduling facility.
///
/// Expiry must be reported through
/// [`RadioScheduler::on_timer_expired()`](super::RadioScheduler::on_timer_expired).
/// The callback MAY be called from interrupt context.
pub trait SchedulerTimer {
    /// Returns a recent instant of the timer scheduler's clock.
    ///
    /// Note: This will always return a past instant as the clock continues to
    ///       tick concurrently.
    fn now(&self) -> UsInstant;

    /// The timer's precision. A timer scheduled at some instant may fire up
    /// to one granularity early.
    fn granularity(&self) -> UsDuration;

    /// Arms the timer.
    ///
    /// Returns [`TimerError::Overdue`] if the instant can no longer be
    /// scheduled safely and [`TimerError::Busy`] if the timer is already
    /// armed.
    fn schedule_once(&self, at: UsInstant) -> Result<(), TimerError>;

    /// Disarms the timer. A no-op if the timer is not armed or already fired.
    fn cancel(&self);
}

/// Notifications to the radio driver core.
pub trait SchedulerCore {
    /// The priority level approved by all preconditions changed while
    /// continuous mode was active. Reported once per distinct level.
    fn on_continuous_priority_changed(&self, priority: Priority);

    /// A previously requested delayed timeslot starts right now.
    fn on_delayed_timeslot_started(&self);

    /// A previously requested delayed timeslot cannot be started as at least
    /// one precondition was not approved in time.
    fn on_delayed_timeslot_failed(&self);

    /// Relayed from the arbiter: a timeslot started.
    fn on_timeslot_started(&self) {}

    /// Relayed from the arbiter: a timeslot ended.
    fn on_timeslot_ended(&self) {}
}
