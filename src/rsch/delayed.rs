//! Delayed timeslot sequencer.
//!
//! A delayed timeslot is sequenced by two expiries of the scheduler's
//! one-shot timer:
//!
//! 1. The pre-request expiry, ramp-up time plus timer granularity before the
//!    timeslot start, opens the pre-request window: from then on the delayed
//!    timeslot's priority level is requested from all preconditions.
//! 2. The start expiry at the timeslot start checks whether all
//!    preconditions approved the requested level in time and reports the
//!    outcome to the core.
//!
//! If the pre-request point already passed but the maximum priority level is
//! being requested anyway, the first step is skipped.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering, compiler_fence};

use super::{
    RadioScheduler, SchedulerConfig,
    api::{SchedulerCore, SchedulerTimer},
    priority::{AtomicPriority, Priority},
};
use crate::{
    time::{UsDuration, UsInstant, is_in_future},
    trace::{TracePoint, TraceScope},
};

/// States of the delayed timeslot.
///
/// Ownership of the request fields in [`DelayedTimeslot`] follows the state:
/// - Idle: unused, may be acquired by any context requesting a timeslot.
/// - Pending: owned exclusively by the requesting context.
/// - ArmedForPreconditions and ArmedForStart: owned by the timer's expiry,
///   read-only for everybody else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
enum DelayedState {
    Idle = 0,
    Pending,
    ArmedForPreconditions,
    ArmedForStart,
}

impl DelayedState {
    fn from_stored(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Pending,
            2 => Self::ArmedForPreconditions,
            3 => Self::ArmedForStart,
            _ => unreachable!(),
        }
    }
}

/// The single delayed timeslot request that may be outstanding at any time.
pub(super) struct DelayedTimeslot {
    /// See [`DelayedState`].
    state: AtomicU8,

    /// Requested priority level, idle once the outcome has been decided.
    priority: AtomicPriority,

    /// Base instant of the timeslot start, in timer ticks.
    t0: AtomicU32,

    /// Timeslot start relative to `t0`, in microseconds.
    dt: AtomicU32,
}

impl DelayedTimeslot {
    pub(super) const fn new() -> Self {
        Self {
            state: AtomicU8::new(DelayedState::Idle as u8),
            priority: AtomicPriority::new(Priority::Idle),
            t0: AtomicU32::new(0),
            dt: AtomicU32::new(0),
        }
    }

    fn state(&self) -> DelayedState {
        let state = self.state.load(Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        DelayedState::from_stored(state)
    }

    /// Publishes the request fields written before.
    fn set_state(&self, state: DelayedState) {
        compiler_fence(Ordering::Release);
        self.state.store(state as u8, Ordering::Relaxed);
    }

    /// Acquires the request for the current context.
    fn try_acquire(&self) -> bool {
        compiler_fence(Ordering::Release);
        let acquired = self
            .state
            .compare_exchange(
                DelayedState::Idle as u8,
                DelayedState::Pending as u8,
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok();
        compiler_fence(Ordering::Acquire);
        acquired
    }

    /// Requires the current context to own the request.
    fn record(&self, t0: UsInstant, dt: UsDuration, priority: Priority) {
        self.t0.store(t0.ticks(), Ordering::Relaxed);
        self.dt.store(dt.ticks(), Ordering::Relaxed);
        self.priority.store(priority);
    }

    fn t0(&self) -> UsInstant {
        UsInstant::from_ticks(self.t0.load(Ordering::Relaxed))
    }

    fn dt(&self) -> UsDuration {
        UsDuration::from_ticks(self.dt.load(Ordering::Relaxed))
    }

    pub(super) fn reset(&self) {
        self.priority.store(Priority::Idle);
        self.t0.store(0, Ordering::Relaxed);
        self.dt.store(0, Ordering::Relaxed);
        self.set_state(DelayedState::Idle);
    }
}

impl<Config: SchedulerConfig> RadioScheduler<Config> {
    /// Requests a timeslot starting at `t0 + dt` with the given priority
    /// level.
    ///
    /// The outcome is reported through
    /// [`SchedulerCore::on_delayed_timeslot_started()`] or
    /// [`SchedulerCore::on_delayed_timeslot_failed()`] exactly once at the
    /// start instant. Returns `false` if the start is too close to be
    /// prepared in time, in which case nothing will be reported.
    ///
    /// Only a single delayed timeslot may be outstanding. Requesting another
    /// one before the outcome of the previous was reported is a usage error.
    pub fn delayed_timeslot_request(
        &self,
        t0: UsInstant,
        dt: UsDuration,
        length: UsDuration,
        priority: Priority,
    ) -> bool {
        let _scope = TraceScope::enter(TracePoint::DelayedTimeslotRequest);

        if priority.is_idle() {
            debug_assert!(false, "idle delayed timeslot");
            return false;
        }

        if !self.delayed.try_acquire() {
            debug_assert!(false, "delayed timeslot already requested");
            warn!("overlapping delayed timeslot request rejected");
            return false;
        }

        let now = self.now();
        let scheduled = match self.pre_request_delay(dt) {
            Some(pre_request_dt) if is_in_future(now, t0, pre_request_dt) => {
                self.delayed.record(t0, dt, priority);
                self.arm(DelayedState::ArmedForPreconditions, t0 + pre_request_dt)
            }
            _ if self.requested.load() >= Priority::MAX && is_in_future(now, t0, dt) => {
                self.delayed.record(t0, dt, priority);
                self.arm(DelayedState::ArmedForStart, t0 + dt)
            }
            _ => false,
        };

        if scheduled {
            debug!(
                "delayed timeslot at {:?} + {:?} ({:?} long) with {:?}",
                t0, dt, length, priority
            );
        } else {
            self.delayed.reset();
            debug!("delayed timeslot at {:?} + {:?} is too late", t0, dt);
        }

        scheduled
    }

    /// Returns `true` while a delayed timeslot is outstanding.
    pub fn has_delayed_timeslot(&self) -> bool {
        !matches!(self.delayed.state(), DelayedState::Idle)
    }

    /// Notification entry point: the scheduler timer expired.
    pub fn on_timer_expired(&self) {
        match self.delayed.state() {
            DelayedState::ArmedForPreconditions => self.on_pre_request_expired(),
            DelayedState::ArmedForStart => self.on_start_expired(),
            state => trace!("ignoring timer expiry in delayed state {:?}", state),
        }
    }

    /// Priority level of the delayed timeslot if its pre-request window is
    /// open at `now`, idle otherwise.
    pub(super) fn delayed_window_priority(&self, now: UsInstant) -> Priority {
        let is_open = match self.delayed.state() {
            DelayedState::Idle | DelayedState::Pending => false,
            // The timer may expire slightly early, so once we're armed for the
            // start the window is open irrespective of the current time.
            DelayedState::ArmedForStart => true,
            DelayedState::ArmedForPreconditions => match self.pre_request_delay(self.delayed.dt()) {
                Some(pre_request_dt) => !is_in_future(now, self.delayed.t0(), pre_request_dt),
                None => true,
            },
        };

        if is_open {
            self.delayed.priority.load()
        } else {
            Priority::Idle
        }
    }

    /// Delay of the pre-request point relative to `t0`, [`None`] if the
    /// pre-request point lies before `t0`.
    fn pre_request_delay(&self, dt: UsDuration) -> Option<UsDuration> {
        dt.checked_sub(Config::RAMP_UP_TIME)?
            .checked_sub(self.timer.granularity())
    }

    /// Transitions the owned request into an armed state and arms the timer.
    fn arm(&self, state: DelayedState, at: UsInstant) -> bool {
        self.delayed.set_state(state);
        match self.timer.schedule_once(at) {
            Ok(()) => true,
            Err(err) => {
                warn!("cannot arm delayed timeslot timer: {:?}", err);
                false
            }
        }
    }

    fn on_pre_request_expired(&self) {
        let _scope = TraceScope::enter(TracePoint::TimerDelayedPrec);

        self.delayed.set_state(DelayedState::ArmedForStart);
        self.update_requested_priority();

        let start = self.delayed.t0() + self.delayed.dt();
        if let Err(err) = self.timer.schedule_once(start) {
            // Decide right away so that the outcome is reported exactly once.
            warn!("cannot arm delayed timeslot start: {:?}", err);
            self.on_start_expired();
        }
    }

    fn on_start_expired(&self) {
        let _scope = TraceScope::enter(TracePoint::TimerDelayedStart);

        let priority = self.delayed.priority.swap(Priority::Idle);
        let approved = self.approved_priority();
        self.delayed.set_state(DelayedState::Idle);

        if approved >= priority {
            debug!("delayed timeslot started with {:?}", approved);
            self.core.on_delayed_timeslot_started();
        } else {
            debug!(
                "delayed timeslot failed, approved {:?} < {:?}",
                approved, priority
            );
            self.core.on_delayed_timeslot_failed();
            self.update_requested_priority();
        }
    }
}
