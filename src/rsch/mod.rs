//! The radio precondition scheduler.
//!
//! - [`RadioScheduler`] requests radio activity preconditions (see
//!   [`Precondition`]) on behalf of the driver core, either continuously (see
//!   [`RadioScheduler::continuous_mode_priority_set()`]) or ahead of a delayed
//!   timeslot (see [`RadioScheduler::delayed_timeslot_request()`]).
//!
//! - Preconditions report their approvals asynchronously through the
//!   scheduler's notification entry points. The scheduler aggregates them and
//!   notifies the driver core (see [`SchedulerCore`]).
//!
//! - All entry points may be called from any execution context. Shared state
//!   is either atomic and written by a single context or protected by a
//!   [`RetryMutex`].

mod aggregator;
mod api;
mod delayed;
mod notify;
mod priority;
mod request;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{Arbiter, HfClock, SchedulerConfig, SchedulerCore, SchedulerTimer};
pub use priority::{Precondition, Priority};

use aggregator::PreconditionRegistry;
use delayed::DelayedTimeslot;
use notify::CriticalSection;
use priority::AtomicPriority;

use crate::{
    time::{UsDuration, UsInstant},
    trace::{TracePoint, TraceScope},
    util::sync::RetryMutex,
};

/// Schedules radio activity preconditions for the driver core.
///
/// A single instance SHALL exist per radio. It is usually placed in a static
/// and called from interrupt handlers, hence the const constructor and the
/// shared-reference API.
pub struct RadioScheduler<Config: SchedulerConfig> {
    clock: Config::Clock,
    arbiter: Config::Arbiter,
    timer: Config::Timer,
    core: Config::Core,

    /// Protects the request critical section, see
    /// [`RadioScheduler::update_requested_priority()`].
    req_mutex: RetryMutex,

    /// Protects the notify critical section, see
    /// [`RadioScheduler::notify_core()`].
    ntf_mutex: RetryMutex,

    /// Priority level currently requested from all preconditions.
    ///
    /// Only written inside the request critical section.
    requested: AtomicPriority,

    /// Continuous mode priority level, idle if continuous mode is inactive.
    continuous: AtomicPriority,

    /// Last approved priority level reported to the core.
    ///
    /// Only written inside the notify critical section. Reset to idle while
    /// continuous mode is inactive.
    last_notified: AtomicPriority,

    /// Priority levels approved by each precondition.
    preconditions: PreconditionRegistry,

    /// The delayed timeslot request, if any.
    delayed: DelayedTimeslot,

    /// Suppresses core notifications while the core is in a critical section.
    critical_section: CriticalSection,
}

impl<Config: SchedulerConfig> RadioScheduler<Config> {
    /// Static-friendly constructor. Call [`RadioScheduler::init()`] before
    /// using the scheduler.
    pub const fn new(
        clock: Config::Clock,
        arbiter: Config::Arbiter,
        timer: Config::Timer,
        core: Config::Core,
    ) -> Self {
        Self {
            clock,
            arbiter,
            timer,
            core,
            req_mutex: RetryMutex::new(),
            ntf_mutex: RetryMutex::new(),
            requested: AtomicPriority::new(Priority::Idle),
            continuous: AtomicPriority::new(Priority::Idle),
            last_notified: AtomicPriority::new(Priority::Idle),
            preconditions: PreconditionRegistry::new(),
            delayed: DelayedTimeslot::new(),
            critical_section: CriticalSection::new(),
        }
    }

    /// Initializes the arbiter and puts the scheduler into inactive mode.
    ///
    /// Must be called once before any other method and while no other
    /// execution context can call into the scheduler.
    pub fn init(&self) {
        self.arbiter.init();

        self.req_mutex.reset();
        self.ntf_mutex.reset();
        self.requested.store(Priority::Idle);
        self.continuous.store(Priority::Idle);
        self.last_notified.store(Priority::Idle);
        self.preconditions.reset();
        self.delayed.reset();
        self.critical_section.reset();

        info!("radio scheduler initialized");
    }

    /// Cancels a pending delayed timeslot and uninitializes the arbiter.
    pub fn uninit(&self) {
        self.timer.cancel();
        self.delayed.reset();
        self.arbiter.uninit();

        info!("radio scheduler uninitialized");
    }

    /// Sets the continuous mode priority level.
    ///
    /// In continuous mode the scheduler tries to keep all preconditions
    /// approved as long as possible at the given level and reports changes of
    /// the approved level through
    /// [`SchedulerCore::on_continuous_priority_changed()`]. Setting
    /// [`Priority::Idle`] leaves continuous mode.
    pub fn continuous_mode_priority_set(&self, priority: Priority) {
        let _scope = TraceScope::enter(if priority.is_idle() {
            TracePoint::ContinuousExit
        } else {
            TracePoint::ContinuousEnter
        });

        self.continuous.store(priority);

        self.update_requested_priority();
        self.notify_core();
    }

    /// Requests the current timeslot to last for at least `length` from now.
    ///
    /// Should only be called while a timeslot is granted.
    pub fn timeslot_request_now(&self, length: UsDuration) -> bool {
        self.arbiter.timeslot_request(length)
    }

    /// Returns the number of microseconds left in the current timeslot.
    pub fn timeslot_us_left(&self) -> u32 {
        self.arbiter.timeslot_us_left()
    }

    /// Returns `true` if the given precondition approved at least the given
    /// priority level.
    ///
    /// Approvals count only up to the requested level, see
    /// [`RadioScheduler::precondition_approval()`]. A running clock queried
    /// at [`Priority::Tx`] while [`Priority::Rx`] is requested is therefore
    /// not approved.
    pub fn precondition_is_approved(&self, precondition: Precondition, priority: Priority) -> bool {
        self.precondition_approval(precondition) >= priority
    }

    /// Returns the priority level currently requested from all
    /// preconditions.
    pub fn requested_priority(&self) -> Priority {
        self.requested.load()
    }

    /// Returns the continuous mode priority level.
    pub fn continuous_priority(&self) -> Priority {
        self.continuous.load()
    }

    /// Enters the core's critical section.
    ///
    /// Until the matching [`RadioScheduler::critical_section_exit()`] no
    /// continuous priority change will be reported to the core. Calls may
    /// nest and may be preempted by nested calls from higher priorities.
    pub fn critical_section_enter(&self) {
        self.critical_section.enter();
    }

    /// Exits the core's critical section. Reports continuous priority changes
    /// deferred in the meantime when the outermost section is left.
    pub fn critical_section_exit(&self) {
        let _scope = TraceScope::enter(TracePoint::CriticalSectionExit);
        if self.critical_section.exit() {
            self.notify_core();
        }
    }

    /// Notification entry point: the HF clock is ready.
    pub fn on_hf_clock_ready(&self) {
        let _scope = TraceScope::enter(TracePoint::HfClockReady);
        self.set_precondition_approval(Precondition::HfClock, Priority::MAX);
        self.notify_core();
    }

    /// Notification entry point: the arbiter granted a timeslot.
    pub fn on_timeslot_started(&self) {
        let _scope = TraceScope::enter(TracePoint::TimeslotStarted);
        self.set_precondition_approval(Precondition::Arbiter, Priority::MAX);
        self.notify_core();
        self.core.on_timeslot_started();
    }

    /// Notification entry point: the arbiter revoked the timeslot.
    pub fn on_timeslot_ended(&self) {
        let _scope = TraceScope::enter(TracePoint::TimeslotEnded);
        self.set_precondition_approval(Precondition::Arbiter, Priority::Idle);
        self.notify_core();
        self.core.on_timeslot_ended();
    }

    pub fn clock(&self) -> &Config::Clock {
        &self.clock
    }

    pub fn arbiter(&self) -> &Config::Arbiter {
        &self.arbiter
    }

    pub fn timer(&self) -> &Config::Timer {
        &self.timer
    }

    pub fn core(&self) -> &Config::Core {
        &self.core
    }

    fn now(&self) -> UsInstant {
        self.timer.now()
    }
}
