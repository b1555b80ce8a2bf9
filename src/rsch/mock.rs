//! Recording collaborators for scheduler tests.
//!
//! Collaborators may be given hooks that call back into the scheduler
//! synchronously. This simulates a higher-priority interrupt preempting the
//! scheduler at the exact point where the collaborator is called.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use super::{
    RadioScheduler,
    api::{Arbiter, HfClock, SchedulerConfig, SchedulerCore, SchedulerTimer},
    priority::Priority,
};
use crate::time::{TimerError, UsDuration, UsInstant};

type Hook = RefCell<Option<Rc<dyn Fn()>>>;

fn call(hook: &Hook) {
    // Clone first, the hook may replace itself.
    let hook = hook.borrow().clone();
    if let Some(hook) = hook {
        hook();
    }
}

pub(crate) struct Mock;

impl SchedulerConfig for Mock {
    type Clock = MockClock;
    type Arbiter = MockArbiter;
    type Timer = MockTimer;
    type Core = MockCore;
}

/// Creates an initialized scheduler that lives for the rest of the test so
/// that hooks can capture it.
pub(crate) fn scheduler() -> &'static RadioScheduler<Mock> {
    let rsch: &'static RadioScheduler<Mock> = Box::leak(Box::new(RadioScheduler::new(
        MockClock::default(),
        MockArbiter::default(),
        MockTimer::default(),
        MockCore::default(),
    )));
    *rsch.timer().on_expiry.borrow_mut() = Some(Rc::new(move || rsch.on_timer_expired()));
    rsch.init();
    rsch
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClockCall {
    Start,
    Stop,
    TerminatePendingStop,
}

#[derive(Default)]
pub(crate) struct MockClock {
    pub starts: Cell<u32>,
    pub stops: Cell<u32>,
    pub terminations: Cell<u32>,
    pub calls: RefCell<Vec<ClockCall>>,
    start_hook: Hook,
    stop_hook: Hook,
}

impl MockClock {
    pub fn on_start(&self, hook: Rc<dyn Fn()>) {
        *self.start_hook.borrow_mut() = Some(hook);
    }

    pub fn on_stop(&self, hook: Rc<dyn Fn()>) {
        *self.stop_hook.borrow_mut() = Some(hook);
    }
}

impl HfClock for MockClock {
    fn start(&self) {
        self.starts.set(self.starts.get() + 1);
        self.calls.borrow_mut().push(ClockCall::Start);
        call(&self.start_hook);
    }

    fn stop(&self) {
        self.stops.set(self.stops.get() + 1);
        self.calls.borrow_mut().push(ClockCall::Stop);
        call(&self.stop_hook);
    }

    fn terminate_pending_stop(&self) {
        self.terminations.set(self.terminations.get() + 1);
        self.calls.borrow_mut().push(ClockCall::TerminatePendingStop);
    }
}

#[derive(Default)]
pub(crate) struct MockArbiter {
    pub inits: Cell<u32>,
    pub uninits: Cell<u32>,
    pub enters: Cell<u32>,
    pub exits: Cell<u32>,
    pub us_left: Cell<u32>,
    pub grant_requests: Cell<bool>,
    pub requested_lengths: RefCell<Vec<UsDuration>>,
    enter_hook: Hook,
}

impl MockArbiter {
    pub fn on_enter(&self, hook: Rc<dyn Fn()>) {
        *self.enter_hook.borrow_mut() = Some(hook);
    }
}

impl Arbiter for MockArbiter {
    fn init(&self) {
        self.inits.set(self.inits.get() + 1);
    }

    fn uninit(&self) {
        self.uninits.set(self.uninits.get() + 1);
    }

    fn continuous_mode_enter(&self) {
        self.enters.set(self.enters.get() + 1);
        call(&self.enter_hook);
    }

    fn continuous_mode_exit(&self) {
        self.exits.set(self.exits.get() + 1);
    }

    fn timeslot_request(&self, length: UsDuration) -> bool {
        self.requested_lengths.borrow_mut().push(length);
        self.grant_requests.get()
    }

    fn timeslot_us_left(&self) -> u32 {
        self.us_left.get()
    }
}

pub(crate) struct MockTimer {
    pub now: Cell<UsInstant>,
    pub granularity: Cell<UsDuration>,
    pub armed: Cell<Option<UsInstant>>,
    /// Successfully scheduled instants.
    pub history: RefCell<Vec<UsInstant>>,
    /// Makes the next arm attempt fail.
    pub fail_with: Cell<Option<TimerError>>,
    on_expiry: Hook,
}

impl Default for MockTimer {
    fn default() -> Self {
        Self {
            now: Cell::new(UsInstant::from_ticks(0)),
            granularity: Cell::new(UsDuration::micros(10)),
            armed: Cell::new(None),
            history: RefCell::new(Vec::new()),
            fail_with: Cell::new(None),
            on_expiry: RefCell::new(None),
        }
    }
}

impl MockTimer {
    /// Advances the clock to the armed instant and expires the timer.
    pub fn fire(&self) {
        let at = self.armed.take().expect("timer not armed");
        self.now.set(at);
        call(&self.on_expiry);
    }
}

impl SchedulerTimer for MockTimer {
    fn now(&self) -> UsInstant {
        self.now.get()
    }

    fn granularity(&self) -> UsDuration {
        self.granularity.get()
    }

    fn schedule_once(&self, at: UsInstant) -> Result<(), TimerError> {
        if let Some(err) = self.fail_with.take() {
            return Err(err);
        }
        if self.armed.get().is_some() {
            return Err(TimerError::Busy);
        }
        if at <= self.now.get() {
            return Err(TimerError::Overdue(at));
        }
        self.armed.set(Some(at));
        self.history.borrow_mut().push(at);
        Ok(())
    }

    fn cancel(&self) {
        self.armed.set(None);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CoreEvent {
    PriorityChanged(Priority),
    DelayedStarted,
    DelayedFailed,
    TimeslotStarted,
    TimeslotEnded,
}

#[derive(Default)]
pub(crate) struct MockCore {
    events: RefCell<Vec<CoreEvent>>,
    priority_hook: RefCell<Option<Rc<dyn Fn(Priority)>>>,
    delayed_hook: Hook,
}

impl MockCore {
    pub fn events(&self) -> Vec<CoreEvent> {
        self.events.borrow().clone()
    }

    pub fn priority_changes(&self) -> Vec<Priority> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                CoreEvent::PriorityChanged(priority) => Some(*priority),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn on_priority_changed(&self, hook: Rc<dyn Fn(Priority)>) {
        *self.priority_hook.borrow_mut() = Some(hook);
    }

    /// Called after either delayed timeslot outcome was recorded.
    pub fn on_delayed_outcome(&self, hook: Rc<dyn Fn()>) {
        *self.delayed_hook.borrow_mut() = Some(hook);
    }

    fn record(&self, event: CoreEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl SchedulerCore for MockCore {
    fn on_continuous_priority_changed(&self, priority: Priority) {
        self.record(CoreEvent::PriorityChanged(priority));
        let hook = self.priority_hook.borrow().clone();
        if let Some(hook) = hook {
            hook(priority);
        }
    }

    fn on_delayed_timeslot_started(&self) {
        self.record(CoreEvent::DelayedStarted);
        call(&self.delayed_hook);
    }

    fn on_delayed_timeslot_failed(&self) {
        self.record(CoreEvent::DelayedFailed);
        call(&self.delayed_hook);
    }

    fn on_timeslot_started(&self) {
        self.record(CoreEvent::TimeslotStarted);
    }

    fn on_timeslot_ended(&self) {
        self.record(CoreEvent::TimeslotEnded);
    }
}
