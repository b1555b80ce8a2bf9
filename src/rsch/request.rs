//! Request driver: brings the preconditions in line with the required
//! priority level.

use super::{
    RadioScheduler, SchedulerConfig,
    api::{Arbiter, HfClock},
    priority::{Precondition, Priority},
};

impl<Config: SchedulerConfig> RadioScheduler<Config> {
    /// Re-computes the required priority level and requests or releases the
    /// preconditions accordingly.
    ///
    /// Runs inside the request critical section. A preempting call that finds
    /// the section occupied returns immediately. The preempted owner then
    /// re-runs the section and picks up the preempting context's change as
    /// the section re-computes everything from shared state.
    ///
    /// Preconditions are only started on a transition from idle and only
    /// released on a transition to idle. Changes between non-idle levels
    /// merely update the requested level: a precondition approves up to the
    /// maximum level once started, and re-issuing the start would make it
    /// approve twice.
    pub(super) fn update_requested_priority(&self) {
        self.req_mutex.run(|| {
            let required = self.required_priority();
            let previous = self.requested.load();

            if required == previous {
                return;
            }

            self.requested.store(required);
            debug!("requested priority {:?} -> {:?}", previous, required);

            if required.is_idle() {
                self.release_preconditions();
            } else if previous.is_idle() {
                self.request_preconditions();
            }
        });
    }

    fn request_preconditions(&self) {
        self.clock.terminate_pending_stop();
        self.clock.start();
        self.arbiter.continuous_mode_enter();
    }

    fn release_preconditions(&self) {
        self.clock.stop();
        self.preconditions.set(Precondition::HfClock, Priority::Idle);
        self.arbiter.continuous_mode_exit();
        self.preconditions.set(Precondition::Arbiter, Priority::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::super::mock::*;
    use super::*;

    #[test]
    fn raising_the_level_does_not_restart_preconditions() {
        let rsch = scheduler();
        rsch.continuous_mode_priority_set(Priority::IdleListening);
        rsch.continuous_mode_priority_set(Priority::Tx);
        rsch.continuous_mode_priority_set(Priority::Rx);

        assert_eq!(rsch.requested_priority(), Priority::Rx);
        assert_eq!(rsch.clock().starts.get(), 1);
        assert_eq!(rsch.arbiter().enters.get(), 1);
        assert_eq!(rsch.clock().stops.get(), 0);
    }

    #[test]
    fn pending_clock_stop_is_terminated_before_restart() {
        let rsch = scheduler();
        rsch.continuous_mode_priority_set(Priority::Rx);
        rsch.continuous_mode_priority_set(Priority::Idle);
        rsch.continuous_mode_priority_set(Priority::Rx);

        assert_eq!(rsch.clock().stops.get(), 1);
        assert_eq!(rsch.clock().terminations.get(), 2);
        assert_eq!(rsch.clock().starts.get(), 2);
        assert_eq!(
            rsch.clock().calls.borrow().as_slice(),
            [
                ClockCall::TerminatePendingStop,
                ClockCall::Start,
                ClockCall::Stop,
                ClockCall::TerminatePendingStop,
                ClockCall::Start,
            ]
        );
    }

    #[test]
    fn synchronous_clock_ready_is_accepted() {
        let rsch = scheduler();
        rsch.clock().on_start(Rc::new(move || rsch.on_hf_clock_ready()));
        rsch.arbiter().on_enter(Rc::new(move || rsch.on_timeslot_started()));

        rsch.continuous_mode_priority_set(Priority::Rx);

        assert_eq!(rsch.approved_priority(), Priority::Rx);
        assert_eq!(
            rsch.core().events(),
            [
                CoreEvent::PriorityChanged(Priority::Rx),
                CoreEvent::TimeslotStarted,
            ]
        );
    }

    #[test]
    fn preempting_release_is_applied_by_the_preempted_request() {
        let rsch = scheduler();
        // A higher-priority context leaves continuous mode while the clock is
        // being requested.
        let preempted = Rc::new(std::cell::Cell::new(false));
        rsch.clock().on_start({
            let preempted = preempted.clone();
            Rc::new(move || {
                if !preempted.replace(true) {
                    rsch.continuous_mode_priority_set(Priority::Idle);
                    // The preempting context found the section occupied.
                    assert_eq!(rsch.requested_priority(), Priority::Rx);
                }
            })
        });

        rsch.continuous_mode_priority_set(Priority::Rx);

        assert!(preempted.get());
        assert_eq!(rsch.requested_priority(), Priority::Idle);
        assert_eq!(rsch.clock().starts.get(), 1);
        assert_eq!(rsch.clock().stops.get(), 1);
        assert_eq!(rsch.arbiter().enters.get(), 1);
        assert_eq!(rsch.arbiter().exits.get(), 1);
        assert!(!rsch.req_mutex.is_locked());
    }

    #[test]
    fn preempting_request_is_applied_by_the_preempted_release() {
        let rsch = scheduler();
        rsch.continuous_mode_priority_set(Priority::Rx);

        let preempted = Rc::new(std::cell::Cell::new(false));
        rsch.clock().on_stop({
            let preempted = preempted.clone();
            Rc::new(move || {
                if !preempted.replace(true) {
                    rsch.continuous_mode_priority_set(Priority::Tx);
                }
            })
        });

        rsch.continuous_mode_priority_set(Priority::Idle);

        assert_eq!(rsch.continuous_priority(), Priority::Tx);
        assert_eq!(rsch.requested_priority(), Priority::Tx);
        assert_eq!(rsch.clock().starts.get(), 2);
        assert_eq!(rsch.arbiter().enters.get(), 2);
        assert_eq!(rsch.arbiter().exits.get(), 1);
    }
}
