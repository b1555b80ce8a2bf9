//! Aggregation of requested and approved priority levels.

use super::{
    RadioScheduler, SchedulerConfig,
    priority::{AtomicPriority, Precondition, Priority},
};

/// Priority level approved by each precondition, indexed by
/// [`Precondition`].
pub(super) struct PreconditionRegistry([AtomicPriority; Precondition::COUNT]);

impl PreconditionRegistry {
    pub(super) const fn new() -> Self {
        Self([const { AtomicPriority::new(Priority::Idle) }; Precondition::COUNT])
    }

    pub(super) fn get(&self, precondition: Precondition) -> Priority {
        self.0[precondition as usize].load()
    }

    pub(super) fn set(&self, precondition: Precondition, priority: Priority) {
        self.0[precondition as usize].store(priority);
    }

    pub(super) fn reset(&self) {
        for approval in &self.0 {
            approval.store(Priority::Idle);
        }
    }
}

impl<Config: SchedulerConfig> RadioScheduler<Config> {
    /// Priority level that should currently be requested from all
    /// preconditions: the maximum of the continuous mode level and the
    /// delayed timeslot level if its pre-request window is open.
    pub(super) fn required_priority(&self) -> Priority {
        let delayed = self.delayed_window_priority(self.now());
        delayed.max(self.continuous.load())
    }

    /// Returns the priority level approved by the given precondition, capped
    /// at the requested level.
    ///
    /// A precondition may keep reporting a level it approved earlier, e.g. a
    /// running clock after the request was lowered. Only the part of the
    /// approval that is actually requested counts.
    pub fn precondition_approval(&self, precondition: Precondition) -> Priority {
        self.preconditions
            .get(precondition)
            .min(self.requested.load())
    }

    /// Returns the priority level approved by all preconditions.
    pub fn approved_priority(&self) -> Priority {
        Precondition::ALL
            .into_iter()
            .map(|precondition| self.precondition_approval(precondition))
            .min()
            .unwrap_or(Priority::Idle)
    }

    /// Records the approval of a precondition.
    ///
    /// Approvals arriving while nothing is requested are stale (e.g. a clock
    /// started event racing with its stop) and dropped.
    pub(super) fn set_precondition_approval(&self, precondition: Precondition, priority: Priority) {
        if !priority.is_idle() && self.requested.load().is_idle() {
            trace!(
                "dropping stale approval {:?} of {:?}",
                priority, precondition
            );
            return;
        }

        debug_assert!(
            priority.is_idle() || self.preconditions.get(precondition) != priority,
            "duplicate approval"
        );

        self.preconditions.set(precondition, priority);
    }
}
