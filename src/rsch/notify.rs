//! Notifier: reports changes of the approved priority level to the core.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering, compiler_fence};

use super::{RadioScheduler, SchedulerConfig, api::SchedulerCore, priority::Priority};

impl<Config: SchedulerConfig> RadioScheduler<Config> {
    /// Notifies the core if the approved priority level changed since the last
    /// notification while continuous mode is active.
    ///
    /// Runs inside the notify critical section so that each distinct level is
    /// reported exactly once even if notifications race.
    pub(super) fn notify_core(&self) {
        self.ntf_mutex.run(|| {
            // Reset even while deferred, a re-entry must be reported again.
            if self.continuous.load().is_idle() {
                self.last_notified.store(Priority::Idle);
                return;
            }

            if self.critical_section.defer_notification() {
                return;
            }

            let approved = self.approved_priority();
            if approved != self.last_notified.load() {
                self.last_notified.store(approved);
                debug!("approved priority changed to {:?}", approved);
                self.core.on_continuous_priority_changed(approved);
            }
        });
    }
}

/// Nesting counter of the core's critical section.
///
/// Notifications requested while the section is active are deferred until
/// the outermost section is left.
pub(super) struct CriticalSection {
    depth: AtomicU8,
    pending: AtomicBool,
}

impl CriticalSection {
    pub(super) const fn new() -> Self {
        Self {
            depth: AtomicU8::new(0),
            pending: AtomicBool::new(false),
        }
    }

    pub(super) fn is_active(&self) -> bool {
        let active = self.depth.load(Ordering::Relaxed) > 0;
        compiler_fence(Ordering::Acquire);
        active
    }

    pub(super) fn enter(&self) {
        compiler_fence(Ordering::Release);
        let previous = self.depth.fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous < u8::MAX, "critical section nested too deep");
        compiler_fence(Ordering::Acquire);
    }

    /// Leaves one nesting level. Returns `true` if the outermost section was
    /// left and a notification was deferred in the meantime.
    pub(super) fn exit(&self) -> bool {
        compiler_fence(Ordering::Release);
        let previous = self.depth.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "critical section exited without enter");
        compiler_fence(Ordering::Acquire);

        previous == 1 && self.pending.swap(false, Ordering::Relaxed)
    }

    /// Returns `true` if a notification must be deferred, after marking it as
    /// pending.
    pub(super) fn defer_notification(&self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.pending.store(true, Ordering::Relaxed);
        compiler_fence(Ordering::SeqCst);

        // The section may have been left in between, in which case nobody
        // will pick up the pending flag. Notify right away instead.
        if self.is_active() {
            true
        } else {
            self.pending.store(false, Ordering::Relaxed);
            false
        }
    }

    pub(super) fn reset(&self) {
        self.depth.store(0, Ordering::Relaxed);
        self.pending.store(false, Ordering::Relaxed);
    }
}
