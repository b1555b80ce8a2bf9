use core::{
    mem::ManuallyDrop,
    sync::atomic::{AtomicBool, AtomicU8, Ordering, compiler_fence},
};

/// Non-blocking mutex for critical sections shared between execution contexts
/// (Thread or Handler mode) running _on a single core_ that may preempt each
/// other at arbitrary instruction boundaries.
///
/// A context that fails to acquire the mutex must never wait for it: a
/// higher-priority context holding the mutex cannot exist (it would have run
/// to completion before we were resumed) and a lower-priority holder will not
/// resume before we return. Waiting would therefore dead-lock.
///
/// Instead, the losing context increments the contention monitor and gives up.
/// The winning context checks the monitor before returning and re-runs its
/// critical section if it changed, thereby executing the work of the losing
/// context on its behalf. Critical sections must therefore be idempotent and
/// re-compute their effect from shared state on every run.
///
/// The number of re-runs is bounded by the number of preempting contexts, as
/// every re-run corresponds to a completed foreign attempt.
///
/// # Safety
///
/// This is a safe abstraction: it does not protect any data itself. The
/// shared state touched by the critical section must be `Sync` on its own
/// (usually atomics).
///
/// Writes inside the critical section are released before the mutex is
/// observed unlocked and acquired by the next owner.
pub struct RetryMutex {
    /// Set while some context executes the critical section.
    locked: AtomicBool,

    /// Incremented on every failed lock attempt. Wraps, only changes are
    /// significant.
    monitor: AtomicU8,
}

/// Tells the owner of a [`RetryMutexGuard`] whether some other context gave up
/// entering the critical section while the guard was held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unlocked {
    /// Nobody tried to enter in the meantime.
    Uncontended,

    /// Some context failed to lock the mutex and relies on the owner to re-run
    /// the critical section.
    RetryOwed,
}

impl RetryMutex {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            monitor: AtomicU8::new(0),
        }
    }

    /// Tries to lock the mutex. Never blocks.
    ///
    /// Increments the contention monitor and returns [`None`] if the mutex is
    /// already locked.
    pub fn try_lock(&self) -> Option<RetryMutexGuard<'_>> {
        compiler_fence(Ordering::Release);
        if self.locked.swap(true, Ordering::Acquire) {
            self.monitor.fetch_add(1, Ordering::Relaxed);
            compiler_fence(Ordering::Release);
            return None;
        }
        compiler_fence(Ordering::Acquire);

        // Preemption between the swap and this load will go unnoticed. The
        // preempting context's attempt is then covered by the section we are
        // about to run anyway.
        let monitor = self.monitor.load(Ordering::Relaxed);
        Some(RetryMutexGuard {
            mutex: self,
            monitor,
        })
    }

    /// Runs the critical section until it completed without contention.
    ///
    /// Returns [`None`] if the mutex was held by a preempted context, which
    /// will then re-run the section on our behalf. Returns the result of the
    /// last run otherwise.
    pub fn run<T>(&self, mut section: impl FnMut() -> T) -> Option<T> {
        loop {
            let guard = self.try_lock()?;
            let result = section();
            match guard.unlock() {
                Unlocked::Uncontended => return Some(result),
                Unlocked::RetryOwed => trace!("retry mutex contended, re-running section"),
            }
        }
    }

    /// Returns the current contention monitor value.
    pub fn monitor(&self) -> u8 {
        self.monitor.load(Ordering::Relaxed)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Forces the mutex into its initial state.
    ///
    /// Must only be called while no context can possibly be inside the
    /// critical section, i.e. during initialization.
    pub fn reset(&self) {
        compiler_fence(Ordering::Release);
        self.locked.store(false, Ordering::Relaxed);
        self.monitor.store(0, Ordering::Relaxed);
    }

    fn release(&self) {
        compiler_fence(Ordering::Release);
        self.locked.store(false, Ordering::Release);
    }
}

impl Default for RetryMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents ownership of the critical section. Dropping the guard unlocks
/// the mutex without checking for contention.
///
/// Note: This type is [!Send](`Send`) in spirit: it must be dropped by the
/// context that locked the mutex.
#[must_use = "Unlocks the mutex when dropped."]
pub struct RetryMutexGuard<'mutex> {
    mutex: &'mutex RetryMutex,

    /// Monitor value observed right after locking.
    monitor: u8,
}

impl RetryMutexGuard<'_> {
    /// Unlocks the mutex and reports whether a re-run is owed to contexts that
    /// failed to lock it in the meantime.
    pub fn unlock(self) -> Unlocked {
        let this = ManuallyDrop::new(self);
        this.mutex.release();
        compiler_fence(Ordering::Acquire);
        if this.mutex.monitor.load(Ordering::Relaxed) == this.monitor {
            Unlocked::Uncontended
        } else {
            Unlocked::RetryOwed
        }
    }
}

impl Drop for RetryMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn uncontended_section_runs_once() {
        let mutex = RetryMutex::new();
        let runs = Cell::new(0);

        let result = mutex.run(|| {
            runs.set(runs.get() + 1);
            runs.get()
        });

        assert_eq!(result, Some(1));
        assert_eq!(runs.get(), 1);
        assert!(!mutex.is_locked());
        assert_eq!(mutex.monitor(), 0);
    }

    #[test]
    fn failed_lock_increments_monitor() {
        let mutex = RetryMutex::new();
        let guard = mutex.try_lock().unwrap();

        assert!(mutex.try_lock().is_none());
        assert!(mutex.try_lock().is_none());
        assert_eq!(mutex.monitor(), 2);

        assert_eq!(guard.unlock(), Unlocked::RetryOwed);
        assert!(!mutex.is_locked());
    }

    #[test]
    fn dropped_guard_unlocks() {
        let mutex = RetryMutex::new();
        drop(mutex.try_lock().unwrap());
        assert!(!mutex.is_locked());
        assert_eq!(mutex.try_lock().unwrap().unlock(), Unlocked::Uncontended);
    }

    #[test]
    fn preempted_section_is_re_run_by_the_owner() {
        let mutex = RetryMutex::new();
        let runs = Cell::new(0);
        let preempting_result = Cell::new(Some(()));

        mutex.run(|| {
            runs.set(runs.get() + 1);
            if runs.get() == 1 {
                // Simulate an interrupt trying to enter the same section while
                // we are inside: it must give up immediately.
                preempting_result.set(mutex.run(|| unreachable!()));
            }
        });

        assert_eq!(preempting_result.get(), None);
        assert_eq!(runs.get(), 2);
        assert!(!mutex.is_locked());
    }

    #[test]
    fn every_preemption_is_covered_by_a_re_run() {
        let mutex = RetryMutex::new();
        let runs = Cell::new(0u32);

        mutex.run(|| {
            runs.set(runs.get() + 1);
            // Nested preemption in the first two runs.
            if runs.get() <= 2 {
                assert!(mutex.run(|| ()).is_none());
            }
        });

        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn monitor_wraps() {
        let mutex = RetryMutex::new();
        let guard = mutex.try_lock().unwrap();
        for _ in 0..256 {
            assert!(mutex.try_lock().is_none());
        }
        // A full wrap is indistinguishable from no contention. The number of
        // preempting priority levels is far below that.
        assert_eq!(guard.unlock(), Unlocked::Uncontended);
    }
}
