//! Entry/exit tracing of scheduler operations.
//!
//! With the `rtos-trace` feature enabled, every public operation and external
//! notification of the scheduler is bracketed by an `rtos-trace` marker so
//! that preemption between them becomes visible in the trace. Without the
//! feature this compiles to nothing.

/// Marker IDs of traced scheduler functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TracePoint {
    ContinuousEnter = 0x100,
    ContinuousExit,
    DelayedTimeslotRequest,
    TimerDelayedPrec,
    TimerDelayedStart,
    TimeslotStarted,
    TimeslotEnded,
    HfClockReady,
    CriticalSectionExit,
}

/// Marks the beginning of a traced function and ends the marker when dropped.
#[must_use = "Ends the trace marker when dropped."]
pub struct TraceScope {
    #[cfg(feature = "rtos-trace")]
    point: TracePoint,
}

impl TraceScope {
    #[inline(always)]
    pub fn enter(point: TracePoint) -> Self {
        #[cfg(feature = "rtos-trace")]
        {
            rtos_trace::trace::marker_begin(point as u32);
            Self { point }
        }
        #[cfg(not(feature = "rtos-trace"))]
        {
            let _ = point;
            Self {}
        }
    }
}

impl Drop for TraceScope {
    #[inline(always)]
    fn drop(&mut self) {
        #[cfg(feature = "rtos-trace")]
        rtos_trace::trace::marker_end(self.point as u32);
    }
}
