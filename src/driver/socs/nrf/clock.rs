//! High-frequency clock precondition for nRF SoCs.

use core::sync::atomic::{AtomicBool, Ordering, compiler_fence};

use cortex_m::peripheral::{NVIC, Peripherals as CorePeripherals};
use nrf_pac::{CLOCK, clock::vals::HfclkstatSrc, interrupt};

use crate::rsch::HfClock;

use super::nvic_priority;

/// Drives the HFXO through the CLOCK peripheral.
///
/// The application must forward the `CLOCK_POWER` interrupt to
/// [`NrfHfClock::on_clock_interrupt()`] and the `EGU1_SWI1` interrupt to
/// [`NrfHfClock::on_stop_interrupt()`].
///
/// Stopping the clock is deferred to the low-priority software interrupt so
/// that it may be canceled by an immediately following start request, e.g.
/// when one radio operation follows another.
pub struct NrfHfClock {
    /// Called from interrupt context once the HFXO is running.
    on_ready: fn(),

    /// Set while a deferred stop has not been executed yet.
    stop_pending: AtomicBool,
}

impl NrfHfClock {
    /// Must be higher than the priority of any context requesting the clock
    /// so that readiness is reported promptly.
    const CLOCK_INT_PRIO: u8 = nvic_priority(7);

    /// Lowest interrupt priority: the stop is executed once everything else
    /// is done.
    const STOP_INT_PRIO: u8 = nvic_priority(1);

    pub const fn new(on_ready: fn()) -> Self {
        Self {
            on_ready,
            stop_pending: AtomicBool::new(false),
        }
    }

    /// Configures and unmasks the clock interrupts.
    pub fn init(&self) {
        CLOCK.intenclr().write(|w| w.set_hfclkstarted(true));
        CLOCK.events_hfclkstarted().write_value(0);
        self.stop_pending.store(false, Ordering::Relaxed);

        // Safety: We don't rely on priority masking for synchronization.
        let mut nvic = unsafe { CorePeripherals::steal() }.NVIC;
        unsafe {
            nvic.set_priority(interrupt::CLOCK_POWER, Self::CLOCK_INT_PRIO);
            nvic.set_priority(interrupt::EGU1_SWI1, Self::STOP_INT_PRIO);
        };

        NVIC::unpend(interrupt::CLOCK_POWER);
        NVIC::unpend(interrupt::EGU1_SWI1);

        // Safety: We don't rely on interrupt masking for synchronization.
        unsafe { NVIC::unmask(interrupt::CLOCK_POWER) };
        unsafe { NVIC::unmask(interrupt::EGU1_SWI1) };
    }

    pub fn is_running(&self) -> bool {
        CLOCK.hfclkstat().read().src() == HfclkstatSrc::XTAL
    }

    /// Handles the `HFCLKSTARTED` event.
    pub fn on_clock_interrupt(&self) {
        if CLOCK.events_hfclkstarted().read() == 0 {
            return;
        }

        CLOCK.events_hfclkstarted().write_value(0);
        CLOCK.intenclr().write(|w| w.set_hfclkstarted(true));
        (self.on_ready)();
    }

    /// Executes a deferred stop unless it was terminated in the meantime.
    pub fn on_stop_interrupt(&self) {
        if self.stop_pending.swap(false, Ordering::Relaxed) {
            compiler_fence(Ordering::Acquire);
            CLOCK.tasks_hfclkstop().write_value(0x1);
            trace!("HFXO stopped");
        }
    }
}

impl HfClock for NrfHfClock {
    fn start(&self) {
        if self.is_running() && CLOCK.events_hfclkstarted().read() == 0 {
            // Still running, e.g. due to a terminated stop. The start task
            // will not produce another event.
            (self.on_ready)();
            return;
        }

        CLOCK.intenset().write(|w| w.set_hfclkstarted(true));
        CLOCK.tasks_hfclkstart().write_value(0x1);
    }

    fn stop(&self) {
        CLOCK.intenclr().write(|w| w.set_hfclkstarted(true));
        compiler_fence(Ordering::Release);
        self.stop_pending.store(true, Ordering::Relaxed);
        NVIC::pend(interrupt::EGU1_SWI1);
    }

    fn terminate_pending_stop(&self) {
        self.stop_pending.store(false, Ordering::Relaxed);
        compiler_fence(Ordering::Release);
    }
}
