//! Radio precondition scheduler.
//!
//! Before the radio driver core may touch the RADIO peripheral, several
//! independent preconditions have to grant access at a sufficient priority
//! level: the high-frequency clock must be running and the radio arbiter must
//! have granted a timeslot. The [`RadioScheduler`] requests those
//! preconditions on behalf of the core, either continuously or ahead of a
//! delayed timeslot, aggregates their grants and notifies the core.
//!
//! All entry points may be called from interrupt handlers running at
//! arbitrary priorities on a single core. Nothing in this crate blocks.
//!
//! [`RadioScheduler`]: rsch::RadioScheduler

#![cfg_attr(not(test), no_std)]

// This must go first so that the macros are visible in all other modules.
mod fmt;

pub mod driver;
pub mod hooks;
pub mod rsch;
pub mod time;
pub mod trace;
pub mod util;

pub use rsch::{
    Arbiter, HfClock, Precondition, Priority, RadioScheduler, SchedulerConfig, SchedulerCore,
    SchedulerTimer,
};
pub use time::{TimerError, UsDuration, UsInstant};
