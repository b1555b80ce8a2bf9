//! Precondition collaborators.
//!
//! - [`arbiter`] contains a platform-independent arbiter for radios that are
//!   not shared with other protocols.
//! - [`socs`] contains SoC-specific collaborators, currently the nRF52840
//!   high-frequency clock.

pub mod arbiter;
pub mod socs;

pub use arbiter::SinglePhyArbiter;
