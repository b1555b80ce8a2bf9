//! Hooks into the radio driver's state machine.
//!
//! MAC features like CSMA-CA or the ACK timeout need to observe and
//! occasionally veto transitions of the driver core's state machine. They do
//! so by implementing [`FsmHook`]. The core calls all hooks registered in an
//! [`FsmHooks`] list in order.

/// Severity of a termination request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TermLevel {
    /// Terminate only operations that do not belong to an ongoing
    /// IEEE 802.15.4 procedure.
    None,
    /// Also terminate ongoing IEEE 802.15.4 procedures.
    Ieee802154,
}

/// Reasons for a failed transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    BusyChannel,
    InvalidAck,
    NoMem,
    TimeslotEnded,
    NoAck,
    Aborted,
    TimeslotDenied,
}

/// A state machine hook. All methods accept by default so that a hook only
/// implements what it cares about.
pub trait FsmHook {
    /// The core is about to terminate the current operation. Returning
    /// `false` refuses termination at the given level.
    fn abort(&self, _level: TermLevel) -> bool {
        true
    }

    /// A frame was transmitted.
    fn on_transmitted(&self, _frame: &[u8]) {}

    /// Transmission of a frame failed. Returning `false` means the hook took
    /// over the failure (e.g. to retry) and the core must not report it.
    fn on_tx_failed(&self, _frame: &[u8], _error: TxError) -> bool {
        true
    }

    /// Transmission of a frame is about to start. Returning `false` prevents
    /// the transmission.
    fn on_tx_started(&self, _frame: &[u8]) -> bool {
        true
    }
}

/// An ordered list of hooks.
///
/// Vetoable notifications stop at the first hook that vetoes.
#[derive(Clone, Copy)]
pub struct FsmHooks<'hooks> {
    hooks: &'hooks [&'hooks dyn FsmHook],
}

impl<'hooks> FsmHooks<'hooks> {
    pub const fn new(hooks: &'hooks [&'hooks dyn FsmHook]) -> Self {
        Self { hooks }
    }

    pub const fn empty() -> Self {
        Self { hooks: &[] }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn terminate(&self, level: TermLevel) -> bool {
        self.hooks.iter().all(|hook| hook.abort(level))
    }

    pub fn transmitted(&self, frame: &[u8]) {
        for hook in self.hooks {
            hook.on_transmitted(frame);
        }
    }

    pub fn tx_failed(&self, frame: &[u8], error: TxError) -> bool {
        self.hooks.iter().all(|hook| hook.on_tx_failed(frame, error))
    }

    pub fn tx_started(&self, frame: &[u8]) -> bool {
        self.hooks.iter().all(|hook| hook.on_tx_started(frame))
    }
}

impl Default for FsmHooks<'_> {
    fn default() -> Self {
        Self::empty()
    }
}
