use core::sync::atomic::{AtomicU8, Ordering, compiler_fence};

/// Radio activity priority levels, totally ordered.
///
/// [`Priority::Idle`] means that no request is being made. Any other level is
/// a genuine request that must eventually be granted or withdrawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    /// Nothing requested.
    Idle = 0,
    /// Listening for incoming frames while nothing else is going on.
    IdleListening,
    /// Active reception, e.g. of an ACK, energy detection or CCA.
    Rx,
    /// Transmission. This is the highest level.
    Tx,
}

impl Priority {
    pub const MIN: Self = Self::Idle;
    pub const MAX: Self = Self::Tx;

    #[inline]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Const conversion from u8.
    pub const fn try_from_u8(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::IdleListening),
            2 => Ok(Self::Rx),
            3 => Ok(Self::Tx),
            _ => Err(()),
        }
    }

    /// Const conversion to u8.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.as_u8()
    }
}

/// Radio activity preconditions. All of them must grant access before the
/// driver core may use the RADIO peripheral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Precondition {
    /// The high-frequency clock is running and stable.
    HfClock = 0,
    /// The radio arbiter granted exclusive access to the RADIO peripheral.
    Arbiter,
}

impl Precondition {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::HfClock, Self::Arbiter];
}

/// A [`Priority`] that can be shared between execution contexts.
///
/// # Safety
///
/// As we are on a single core we don't need CPU memory barriers. Relaxed
/// access plus compiler fences are sufficient to acquire/release surrounding
/// memory.
#[repr(transparent)]
pub(crate) struct AtomicPriority(AtomicU8);

impl AtomicPriority {
    pub(crate) const fn new(priority: Priority) -> Self {
        Self(AtomicU8::new(priority.as_u8()))
    }

    #[inline]
    pub(crate) fn load(&self) -> Priority {
        let value = self.0.load(Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        Self::from_stored(value)
    }

    #[inline]
    pub(crate) fn store(&self, priority: Priority) {
        compiler_fence(Ordering::Release);
        self.0.store(priority.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn swap(&self, priority: Priority) -> Priority {
        compiler_fence(Ordering::Release);
        let previous = self.0.swap(priority.as_u8(), Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        Self::from_stored(previous)
    }

    #[inline]
    fn from_stored(value: u8) -> Priority {
        match Priority::try_from_u8(value) {
            Ok(priority) => priority,
            // Only valid priorities are ever stored.
            Err(_) => unreachable!(),
        }
    }
}
