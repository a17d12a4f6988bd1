//! Core types shared by patterns, LED objects and the engine.

/// Electrical level of an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Pin driven low.
    Low,

    /// Pin driven high.
    High,
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

/// How many times a pattern should repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopCount {
    /// Repeat a specific number of times. `Finite(0)` is already exhausted.
    Finite(u32),

    /// Repeat indefinitely.
    Infinite,
}

impl LoopCount {
    /// Returns true when no repeats are left.
    #[inline]
    pub const fn is_exhausted(self) -> bool {
        matches!(self, LoopCount::Finite(0))
    }

    /// Counts one finished sweep. Infinite and exhausted counts are unchanged.
    #[inline]
    pub(crate) const fn decrement(self) -> Self {
        match self {
            LoopCount::Finite(n) if n > 0 => LoopCount::Finite(n - 1),
            other => other,
        }
    }
}

/// Signed loop counts as used by shell front-ends: negative means forever.
impl From<i32> for LoopCount {
    fn from(count: i32) -> Self {
        if count < 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Finite(count as u32)
        }
    }
}

/// Handle to an LED object owned by a [`LedEngine`](crate::LedEngine).
///
/// Handles carry a generation so a handle kept after `delete` is rejected
/// even once its slot has been reused, and the tag of the engine that issued
/// them so another engine rejects them too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedId {
    pub(crate) engine: u32,
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl LedId {
    /// Slot index inside the engine.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl core::fmt::Display for LedId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "led#{}", self.index)
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    /// The engine has been shut down and not re-initialized.
    NotInitialized,

    /// Pattern text contains no elements, or a pattern array is empty.
    InvalidPattern,

    /// The pattern exceeds the buffer capacity, or every LED slot is taken.
    OutOfMemory,

    /// `start` on an LED that is already running.
    AlreadyActive,

    /// `start` on an LED without a pattern.
    NoPattern,

    /// The handle does not refer to a live LED object of this engine.
    InvalidState,
}

impl core::fmt::Display for LedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LedError::NotInitialized => write!(f, "engine is not initialized"),
            LedError::InvalidPattern => write!(f, "pattern is empty or malformed"),
            LedError::OutOfMemory => write!(f, "no capacity left for pattern or LED object"),
            LedError::AlreadyActive => write!(f, "LED is already running"),
            LedError::NoPattern => write!(f, "LED has no pattern to run"),
            LedError::InvalidState => write!(f, "handle does not refer to a live LED"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LedError {}
