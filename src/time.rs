//! Tick counter abstraction with wrap-safe deadline comparison.

/// A reading of a free-running 32-bit tick counter.
///
/// The counter wraps to zero after [`Tick::MAX`]. Deadlines are compared with
/// wrapping arithmetic, so ordering between two ticks is only meaningful when
/// they are less than half the counter range apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick(pub u32);

impl Tick {
    /// Largest value the counter reaches before wrapping.
    pub const MAX: u32 = u32::MAX;

    /// Creates a tick from a raw counter value.
    #[inline]
    pub const fn new(ticks: u32) -> Self {
        Tick(ticks)
    }

    /// Returns the raw counter value.
    #[inline]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Returns the tick `delta` ticks after this one, wrapping on overflow.
    #[inline]
    pub const fn wrapping_add(self, delta: u32) -> Self {
        Tick(self.0.wrapping_add(delta))
    }

    /// Ticks elapsed from `earlier` to `self`, modulo the counter width.
    #[inline]
    pub const fn wrapping_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Returns true once `now` has reached this tick used as a deadline.
    ///
    /// The deadline counts as reached while the wrapped distance from it to
    /// `now` lies in the lower half of the counter range. A plain `now >= self`
    /// would stall forever once the counter wraps past a stored deadline.
    #[inline]
    pub const fn is_due(self, now: Tick) -> bool {
        now.wrapping_since(self) < Self::MAX / 2
    }
}

/// Trait for abstracting the tick counter.
pub trait TimeSource {
    /// Returns the current counter value.
    fn now(&self) -> Tick;

    /// Converts a duration in milliseconds to ticks.
    ///
    /// The default assumes a 1 kHz counter.
    fn ticks_from_millis(&self, millis: u32) -> u32 {
        millis
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Tick {
        (**self).now()
    }

    fn ticks_from_millis(&self, millis: u32) -> u32 {
        (**self).ticks_from_millis(millis)
    }
}

/// Converts milliseconds to ticks of a counter running at `tick_hz`.
///
/// Rounds up so a non-zero duration never becomes zero ticks, and saturates at
/// `u32::MAX`.
pub const fn ticks_from_millis_at(tick_hz: u32, millis: u32) -> u32 {
    let ticks = (tick_hz as u64 * millis as u64).div_ceil(1000);
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_in_the_past_is_due() {
        assert!(Tick(100).is_due(Tick(100)));
        assert!(Tick(100).is_due(Tick(150)));
    }

    #[test]
    fn deadline_in_the_future_is_not_due() {
        assert!(!Tick(100).is_due(Tick(99)));
        assert!(!Tick(100).is_due(Tick(0)));
    }

    #[test]
    fn due_check_survives_counter_wrap() {
        let start = Tick(u32::MAX - 49);
        let deadline = start.wrapping_add(100);
        assert_eq!(deadline, Tick(50));

        assert!(!deadline.is_due(start));
        assert!(!deadline.is_due(Tick(u32::MAX)));
        assert!(!deadline.is_due(Tick(49)));
        assert!(deadline.is_due(Tick(50)));
        assert!(deadline.is_due(Tick(51)));
    }

    #[test]
    fn plain_comparison_would_stall_after_wrap() {
        // deadline set just before wrap, checked just after
        let deadline = Tick(u32::MAX - 10);
        let now = Tick(5);
        assert!(now.0 < deadline.0);
        assert!(deadline.is_due(now));
    }

    #[test]
    fn millis_conversion_rounds_up() {
        assert_eq!(ticks_from_millis_at(1000, 5), 5);
        assert_eq!(ticks_from_millis_at(100, 5), 1);
        assert_eq!(ticks_from_millis_at(32_768, 1), 33);
        assert_eq!(ticks_from_millis_at(1_000_000, 0), 0);
        assert_eq!(ticks_from_millis_at(u32::MAX, u32::MAX), u32::MAX);
    }
}
