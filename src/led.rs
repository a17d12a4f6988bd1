//! LED objects: pin group, pattern, loop state and timing state.
//!
//! Defines the [`LedPin`] hardware trait and the per-object step algorithm the
//! engine runs on every poll. Objects themselves live inside a
//! [`LedEngine`](crate::LedEngine) and are reached through [`LedId`] handles.
//!
//! An object drives a group of up to `PINS` pins. Every pin follows the same
//! pattern, each with its own active logic, so an active-high and an
//! active-low LED can blink in step.

use crate::pattern::Pattern;
use crate::time::{Tick, TimeSource};
use crate::types::{LedError, LedId, Level, LoopCount};
use embedded_hal::digital::StatefulOutputPin;
use heapless::Vec;

/// Trait for abstracting a GPIO-like output pin.
///
/// Implementations must not block. Handle any hardware errors internally -
/// these methods cannot fail.
pub trait LedPin {
    /// Puts the pin into output mode.
    fn configure_output(&mut self);

    /// Drives the pin to `level`.
    fn write(&mut self, level: Level);

    /// Returns the level the pin is currently driven to.
    fn read(&mut self) -> Level;
}

/// Adapts an embedded-hal output pin.
///
/// embedded-hal pins are configured as outputs by their type, so
/// `configure_output` does nothing. Write errors are dropped and a failed
/// read reports `Low`.
#[derive(Debug)]
pub struct HalPin<P>(pub P);

impl<P: StatefulOutputPin> LedPin for HalPin<P> {
    fn configure_output(&mut self) {}

    fn write(&mut self, level: Level) {
        let _ = match level {
            Level::High => self.0.set_high(),
            Level::Low => self.0.set_low(),
        };
    }

    fn read(&mut self) -> Level {
        self.0.is_set_high().map(Level::from).unwrap_or(Level::Low)
    }
}

/// Invoked once when an LED finishes its last loop.
pub type CompleteCallback = fn(LedId);

/// Invoked with the logical state (`true` = lit) every time the engine
/// drives an LED's pins.
pub type ChangeCallback = fn(LedId, bool);

/// Snapshot of an LED object's scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedStatus {
    pub active: bool,
    pub lit: bool,
    pub pin_count: usize,
    pub pattern_len: usize,
    pub owns_pattern: bool,
    pub cursor: usize,
    pub loop_target: LoopCount,
    pub loop_remaining: LoopCount,
    pub deadline: Tick,
}

pub(crate) struct Led<'a, P: LedPin, const N: usize, const PINS: usize> {
    pins: Vec<(P, Level), PINS>,
    pattern: Option<Pattern<'a, N>>,
    cursor: usize,
    loop_target: LoopCount,
    loop_remaining: LoopCount,
    deadline: Tick,
    lit: bool,
    pub(crate) active: bool,
    pub(crate) on_complete: Option<CompleteCallback>,
    pub(crate) on_change: Option<ChangeCallback>,
}

impl<'a, P: LedPin, const N: usize, const PINS: usize> Led<'a, P, N, PINS> {
    /// Creates an idle, unlit object without pins.
    pub(crate) fn new(pattern: Option<Pattern<'a, N>>, loop_target: LoopCount, now: Tick) -> Self {
        Self {
            pins: Vec::new(),
            pattern,
            cursor: 0,
            loop_target,
            loop_remaining: loop_target,
            deadline: now,
            lit: false,
            active: false,
            on_complete: None,
            on_change: None,
        }
    }

    /// Configures the pin as output, drives it to the group's current state
    /// and appends it. Returns its position in the group.
    ///
    /// A full group is rejected before the pin is touched.
    pub(crate) fn add_pin(&mut self, mut pin: P, active_logic: Level) -> Result<usize, LedError> {
        if self.pins.is_full() {
            return Err(LedError::OutOfMemory);
        }

        pin.configure_output();
        pin.write(level_for(self.lit, active_logic));
        self.pins
            .push((pin, active_logic))
            .map_err(|_| LedError::OutOfMemory)?;
        Ok(self.pins.len() - 1)
    }

    /// Removes the pin at `index`, leaving its level as is. Later pins move
    /// down one position.
    pub(crate) fn del_pin(&mut self, index: usize) -> Result<P, LedError> {
        if index >= self.pins.len() {
            return Err(LedError::InvalidState);
        }
        Ok(self.pins.remove(index).0)
    }

    pub(crate) fn into_pins(self) -> Vec<P, PINS> {
        self.pins.into_iter().map(|(pin, _)| pin).collect()
    }

    pub(crate) fn has_pattern(&self) -> bool {
        self.pattern.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Rewinds to the first step of the first loop, due immediately.
    pub(crate) fn rewind(&mut self, now: Tick) {
        self.cursor = 0;
        self.loop_remaining = self.loop_target;
        self.deadline = now;
    }

    /// Replaces the pattern (if given) and loop target, then rewinds.
    pub(crate) fn reconfigure(
        &mut self,
        pattern: Option<Pattern<'a, N>>,
        loop_target: LoopCount,
        now: Tick,
    ) {
        if let Some(pattern) = pattern {
            self.pattern = Some(pattern);
        }
        self.loop_target = loop_target;
        self.rewind(now);
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.loop_remaining.is_exhausted()
    }

    /// Advances the pattern if its deadline has passed.
    ///
    /// Returns the logical state written to the pins, if any. At most one
    /// state is written per call.
    pub(crate) fn advance<T: TimeSource + ?Sized>(&mut self, now: Tick, time_source: &T) -> Option<bool> {
        if !self.deadline.is_due(now) {
            return None;
        }

        let steps = self.pattern.as_ref().map(Pattern::as_slice).unwrap_or(&[]);

        while self.cursor < steps.len() && steps[self.cursor] == 0 {
            self.cursor += 1;
        }

        if self.cursor < steps.len() {
            let lit = self.cursor % 2 == 0;
            let hold = steps[self.cursor];
            self.cursor += 1;
            self.deadline = now.wrapping_add(time_source.ticks_from_millis(hold));
            self.drive(lit);
            Some(lit)
        } else {
            self.cursor = 0;
            self.loop_remaining = self.loop_remaining.decrement();
            None
        }
    }

    fn drive(&mut self, lit: bool) {
        for (pin, active_logic) in self.pins.iter_mut() {
            pin.write(level_for(lit, *active_logic));
        }
        self.lit = lit;
    }

    pub(crate) fn on(&mut self) -> bool {
        self.drive(true);
        true
    }

    pub(crate) fn off(&mut self) -> bool {
        self.drive(false);
        false
    }

    /// Inverts every pin from the level it reads back.
    pub(crate) fn toggle(&mut self) -> bool {
        for (pin, _) in self.pins.iter_mut() {
            let level = !pin.read();
            pin.write(level);
        }
        self.lit = !self.lit;
        self.lit
    }

    pub(crate) fn status(&self) -> LedStatus {
        LedStatus {
            active: self.active,
            lit: self.lit,
            pin_count: self.pins.len(),
            pattern_len: self.pattern.as_ref().map_or(0, Pattern::len),
            owns_pattern: self.pattern.as_ref().is_some_and(Pattern::is_owned),
            cursor: self.cursor,
            loop_target: self.loop_target,
            loop_remaining: self.loop_remaining,
            deadline: self.deadline,
        }
    }
}

#[inline]
fn level_for(lit: bool, active_logic: Level) -> Level {
    if lit { active_logic } else { !active_logic }
}
