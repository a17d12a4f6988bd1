//! Command-based control for LED engines.
//!
//! Lets front-ends (a shell, a message queue) describe what to do with an LED
//! as data and hand it to [`LedEngine::handle_command`](crate::LedEngine::handle_command).

use crate::types::{LedId, LoopCount};

/// Actions for controlling an LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAction<'p> {
    /// Start the pattern.
    Start,
    /// Stop the pattern.
    Stop,
    /// Replace the pattern with parsed text and set the loop count.
    SetLightMode {
        light_mode: &'p str,
        loop_count: LoopCount,
    },
    /// Turn the LED on.
    On,
    /// Turn the LED off.
    Off,
    /// Invert the LED.
    Toggle,
}

/// Command targeting a specific LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCommand<'p> {
    pub led_id: LedId,
    pub action: LedAction<'p>,
}

impl<'p> LedCommand<'p> {
    /// Creates command.
    pub fn new(led_id: LedId, action: LedAction<'p>) -> Self {
        Self { led_id, action }
    }
}
