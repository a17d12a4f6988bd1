#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`LedEngine`**: Owns every LED object, the registry of running ones and the lock guarding them
//! - **Pin group**: Each LED object drives up to `PINS` pins, each with its own active logic
//! - **`LedId`**: Handle returned by `create`/`create_static`, used for every later operation
//! - **`Pattern`**: On/off durations in milliseconds, either owned (parsed from text) or borrowed
//! - **`LoopCount`**: How many times to repeat a pattern (`Finite(n)` or `Infinite`)
//! - **`LedPin`**: Trait to implement for your pin hardware (or wrap an embedded-hal pin in `HalPin`)
//! - **`TimeSource`**: Trait to implement for your wrapping tick counter
//! - **`LedCommand`**: Commands that front-ends can route to the engine
//!
//! The engine never blocks and owns no timer. Call [`LedEngine::process`] from one
//! periodic context (every 5 ms is typical) and drive everything else from anywhere.

#[macro_use]
mod fmt;

pub mod time;
pub mod types;
pub mod pattern;
pub mod led;
pub mod engine;
pub mod command;
#[cfg(feature = "embassy")]
pub mod poller;

pub use time::{Tick, TimeSource, ticks_from_millis_at};
pub use types::{LedError, LedId, Level, LoopCount};
pub use pattern::{Pattern, parse_light_mode};
pub use led::{ChangeCallback, CompleteCallback, HalPin, LedPin, LedStatus};
pub use engine::LedEngine;
pub use command::{LedAction, LedCommand};

/// Interval at which the poll routine is expected to run.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 5;
