//! Shared test infrastructure for blink-sequencer integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use blink_sequencer::{LedEngine, LedPin, Level, Tick, TimeSource};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Pin
// ============================================================================

#[derive(Debug, Default)]
struct PinState {
    level: Option<Level>,
    configured: bool,
    writes: Vec<Level>,
}

/// Mock pin that records all writes.
///
/// Clones share state, so a test keeps one clone to watch the pin and hands the
/// other to the engine.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    state: Arc<Mutex<PinState>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<Level> {
        self.state.lock().unwrap().level
    }

    pub fn is_output(&self) -> bool {
        self.state.lock().unwrap().configured
    }

    pub fn writes(&self) -> Vec<Level> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }
}

impl LedPin for MockPin {
    fn configure_output(&mut self) {
        self.state.lock().unwrap().configured = true;
    }

    fn write(&mut self, level: Level) {
        let mut state = self.state.lock().unwrap();
        state.level = Some(level);
        state.writes.push(level);
    }

    fn read(&mut self) -> Level {
        self.state.lock().unwrap().level.unwrap_or(Level::Low)
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock 1 kHz tick counter with controllable, wrapping time.
pub struct MockTimeSource {
    current_time: AtomicU32,
}

impl MockTimeSource {
    pub const fn new() -> Self {
        Self {
            current_time: AtomicU32::new(0),
        }
    }

    pub const fn starting_at(ticks: u32) -> Self {
        Self {
            current_time: AtomicU32::new(ticks),
        }
    }

    /// Advance time by the given number of milliseconds, wrapping
    pub fn advance(&self, millis: u32) {
        let current = self.current_time.load(Ordering::SeqCst);
        self.current_time
            .store(current.wrapping_add(millis), Ordering::SeqCst);
    }

    pub fn set_time(&self, ticks: u32) {
        self.current_time.store(ticks, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Tick {
        Tick(self.current_time.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub type TestEngine<'a> = LedEngine<'a, CriticalSectionRawMutex, MockPin, MockTimeSource, 16, 4, 3>;

/// Polls every `step` ms until `millis` have passed, polling once at the start.
pub fn run_for(engine: &TestEngine<'_>, timer: &MockTimeSource, millis: u32, step: u32) {
    engine.process();
    let mut elapsed = 0;
    while elapsed < millis {
        timer.advance(step);
        elapsed += step;
        engine.process();
    }
}
