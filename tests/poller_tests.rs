//! Polling task driven by the embassy mock time driver
#![cfg(feature = "embassy")]

mod common;
use common::*;

use blink_sequencer::poller::{self, EmbassyTimeSource};
use blink_sequencer::{LedEngine, Level, LoopCount, Tick, TimeSource};
use core::pin::pin;
use core::task::{Context, Waker};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, MockDriver};

type EmbassyEngine<'a> = LedEngine<'a, CriticalSectionRawMutex, MockPin, EmbassyTimeSource, 16, 4, 3>;

#[test]
fn run_processes_engine_on_every_tick() {
    let driver = MockDriver::get();
    let clock = EmbassyTimeSource::new();
    let engine = EmbassyEngine::new(&clock);
    let pin = MockPin::new();

    // mock driver ticks at 1 MHz
    assert_eq!(clock.ticks_from_millis(5), 5_000);
    let start = clock.now();

    let id = engine
        .create(pin.clone(), Level::High, Some("5,5"), LoopCount::Infinite)
        .unwrap();
    pin.clear_writes();
    engine.start(id).unwrap();

    let mut task = pin!(poller::run(&engine, poller::DEFAULT_POLL_INTERVAL));
    let mut cx = Context::from_waker(Waker::noop());

    // first poll processes right away, then waits on the ticker
    assert!(task.as_mut().poll(&mut cx).is_pending());
    assert_eq!(pin.writes(), vec![Level::High]);

    driver.advance(Duration::from_millis(5));
    assert_eq!(clock.now(), start.wrapping_add(5_000));
    assert!(task.as_mut().poll(&mut cx).is_pending());
    assert_eq!(pin.writes(), vec![Level::High, Level::Low]);

    // not due yet
    driver.advance(Duration::from_millis(2));
    assert!(task.as_mut().poll(&mut cx).is_pending());
    assert_eq!(pin.writes().len(), 2);
    assert_ne!(clock.now(), Tick(0));
}
