//! Polling from one thread while others mutate the engine

mod common;
use common::*;

use blink_sequencer::{LedId, Level, LoopCount};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

static SHORT: [u32; 3] = [5, 5, 5];

#[test]
fn lifecycle_churn_while_polling_leaves_consistent_state() {
    static COMPLETIONS: AtomicUsize = AtomicUsize::new(0);
    fn on_complete(_: LedId) {
        COMPLETIONS.fetch_add(1, Ordering::SeqCst);
    }

    let timer = MockTimeSource::new();
    let engine = TestEngine::new(&timer);
    let polling = AtomicBool::new(true);

    thread::scope(|s| {
        s.spawn(|| {
            while polling.load(Ordering::SeqCst) {
                timer.advance(5);
                engine.process();
                thread::yield_now();
            }
        });

        let owned = s.spawn(|| {
            for round in 0..200 {
                let id = engine
                    .create(MockPin::new(), Level::High, Some("10,0,20,"), LoopCount::Infinite)
                    .unwrap();
                engine.start(id).unwrap();
                if round % 2 == 0 {
                    engine
                        .set_light_mode(id, Some("5,5"), LoopCount::Finite(1))
                        .unwrap();
                }
                engine.stop(id).unwrap();
                engine.start(id).unwrap();
                engine.delete(id).unwrap();
            }
        });

        let borrowed = s.spawn(|| {
            for _ in 0..200 {
                let id = engine
                    .create_static(MockPin::new(), Level::Low, &SHORT, LoopCount::Finite(1))
                    .unwrap();
                engine.set_complete_callback(id, Some(on_complete)).unwrap();
                engine.start(id).unwrap();
                thread::yield_now();
                engine.delete(id).unwrap();
            }
        });

        owned.join().unwrap();
        borrowed.join().unwrap();
        polling.store(false, Ordering::SeqCst);
    });

    assert!(engine.is_empty());
    assert_eq!(engine.active_count(), 0);
    assert!(COMPLETIONS.load(Ordering::SeqCst) <= 200);
}

#[test]
fn many_leds_complete_in_the_same_pass() {
    static COMPLETIONS: AtomicUsize = AtomicUsize::new(0);
    fn on_complete(_: LedId) {
        COMPLETIONS.fetch_add(1, Ordering::SeqCst);
    }

    let timer = MockTimeSource::new();
    let engine = TestEngine::new(&timer);

    let ids: Vec<LedId> = (0..4)
        .map(|_| {
            let id = engine
                .create_static(MockPin::new(), Level::High, &SHORT, LoopCount::Finite(1))
                .unwrap();
            engine.set_complete_callback(id, Some(on_complete)).unwrap();
            engine.start(id).unwrap();
            id
        })
        .collect();

    run_for(&engine, &timer, 100, 5);

    assert_eq!(COMPLETIONS.load(Ordering::SeqCst), 4);
    assert_eq!(engine.active_count(), 0);
    for id in ids {
        assert!(!engine.is_active(id).unwrap());
    }
}
