//! Embassy integration: a time source and the polling task.

use crate::DEFAULT_POLL_INTERVAL_MS;
use crate::engine::LedEngine;
use crate::led::LedPin;
use crate::time::{Tick, TimeSource};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Ticker};

/// Time source backed by the embassy time driver.
///
/// The 64-bit embassy tick count is truncated to the wrapping 32-bit [`Tick`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTimeSource;

impl EmbassyTimeSource {
    /// Creates a new Embassy time source
    pub const fn new() -> Self {
        Self
    }
}

impl TimeSource for EmbassyTimeSource {
    fn now(&self) -> Tick {
        Tick(Instant::now().as_ticks() as u32)
    }

    fn ticks_from_millis(&self, millis: u32) -> u32 {
        let ticks = Duration::from_millis(u64::from(millis)).as_ticks();
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS as u64);

/// Polls `engine` every `interval`, forever.
///
/// Spawn this from an embassy task:
///
/// ```ignore
/// #[embassy_executor::task]
/// async fn led_task(engine: &'static Engine) {
///     blink_sequencer::poller::run(engine, DEFAULT_POLL_INTERVAL).await
/// }
/// ```
pub async fn run<'a, M, P, T, const N: usize, const MAX_LEDS: usize, const PINS: usize>(
    engine: &LedEngine<'a, M, P, T, N, MAX_LEDS, PINS>,
    interval: Duration,
) -> !
where
    M: RawMutex,
    P: LedPin,
    T: TimeSource,
{
    let mut ticker = Ticker::every(interval);
    loop {
        engine.process();
        ticker.next().await;
    }
}
