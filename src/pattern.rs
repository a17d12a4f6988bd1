//! Blink patterns and the text parser that produces them.
//!
//! A pattern is a list of durations in milliseconds. Even indices hold the LED
//! on, odd indices hold it off, so `"100,200"` means on 100 ms, off 200 ms.
//! A zero entry is skipped without holding the pin at all.

use crate::types::LedError;
use heapless::Vec;

/// Pattern storage of an LED object.
///
/// # Type Parameters
/// * `'a` - Lifetime of caller-supplied durations
/// * `N` - Capacity of the owned buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern<'a, const N: usize> {
    /// Durations parsed from text and owned by the LED object.
    Owned(Vec<u32, N>),

    /// Durations supplied by the caller, who keeps them alive for `'a`.
    Borrowed(&'a [u32]),
}

impl<'a, const N: usize> Pattern<'a, N> {
    /// Parses comma-separated text into an owned pattern.
    ///
    /// # Errors
    /// * `InvalidPattern` - The text has no elements
    /// * `OutOfMemory` - The text has more than `N` elements
    pub fn parse(light_mode: &str) -> Result<Self, LedError> {
        parse_light_mode(light_mode).map(Pattern::Owned)
    }

    /// Wraps caller-owned durations without copying them.
    #[inline]
    pub const fn borrowed(light_arr: &'a [u32]) -> Self {
        Pattern::Borrowed(light_arr)
    }

    /// Returns the durations.
    pub fn as_slice(&self) -> &[u32] {
        match self {
            Pattern::Owned(steps) => steps.as_slice(),
            Pattern::Borrowed(steps) => steps,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if the pattern has no entries.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns true if the pattern buffer is owned by the LED object.
    pub fn is_owned(&self) -> bool {
        matches!(self, Pattern::Owned(_))
    }
}

/// Number of elements described by pattern text.
///
/// One per comma, plus one unless the text ends with a comma.
pub fn element_count(light_mode: &str) -> usize {
    let separators = light_mode.bytes().filter(|&b| b == b',').count();
    if light_mode.is_empty() || light_mode.ends_with(',') {
        separators
    } else {
        separators + 1
    }
}

/// Parses comma-separated durations.
///
/// Each element is read leniently: leading whitespace and a `+` are skipped,
/// then leading digits are taken. An element without leading digits is 0 and
/// values beyond `u32::MAX` saturate.
///
/// # Errors
/// * `InvalidPattern` - The text has no elements
/// * `OutOfMemory` - The text has more than `N` elements
pub fn parse_light_mode<const N: usize>(light_mode: &str) -> Result<Vec<u32, N>, LedError> {
    let count = element_count(light_mode);
    if count == 0 {
        return Err(LedError::InvalidPattern);
    }
    if count > N {
        return Err(LedError::OutOfMemory);
    }

    let mut steps = Vec::new();
    for segment in light_mode.split(',').take(count) {
        steps
            .push(parse_duration(segment))
            .map_err(|_| LedError::OutOfMemory)?;
    }
    Ok(steps)
}

fn parse_duration(segment: &str) -> u32 {
    let digits = segment.trim_start();
    let digits = digits.strip_prefix('+').unwrap_or(digits);

    digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
}
