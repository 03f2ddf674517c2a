//! Time source used for block ids and synthetic variable names.
//!
//! The engine and serializer are generic over [`Clock`] so tests can pin
//! timestamps with [`FixedClock`] or step them with [`TickClock`].

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of millisecond timestamps.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Returns `start`, `start + step`, `start + 2 * step`, ... on successive calls.
#[derive(Debug, Clone)]
pub struct TickClock {
    next: Cell<u64>,
    step: u64,
}

impl TickClock {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for TickClock {
    fn now_millis(&self) -> u64 {
        let now = self.next.get();
        self.next.set(now.saturating_add(self.step));
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Small xorshift generator for the "timestamp × random" retry when a
/// synthetic name collides.
#[derive(Debug, Clone)]
pub(crate) struct Entropy(u64);

impl Entropy {
    pub(crate) fn seeded(seed: u64) -> Self {
        // xorshift has a fixed point at zero
        Self(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Next value in `1..=1000`.
    pub(crate) fn next_factor(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x % 1000 + 1
    }
}

/// Produce `var<now>` or, on collision, `var<now × factor>` until
/// `is_taken` reports a free name.
pub(crate) fn synthesize_name(
    now: u64,
    entropy: &mut Entropy,
    mut is_taken: impl FnMut(&str) -> bool,
) -> String {
    let mut candidate = format!("var{now}");
    let mut attempt: u64 = 0;
    while is_taken(&candidate) {
        attempt += 1;
        let stamp = now
            .max(1)
            .wrapping_mul(entropy.next_factor())
            .wrapping_add(attempt);
        candidate = format!("var{stamp}");
    }
    candidate
}
