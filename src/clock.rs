//! Wall-clock access, id generation and day-boundary arithmetic.
//!
//! The scheduler never reads the system time directly; everything goes
//! through the [`Clock`] trait so tests can drive a session from a
//! deterministic clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;

/// Seconds in one scheduling day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Source of the current time, in epoch milliseconds/seconds.
pub trait Clock {
    /// Current epoch time in milliseconds.
    fn now_ms(&self) -> i64;

    /// Current epoch time in whole seconds.
    fn now_s(&self) -> i64 {
        self.now_ms() / 1000
    }
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and harnesses.
///
/// Clones share the same underlying time, so a test can keep one handle to
/// advance the clock while the scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    ms: Arc<AtomicI64>,
    tick_ms: i64,
}

impl MockClock {
    /// Clock frozen at the given epoch second.
    pub fn at_secs(secs: i64) -> Self {
        Self {
            ms: Arc::new(AtomicI64::new(secs * 1000)),
            tick_ms: 0,
        }
    }

    /// Clock that advances one millisecond on every read. Lets [`IdGen`]
    /// make progress without real sleeping.
    pub fn ticking(secs: i64) -> Self {
        Self {
            ms: Arc::new(AtomicI64::new(secs * 1000)),
            tick_ms: 1,
        }
    }

    pub fn set_secs(&self, secs: i64) {
        self.ms.store(secs * 1000, Ordering::Relaxed);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> i64 {
        self.ms.fetch_add(self.tick_ms, Ordering::Relaxed)
    }
}

/// Generates strictly increasing 64-bit ids.
///
/// An id is the epoch-millisecond timestamp at which it was requested; the
/// generator refuses to return until the clock ticks past that millisecond,
/// so back-to-back calls never collide. The guarantee only holds within a
/// single generator; multiple producers must serialise id generation
/// externally.
pub struct IdGen {
    clock: Box<dyn Clock>,
}

impl IdGen {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Generator backed by the real wall clock.
    pub fn system() -> Self {
        Self::new(Box::new(SystemClock))
    }

    /// Next unique id. Blocks for at least one millisecond.
    pub fn next_id(&mut self) -> i64 {
        let t = self.clock.now_ms();
        while self.clock.now_ms() == t {
            thread::sleep(Duration::from_millis(1));
        }
        t
    }

    /// Current time of the underlying clock, for stamping creation fields
    /// from the same source the ids come from.
    pub fn now_s(&self) -> i64 {
        self.clock.now_s()
    }
}

/// Whole days elapsed since `crt`, clamped at zero.
pub fn days_since(now_s: i64, crt: i64) -> i64 {
    (now_s - crt).div_euclid(SECS_PER_DAY).max(0)
}

/// Epoch second of the next day boundary strictly after `now_s`.
///
/// The boundary is midnight UTC shifted east by `tz_offset_secs`. An input
/// lying exactly on a boundary rolls to the following one, so a day is never
/// zero-length.
pub fn next_day_cutoff(now_s: i64, tz_offset_secs: i64) -> i64 {
    let local = now_s + tz_offset_secs;
    (local.div_euclid(SECS_PER_DAY) + 1) * SECS_PER_DAY - tz_offset_secs
}

/// Midnight UTC at or before `now_s`.
pub fn start_of_day(now_s: i64) -> i64 {
    now_s - now_s.rem_euclid(SECS_PER_DAY)
}
