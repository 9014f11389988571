//! Time source abstraction.
//!
//! Every timestamp in the core comes from a [`Clock`] handed to the
//! component at construction. Production wiring uses [`SystemClock`]; tests
//! use [`ManualClock`] so TTLs, lock durations, and cadences are exact.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

use crate::sync::lock;

/// A source of the current time.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start the clock at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::default())
    }

    /// Move the clock forward by `delta`. Saturates at the maximum instant.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = lock(&self.now);
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(secs_delta(secs));
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *lock(&self.now) = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Whole seconds as a [`TimeDelta`], saturating on overflow.
pub fn secs_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Elapsed seconds between two instants as a float; zero if `to` precedes
/// `from`.
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    let millis = delta.num_milliseconds();
    if millis <= 0 {
        return 0.0;
    }
    millis as f64 / 1000.0
}
