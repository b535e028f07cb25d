//! Fixed-interval pacing between live requests.
//!
//! Shared API keys carry a global quota (5 calls per minute), so live
//! fetches are spaced `60s / calls_per_minute` apart. The wait happens
//! before every call but the first, never after the last one. It goes
//! through a [`Sleeper`] so tests can record it instead of waiting.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Quota of the shared demo key.
pub const SHARED_KEY_CALLS_PER_MINUTE: u32 = 5;

/// Calls-per-minute budget; `None` disables pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    calls_per_minute: Option<NonZeroU32>,
}

impl RateLimit {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// `0` disables pacing.
    pub fn per_minute(calls: u32) -> Self {
        Self {
            calls_per_minute: NonZeroU32::new(calls),
        }
    }

    /// The 5-per-minute quota of shared keys (one call every 12 seconds).
    pub fn shared_key() -> Self {
        Self::per_minute(SHARED_KEY_CALLS_PER_MINUTE)
    }

    pub fn calls_per_minute(&self) -> Option<u32> {
        self.calls_per_minute.map(NonZeroU32::get)
    }

    pub fn is_enabled(&self) -> bool {
        self.calls_per_minute.is_some()
    }

    /// Spacing between consecutive live calls.
    pub fn interval(&self) -> Option<Duration> {
        self.calls_per_minute
            .map(|n| Duration::from_secs(60) / n.get())
    }
}

/// Blocks the current thread for a duration.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that only records the requested pauses.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}

/// Applies a [`RateLimit`] through a [`Sleeper`].
pub struct Pacer {
    limit: RateLimit,
    sleeper: Box<dyn Sleeper>,
    called: AtomicBool,
}

impl Pacer {
    pub fn new(limit: RateLimit, sleeper: Box<dyn Sleeper>) -> Self {
        Self {
            limit,
            sleeper,
            called: AtomicBool::new(false),
        }
    }

    /// Pacer that really sleeps.
    pub fn blocking(limit: RateLimit) -> Self {
        Self::new(limit, Box::new(ThreadSleeper))
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Call before each live request. The first request goes straight
    /// through; later ones wait one interval. Returns the pause taken.
    pub fn wait_turn(&self) -> Option<Duration> {
        let interval = self.limit.interval()?;
        if !self.called.swap(true, Ordering::SeqCst) {
            return None;
        }
        tracing::debug!(secs = interval.as_secs_f64(), "rate limit pause");
        self.sleeper.sleep(interval);
        Some(interval)
    }
}
