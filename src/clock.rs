//! Whole-Second Time Sources
//!
//! The expiry queue stamps buckets in whole seconds and relies on stamps
//! never going backwards. Production code reads a monotonic clock; tests
//! swap in a [`ManualClock`] so expiry can be driven without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A source of whole-second timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time in whole seconds.
    fn now_s(&self) -> u64;
}

/// Monotonic seconds since the first time any `SystemClock` was read.
///
/// Unaffected by wall-clock adjustments, so bucket stamps stay ordered.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    fn origin() -> Instant {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        *ORIGIN.get_or_init(Instant::now)
    }
}

impl Clock for SystemClock {
    fn now_s(&self) -> u64 {
        Self::origin().elapsed().as_secs()
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use flashcache::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(100);
/// clock.advance(5);
/// assert_eq!(clock.now_s(), 105);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_s`.
    pub fn new(start_s: u64) -> Self {
        Self {
            now: AtomicU64::new(start_s),
        }
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jumps the clock to `now_s`.
    pub fn set(&self, now_s: u64) {
        self.now.store(now_s, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_s(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
