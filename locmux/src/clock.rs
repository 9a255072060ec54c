//! Time source abstraction.
//!
//! The engine never calls `Instant::now()` directly. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] together with
//! [`ManualScheduler`](crate::timer::ManualScheduler) so that timeouts and
//! sample ages are fully deterministic.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// The instant this clock started at (virtual `t = 0`).
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Virtual time elapsed since [`origin`](Self::origin).
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed += by;
    }

    /// Move the clock to `instant`. Never moves backwards.
    pub fn advance_to(&self, instant: Instant) {
        let target = instant.saturating_duration_since(self.origin);
        let mut elapsed = self.elapsed.lock();
        if target > *elapsed {
            *elapsed = target;
        }
    }

    /// The instant at virtual offset `offset` from the origin.
    pub fn at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}
