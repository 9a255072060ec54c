//! Scheduled-callback abstraction for request timeouts.
//!
//! Requests do not own timers directly. The engine asks a [`TimerScheduler`]
//! to run an action after a delay and keeps the returned [`TimerHandle`] so it
//! can cancel the timer later. Two schedulers are provided:
//!
//! - [`TokioScheduler`]: one tokio task per timer (production)
//! - [`ManualScheduler`]: virtual time driven by a [`ManualClock`](crate::ManualClock) (tests)

mod manual;
mod runtime;

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Work to run when a timer fires.
pub type TimerAction = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled timer.
///
/// Cancelling is always safe and idempotent; a cancelled timer never runs
/// its action.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Create a handle around a cancellation token shared with the scheduler.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancel the timer.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs actions after a delay.
pub trait TimerScheduler: Send + Sync {
    /// Schedule `action` to run once after `delay`.
    fn schedule(&self, delay: Duration, action: TimerAction) -> TimerHandle;
}
