//! Tokio-backed scheduler.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::{TimerAction, TimerHandle, TimerScheduler};

/// Scheduler that spawns one tokio task per timer.
///
/// Each task races `tokio::time::sleep` against the handle's cancellation
/// token, so cancelling a timer also ends its task promptly.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Create a scheduler spawning onto the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Create a scheduler for the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, action: TimerAction) -> TimerHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !task_token.is_cancelled() {
                        action();
                    }
                }
            }
        });

        TimerHandle::new(token)
    }
}
