//! Deterministic virtual-time scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{TimerAction, TimerHandle, TimerScheduler};
use crate::clock::{Clock, ManualClock};

struct PendingTimer {
    deadline: Instant,
    /// Insertion order, breaks ties between equal deadlines.
    seq: u64,
    token: CancellationToken,
    action: TimerAction,
}

#[derive(Default)]
struct Queue {
    timers: Vec<PendingTimer>,
    next_seq: u64,
}

/// Scheduler whose timers fire only when [`advance`](Self::advance) is called.
///
/// Timers fire in deadline order and the shared [`ManualClock`] is moved to
/// each deadline before the action runs, so code observing the clock from
/// inside a timer sees the exact firing time. Actions run without any
/// internal lock held and may schedule or cancel other timers.
///
/// # Example
///
/// ```
/// use locmux::{Clock, ManualClock, ManualScheduler, TimerScheduler};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new());
/// let scheduler = ManualScheduler::new(Arc::clone(&clock));
/// let fired = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&fired);
/// scheduler.schedule(Duration::from_secs(10), Box::new(move || flag.store(true, Ordering::SeqCst)));
///
/// scheduler.advance(Duration::from_secs(9));
/// assert!(!fired.load(Ordering::SeqCst));
/// scheduler.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    queue: Mutex<Queue>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("clock", &self.clock)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(Queue::default()),
        }
    }

    /// The clock this scheduler drives.
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Number of timers that are scheduled and not cancelled.
    pub fn pending_count(&self) -> usize {
        self.queue
            .lock()
            .timers
            .iter()
            .filter(|t| !t.token.is_cancelled())
            .count()
    }

    /// Earliest deadline among live timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue
            .lock()
            .timers
            .iter()
            .filter(|t| !t.token.is_cancelled())
            .map(|t| t.deadline)
            .min()
    }

    /// Advance virtual time by `by`, firing every timer that comes due.
    ///
    /// Returns the number of actions that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now() + by;
        let mut fired = 0;

        while let Some(timer) = self.pop_due(target) {
            self.clock.advance_to(timer.deadline);
            if !timer.token.is_cancelled() {
                (timer.action)();
                fired += 1;
            }
        }

        self.clock.advance_to(target);
        fired
    }

    fn pop_due(&self, target: Instant) -> Option<PendingTimer> {
        let mut queue = self.queue.lock();
        queue.timers.retain(|t| !t.token.is_cancelled());

        let index = queue
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= target)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;

        Some(queue.timers.swap_remove(index))
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, action: TimerAction) -> TimerHandle {
        let token = CancellationToken::new();
        let deadline = self.clock.now() + delay;

        let mut queue = self.queue.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.timers.push(PendingTimer {
            deadline,
            seq,
            token: token.clone(),
            action,
        });

        TimerHandle::new(token)
    }
}
