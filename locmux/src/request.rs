//! Tracked location requests.
//!
//! A [`LocationRequest`] is one caller's ask: what accuracy it wants, how long
//! it is willing to wait, and the callback that receives the answer. The
//! engine owns every live request exclusively; requests never reach back into
//! the engine. When a timeout timer fires, the scheduler calls into the engine
//! by [`RequestId`] and the engine decides what happens.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::accuracy::AccuracyLevel;
use crate::error::LocationError;
use crate::status::LocationReport;
use crate::timer::{TimerAction, TimerHandle, TimerScheduler};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique request identifier.
///
/// Allocated from a monotonically increasing counter and never reused.
/// Location and heading requests share the same ID space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate the next ID.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of answer the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Completes once, when the desired accuracy is reached or on timeout.
    OneShot,
    /// Fires on every sample until canceled. The desired accuracy only
    /// shapes the sensor configuration.
    AccuracySubscription,
    /// Fires on every significant-change sample until canceled.
    SignificantChangeSubscription,
}

impl RequestKind {
    pub fn is_subscription(&self) -> bool {
        !matches!(self, RequestKind::OneShot)
    }
}

/// Callback receiving request outcomes.
pub type LocationCallback = Arc<dyn Fn(&LocationReport) + Send + Sync>;

/// One tracked location request.
pub struct LocationRequest {
    id: RequestId,
    kind: RequestKind,
    desired_accuracy: AccuracyLevel,
    /// Zero means no timeout.
    timeout: Duration,
    deferred_timeout: bool,
    callback: LocationCallback,
    completed: bool,
    timer: Option<TimerHandle>,
    timer_started_at: Option<Instant>,
}

impl fmt::Debug for LocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationRequest")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("desired_accuracy", &self.desired_accuracy)
            .field("timeout", &self.timeout)
            .field("deferred_timeout", &self.deferred_timeout)
            .field("completed", &self.completed)
            .field("timer_running", &self.is_timer_running())
            .finish_non_exhaustive()
    }
}

impl LocationRequest {
    fn new(
        kind: RequestKind,
        desired_accuracy: AccuracyLevel,
        timeout: Duration,
        deferred_timeout: bool,
        callback: LocationCallback,
    ) -> Self {
        Self {
            id: RequestId::next(),
            kind,
            desired_accuracy,
            timeout,
            deferred_timeout,
            callback,
            completed: false,
            timer: None,
            timer_started_at: None,
        }
    }

    /// A request that completes once.
    ///
    /// A zero `timeout` waits indefinitely. With `deferred_timeout` set, the
    /// countdown does not begin until the user has answered the permission
    /// prompt.
    pub fn one_shot(
        desired_accuracy: AccuracyLevel,
        timeout: Duration,
        deferred_timeout: bool,
        callback: LocationCallback,
    ) -> Result<Self, LocationError> {
        if !desired_accuracy.is_valid_desired() {
            return Err(LocationError::InvalidDesiredAccuracy(desired_accuracy));
        }
        Ok(Self::new(
            RequestKind::OneShot,
            desired_accuracy,
            timeout,
            deferred_timeout,
            callback,
        ))
    }

    /// A subscription reporting every sample, with the sensor configured
    /// for `desired_accuracy`.
    pub fn accuracy_subscription(
        desired_accuracy: AccuracyLevel,
        callback: LocationCallback,
    ) -> Result<Self, LocationError> {
        if !desired_accuracy.is_valid_desired() {
            return Err(LocationError::InvalidDesiredAccuracy(desired_accuracy));
        }
        Ok(Self::new(
            RequestKind::AccuracySubscription,
            desired_accuracy,
            Duration::ZERO,
            false,
            callback,
        ))
    }

    /// A subscription reporting every sample at the finest accuracy.
    pub fn location_subscription(callback: LocationCallback) -> Self {
        Self::new(
            RequestKind::AccuracySubscription,
            AccuracyLevel::Room,
            Duration::ZERO,
            false,
            callback,
        )
    }

    /// A subscription reporting significant location changes only.
    pub fn significant_change_subscription(callback: LocationCallback) -> Self {
        Self::new(
            RequestKind::SignificantChangeSubscription,
            AccuracyLevel::None,
            Duration::ZERO,
            false,
            callback,
        )
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn desired_accuracy(&self) -> AccuracyLevel {
        self.desired_accuracy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred_timeout
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Shared handle to the callback, for repeated subscription delivery.
    pub fn callback(&self) -> LocationCallback {
        Arc::clone(&self.callback)
    }

    /// Whether a timer has been started at some point.
    pub fn has_timer_started(&self) -> bool {
        self.timer_started_at.is_some()
    }

    /// Whether a timer is scheduled and not cancelled.
    pub fn is_timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Schedule the timeout.
    ///
    /// No-op when the timeout is zero, the request has completed, or a timer
    /// is already running. Returns whether a timer was scheduled.
    pub fn start_timer(
        &mut self,
        scheduler: &dyn TimerScheduler,
        now: Instant,
        action: TimerAction,
    ) -> bool {
        if self.timeout.is_zero() || self.completed || self.is_timer_running() {
            return false;
        }
        self.timer = Some(scheduler.schedule(self.timeout, action));
        self.timer_started_at = Some(now);
        true
    }

    /// Cancel the timeout. Safe to call at any time.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Time since the timer was started, zero if it never was.
    pub fn time_alive(&self, now: Instant) -> Duration {
        self.timer_started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    /// Deliver the final outcome.
    ///
    /// First call wins: the callback runs synchronously and the timer is
    /// cancelled. Later calls do nothing and return `false`.
    pub fn complete(&mut self, report: LocationReport) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        (self.callback)(&report);
        self.cancel_timer();
        true
    }
}
