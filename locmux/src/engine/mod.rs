//! Request arbitration engine.
//!
//! The engine owns the [`Registry`] and reacts to four kinds of input:
//!
//! ```text
//!   enqueue / force_complete / cancel      (callers, via the facade)
//!   SensorEvent::Location                  ─┐
//!   SensorEvent::Authorization              ├─► re-evaluate live requests
//!   SensorEvent::Failure                   ─┘
//!   timer fired                            (TimerScheduler, by RequestId)
//!                        │
//!                        ▼
//!        complete / notify callbacks, start / reconfigure / stop session
//! ```
//!
//! # Reentrancy
//!
//! Callbacks may enqueue, cancel, or force-complete other requests. The
//! engine never invokes a callback while holding the registry lock: each
//! event snapshots the live IDs, then for every ID re-checks the registry,
//! decides, releases the lock, and only then delivers. A request canceled by
//! an earlier callback in the same event is simply skipped.
//!
//! Sensor control calls are made with the lock held, so sensor adapters must
//! not call back into the engine from `start_session`/`stop_session`.

mod heading;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::accuracy::AccuracyLevel;
use crate::clock::Clock;
use crate::config::LocationConfig;
use crate::heading::HeadingSample;
use crate::location::LocationSample;
use crate::registry::Registry;
use crate::request::{LocationCallback, LocationRequest, RequestId};
use crate::sensor::{LocationSensor, SensorError, SensorEvent, SessionConfig};
use crate::status::{AuthorizationState, LocationReport, LocationStatus};
use crate::timer::{TimerAction, TimerScheduler};

struct EngineInner {
    sensor: Arc<dyn LocationSensor>,
    scheduler: Arc<dyn TimerScheduler>,
    clock: Arc<dyn Clock>,
    config: LocationConfig,
    registry: Mutex<Registry>,
}

/// Work decided under the lock and carried out after releasing it.
enum Delivery {
    /// Final outcome for a request already removed from the registry.
    Complete(LocationRequest, LocationReport),
    /// Subscription update; the request stays live.
    Notify(LocationCallback, LocationReport),
}

impl Delivery {
    fn run(self) {
        match self {
            Delivery::Complete(mut request, report) => {
                request.complete(report);
            }
            Delivery::Notify(callback, report) => callback(&report),
        }
    }
}

/// Multiplexes location requests onto a single sensor session.
///
/// Cloning is cheap and yields another handle to the same engine.
#[derive(Clone)]
pub struct LocationEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for LocationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("LocationEngine")
            .field("live_requests", &registry.len())
            .field("live_headings", &registry.heading_len())
            .field("session", &registry.session)
            .field("authorization", &registry.authorization)
            .finish_non_exhaustive()
    }
}

impl LocationEngine {
    /// Create an engine around a sensor, a timer scheduler, and a clock.
    pub fn new(
        sensor: Arc<dyn LocationSensor>,
        scheduler: Arc<dyn TimerScheduler>,
        clock: Arc<dyn Clock>,
        config: LocationConfig,
    ) -> Self {
        let authorization = sensor.authorization_state();
        Self {
            inner: Arc::new(EngineInner {
                sensor,
                scheduler,
                clock,
                config,
                registry: Mutex::new(Registry::new(authorization)),
            }),
        }
    }

    // =========================================================================
    // Caller operations
    // =========================================================================

    /// Start tracking `request`.
    ///
    /// When location access is already denied, restricted, or disabled the
    /// callback fires immediately with the matching status and the request is
    /// never tracked.
    pub fn enqueue(&self, mut request: LocationRequest) -> RequestId {
        let id = request.id();
        let authorization = self.inner.sensor.authorization_state();

        if let Some(status) = authorization.failure_status() {
            self.inner.registry.lock().authorization = authorization;
            debug!(request_id = %id, status = ?status, "Location access unavailable, completing immediately");
            request.complete(LocationReport::failure(status));
            return id;
        }

        let mut registry = self.inner.registry.lock();
        registry.authorization = authorization;
        if authorization == AuthorizationState::NotDetermined {
            self.inner.sensor.request_authorization();
        }

        let start_timer = !request.is_deferred() || authorization.is_resolved();
        debug!(
            request_id = %id,
            kind = ?request.kind(),
            desired = %request.desired_accuracy(),
            timeout_ms = request.timeout().as_millis() as u64,
            deferred = !start_timer,
            "Request enqueued"
        );
        registry.insert(request);
        if start_timer {
            self.start_timer(&mut registry, id);
        }
        self.sync_session(&mut registry);
        id
    }

    /// Complete a live request right away with the best sample known.
    ///
    /// One-shots report `TimedOut`, subscriptions report `Success` and end.
    /// Returns `false` if `id` is not live.
    pub fn force_complete(&self, id: RequestId) -> bool {
        let delivery = {
            let mut registry = self.inner.registry.lock();
            let Some(request) = registry.remove(id) else {
                return false;
            };
            self.sync_session(&mut registry);
            let status = if request.kind().is_subscription() {
                LocationStatus::Success
            } else {
                LocationStatus::TimedOut
            };
            let report = self.last_known_report(&registry, status);
            Delivery::Complete(request, report)
        };

        debug!(request_id = %id, "Request force-completed");
        delivery.run();
        true
    }

    /// Stop tracking a request without invoking its callback.
    ///
    /// Works for location and heading requests. Returns `false` if `id` is
    /// not live.
    pub fn cancel(&self, id: RequestId) -> bool {
        let mut registry = self.inner.registry.lock();
        if let Some(mut request) = registry.remove(id) {
            request.cancel_timer();
            self.sync_session(&mut registry);
            debug!(request_id = %id, "Request canceled");
            return true;
        }
        if registry.remove_heading(id).is_some() {
            self.sync_heading_session(&mut registry);
            debug!(request_id = %id, "Heading subscription canceled");
            return true;
        }
        false
    }

    // =========================================================================
    // Sensor events
    // =========================================================================

    /// Dispatch one sensor event.
    pub fn handle_event(&self, event: SensorEvent) {
        match event {
            SensorEvent::Location(sample) => self.handle_location(sample),
            SensorEvent::Authorization(state) => self.handle_authorization_change(state),
            SensorEvent::Failure(error) => self.handle_sensor_failure(&error),
            SensorEvent::Heading(sample) => self.handle_heading(sample),
        }
    }

    /// Evaluate every live request against a new sample.
    pub fn handle_location(&self, sample: LocationSample) {
        let achieved = sample.achieved_accuracy(self.inner.clock.now());
        let report = LocationReport::new(Some(sample), achieved, LocationStatus::Success);

        let ids = {
            let mut registry = self.inner.registry.lock();
            registry.record_sample(sample);
            registry.ids()
        };
        debug!(
            horizontal_accuracy_m = sample.horizontal_accuracy_m,
            achieved = %achieved,
            live = ids.len(),
            "Location sample received"
        );

        for id in ids {
            let delivery = {
                let mut registry = self.inner.registry.lock();
                let Some(request) = registry.get(id) else {
                    continue;
                };
                if request.kind().is_subscription() {
                    Delivery::Notify(request.callback(), report)
                } else if achieved >= request.desired_accuracy() {
                    let Some(request) = registry.remove(id) else {
                        continue;
                    };
                    self.sync_session(&mut registry);
                    debug!(request_id = %id, achieved = %achieved, "Request satisfied");
                    Delivery::Complete(request, report)
                } else {
                    continue;
                }
            };
            delivery.run();
        }
    }

    /// React to a new authorization/enablement state.
    ///
    /// A state that forbids location access completes every live request
    /// with the matching status. Authorization starts the countdown of
    /// deferred requests.
    pub fn handle_authorization_change(&self, state: AuthorizationState) {
        let ids = {
            let mut registry = self.inner.registry.lock();
            let previous = registry.authorization;
            registry.authorization = state;
            info!(from = ?previous, to = ?state, "Authorization changed");

            if state.is_authorized() {
                for id in registry.pending_deferred() {
                    debug!(request_id = %id, "Starting deferred timeout");
                    self.start_timer(&mut registry, id);
                }
            }

            if state.failure_status().is_none() {
                return;
            }
            registry.ids()
        };

        let Some(status) = state.failure_status() else {
            return;
        };
        for id in ids {
            self.complete_with(id, LocationReport::failure(status));
        }
    }

    /// Report a sensor failure.
    ///
    /// Subscriptions receive `Error` and end. One-shots stay pending so a
    /// later good sample or their timeout can still complete them.
    pub fn handle_sensor_failure(&self, error: &SensorError) {
        let ids = self.inner.registry.lock().ids();
        warn!(error = %error, live = ids.len(), "Location sensor failed");

        for id in ids {
            let is_subscription = self
                .inner
                .registry
                .lock()
                .get(id)
                .is_some_and(|r| r.kind().is_subscription());
            if is_subscription {
                self.complete_with(id, LocationReport::failure(LocationStatus::Error));
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of live location requests.
    pub fn live_request_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Whether a location or heading request with this ID is live.
    pub fn is_live(&self, id: RequestId) -> bool {
        let registry = self.inner.registry.lock();
        registry.get(id).is_some() || registry.get_heading(id).is_some()
    }

    pub fn is_session_running(&self) -> bool {
        self.inner.registry.lock().session.is_some()
    }

    /// Configuration of the running location session.
    pub fn session_config(&self) -> Option<SessionConfig> {
        self.inner.registry.lock().session
    }

    /// Freshest sample received so far.
    pub fn last_sample(&self) -> Option<LocationSample> {
        self.inner.registry.lock().last_sample()
    }

    pub fn last_heading(&self) -> Option<HeadingSample> {
        self.inner.registry.lock().last_heading()
    }

    /// Time since the request's timer started; `None` if the request is not
    /// live.
    pub fn time_alive(&self, id: RequestId) -> Option<Duration> {
        let now = self.inner.clock.now();
        self.inner
            .registry
            .lock()
            .get(id)
            .map(|request| request.time_alive(now))
    }

    /// Last authorization state seen by the engine.
    pub fn authorization(&self) -> AuthorizationState {
        self.inner.registry.lock().authorization
    }

    /// Current authorization straight from the sensor.
    pub fn sensor_authorization(&self) -> AuthorizationState {
        self.inner.sensor.authorization_state()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn handle_timeout(&self, id: RequestId) {
        let delivery = {
            let mut registry = self.inner.registry.lock();
            let timer_running = registry.get(id).is_some_and(|r| r.is_timer_running());
            if !timer_running {
                return;
            }
            let Some(request) = registry.remove(id) else {
                return;
            };
            self.sync_session(&mut registry);

            let report = if self.inner.sensor.authorization_state()
                == AuthorizationState::NotDetermined
            {
                LocationReport::failure(LocationStatus::ServicesNotDetermined)
            } else {
                self.last_known_report(&registry, LocationStatus::TimedOut)
            };
            debug!(request_id = %id, status = ?report.status, "Request timed out");
            Delivery::Complete(request, report)
        };
        delivery.run();
    }

    /// Remove a live request and deliver `report` as its final outcome.
    fn complete_with(&self, id: RequestId, report: LocationReport) {
        let delivery = {
            let mut registry = self.inner.registry.lock();
            let Some(request) = registry.remove(id) else {
                return;
            };
            self.sync_session(&mut registry);
            Delivery::Complete(request, report)
        };
        debug!(request_id = %id, status = ?report.status, "Request completed");
        delivery.run();
    }

    fn last_known_report(&self, registry: &Registry, status: LocationStatus) -> LocationReport {
        let location = registry.last_sample();
        let achieved = location
            .map(|sample| sample.achieved_accuracy(self.inner.clock.now()))
            .unwrap_or(AccuracyLevel::None);
        LocationReport::new(location, achieved, status)
    }

    fn start_timer(&self, registry: &mut Registry, id: RequestId) {
        let now = self.inner.clock.now();
        let action = self.timeout_action(id);
        if let Some(request) = registry.get_mut(id) {
            request.start_timer(self.inner.scheduler.as_ref(), now, action);
        }
    }

    fn timeout_action(&self, id: RequestId) -> TimerAction {
        let engine: Weak<EngineInner> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = engine.upgrade() {
                LocationEngine { inner }.handle_timeout(id);
            }
        })
    }

    /// Start, reconfigure, or stop the sensor session to match the live set.
    fn sync_session(&self, registry: &mut Registry) {
        let desired = registry.desired_session(self.inner.config.distance_filter);
        if desired == registry.session {
            return;
        }

        match &desired {
            Some(config) => {
                if registry.session.is_none() {
                    info!(
                        accuracy = ?config.accuracy,
                        significant_changes = config.significant_changes,
                        distance_filter = %config.distance_filter,
                        "Starting location session"
                    );
                } else {
                    debug!(
                        accuracy = ?config.accuracy,
                        significant_changes = config.significant_changes,
                        "Reconfiguring location session"
                    );
                }
                self.inner.sensor.start_session(config);
            }
            None => {
                info!("Stopping location session");
                self.inner.sensor.stop_session();
            }
        }
        registry.session = desired;
    }
}
