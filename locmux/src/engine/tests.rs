use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::clock::ManualClock;
use crate::config::DistanceFilter;
use crate::heading::{HeadingCallback, HeadingReport, HeadingStatus};
use crate::sensor::FakeSensor;
use crate::timer::ManualScheduler;

struct Harness {
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    sensor: Arc<FakeSensor>,
    engine: LocationEngine,
}

impl Harness {
    fn new(authorization: AuthorizationState) -> Self {
        Self::with_config(authorization, LocationConfig::default())
    }

    fn with_config(authorization: AuthorizationState, config: LocationConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
        let sensor = Arc::new(FakeSensor::new(authorization));
        let engine = LocationEngine::new(
            sensor.clone(),
            scheduler.clone(),
            clock.clone(),
            config,
        );
        Self {
            clock,
            scheduler,
            sensor,
            engine,
        }
    }

    fn authorized() -> Self {
        Self::new(AuthorizationState::Authorized)
    }

    fn advance(&self, secs: u64) {
        self.scheduler.advance(Duration::from_secs(secs));
    }

    /// A sample captured `age` before the current virtual time.
    fn sample(&self, horizontal_accuracy_m: f64, age: Duration) -> LocationSample {
        LocationSample::with_timestamp(
            53.55,
            9.99,
            horizontal_accuracy_m,
            self.clock.now() - age,
        )
    }

    fn one_shot(
        &self,
        desired: AccuracyLevel,
        timeout_secs: u64,
        deferred: bool,
    ) -> (RequestId, Reports) {
        let (callback, reports) = recorder();
        let request = LocationRequest::one_shot(
            desired,
            Duration::from_secs(timeout_secs),
            deferred,
            callback,
        )
        .unwrap();
        (self.engine.enqueue(request), reports)
    }

    fn subscription(&self, desired: AccuracyLevel) -> (RequestId, Reports) {
        let (callback, reports) = recorder();
        let request = LocationRequest::accuracy_subscription(desired, callback).unwrap();
        (self.engine.enqueue(request), reports)
    }

    fn assert_session_invariant(&self) {
        assert_eq!(
            self.engine.is_session_running(),
            self.engine.live_request_count() > 0
        );
        assert_eq!(self.sensor.is_session_running(), self.engine.is_session_running());
    }
}

type Reports = Arc<Mutex<Vec<LocationReport>>>;

fn recorder() -> (LocationCallback, Reports) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback: LocationCallback = Arc::new(move |report: &LocationReport| {
        sink.lock().push(*report);
    });
    (callback, reports)
}

fn statuses(reports: &Reports) -> Vec<LocationStatus> {
    reports.lock().iter().map(|r| r.status).collect()
}

// ============================================================================
// One-shot requests
// ============================================================================

#[test]
fn test_satisfying_sample_completes_before_timeout() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::Block, 60, false);
    assert!(h.engine.is_session_running());

    h.advance(5);
    let sample = h.sample(50.0, Duration::from_secs(1));
    h.engine.handle_location(sample);

    {
        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, LocationStatus::Success);
        assert_eq!(reports[0].achieved_accuracy, AccuracyLevel::Block);
        assert_eq!(reports[0].location, Some(sample));
    }
    assert!(!h.engine.is_live(id));
    assert!(!h.engine.is_session_running());
    assert_eq!(h.scheduler.pending_count(), 0);

    h.advance(60);
    assert_eq!(reports.lock().len(), 1);
}

#[test]
fn test_insufficient_sample_leaves_request_pending() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::House, 30, false);

    h.engine.handle_location(h.sample(50.0, Duration::ZERO));

    assert!(reports.lock().is_empty());
    assert!(h.engine.is_live(id));
    h.assert_session_invariant();
}

#[test]
fn test_timeout_reports_last_known_sample() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::Room, 10, false);

    let sample = h.sample(50.0, Duration::ZERO);
    h.engine.handle_location(sample);
    h.advance(10);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, LocationStatus::TimedOut);
    assert_eq!(reports[0].location, Some(sample));
    // 50 m, 10 s old at the deadline
    assert_eq!(reports[0].achieved_accuracy, AccuracyLevel::Block);
    assert!(!h.engine.is_live(id));
    assert!(!h.engine.is_session_running());
}

#[test]
fn test_timeout_without_any_sample() {
    let h = Harness::authorized();
    let (_, reports) = h.one_shot(AccuracyLevel::Room, 10, false);

    h.advance(9);
    assert!(reports.lock().is_empty());
    h.advance(1);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, LocationStatus::TimedOut);
    assert_eq!(reports[0].location, None);
    assert_eq!(reports[0].achieved_accuracy, AccuracyLevel::None);
}

#[test]
fn test_zero_timeout_waits_indefinitely() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::City, 0, false);

    h.advance(3600);
    assert!(reports.lock().is_empty());
    assert!(h.engine.is_live(id));
    assert_eq!(h.engine.time_alive(id), Some(Duration::ZERO));
}

#[test]
fn test_sample_and_timer_at_same_instant_fire_once() {
    let h = Harness::authorized();
    let (_, reports) = h.one_shot(AccuracyLevel::City, 10, false);

    h.clock.advance(Duration::from_secs(10));
    h.engine.handle_location(h.sample(100.0, Duration::ZERO));
    h.advance(0);
    h.advance(10);

    assert_eq!(statuses(&reports), vec![LocationStatus::Success]);
}

#[test]
fn test_time_alive_tracks_timer() {
    let h = Harness::authorized();
    let (id, _) = h.one_shot(AccuracyLevel::City, 30, false);

    h.advance(7);
    assert_eq!(h.engine.time_alive(id), Some(Duration::from_secs(7)));
    assert_eq!(h.engine.time_alive(RequestId::next()), None);
}

// ============================================================================
// Authorization
// ============================================================================

#[test]
fn test_denial_completes_all_live_requests() {
    let h = Harness::authorized();
    let (_, first) = h.one_shot(AccuracyLevel::Block, 60, false);
    let (_, second) = h.one_shot(AccuracyLevel::Room, 60, false);
    let (_, subscription) = h.subscription(AccuracyLevel::House);
    assert_eq!(h.engine.live_request_count(), 3);

    h.sensor.set_authorization(AuthorizationState::Denied);
    h.engine.handle_authorization_change(AuthorizationState::Denied);

    for reports in [&first, &second, &subscription] {
        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, LocationStatus::ServicesDenied);
        assert_eq!(reports[0].location, None);
        assert_eq!(reports[0].achieved_accuracy, AccuracyLevel::None);
    }
    assert_eq!(h.engine.live_request_count(), 0);
    assert!(!h.engine.is_session_running());
    assert!(!h.sensor.is_session_running());
    assert_eq!(h.scheduler.pending_count(), 0);
}

#[test]
fn test_restricted_and_disabled_map_to_matching_status() {
    for (state, status) in [
        (
            AuthorizationState::Restricted,
            LocationStatus::ServicesRestricted,
        ),
        (
            AuthorizationState::ServicesDisabled,
            LocationStatus::ServicesDisabled,
        ),
    ] {
        let h = Harness::authorized();
        let (_, reports) = h.one_shot(AccuracyLevel::City, 10, false);
        h.engine.handle_authorization_change(state);
        assert_eq!(statuses(&reports), vec![status]);
    }
}

#[test]
fn test_enqueue_while_denied_completes_immediately() {
    let h = Harness::new(AuthorizationState::Denied);
    let (id, reports) = h.one_shot(AccuracyLevel::Block, 10, false);

    assert_eq!(statuses(&reports), vec![LocationStatus::ServicesDenied]);
    assert!(!h.engine.is_live(id));
    assert_eq!(h.sensor.session_starts(), 0);
    assert_eq!(h.scheduler.pending_count(), 0);
}

#[test]
fn test_deferred_timeout_starts_on_authorization() {
    let h = Harness::new(AuthorizationState::NotDetermined);
    let (id, reports) = h.one_shot(AccuracyLevel::Block, 10, true);

    assert_eq!(h.sensor.authorization_requests(), 1);
    assert!(h.engine.is_session_running());
    assert_eq!(h.scheduler.pending_count(), 0);

    h.advance(3);
    h.sensor.set_authorization(AuthorizationState::Authorized);
    h.engine.handle_authorization_change(AuthorizationState::Authorized);
    assert_eq!(h.scheduler.pending_count(), 1);
    assert_eq!(h.engine.time_alive(id), Some(Duration::ZERO));

    h.advance(9);
    assert!(reports.lock().is_empty());
    h.advance(1);

    assert_eq!(statuses(&reports), vec![LocationStatus::TimedOut]);
    assert_eq!(h.clock.elapsed(), Duration::from_secs(13));
}

#[test]
fn test_deferred_timeout_starts_immediately_when_resolved() {
    let h = Harness::authorized();
    let (_, reports) = h.one_shot(AccuracyLevel::Block, 10, true);

    assert_eq!(h.scheduler.pending_count(), 1);
    h.advance(10);
    assert_eq!(statuses(&reports), vec![LocationStatus::TimedOut]);
}

#[test]
fn test_timeout_while_not_determined() {
    let h = Harness::new(AuthorizationState::NotDetermined);
    let (_, reports) = h.one_shot(AccuracyLevel::Block, 5, false);

    h.advance(5);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, LocationStatus::ServicesNotDetermined);
    assert_eq!(reports[0].location, None);
}

#[test]
fn test_not_determined_event_affects_nothing() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::Block, 10, false);

    h.engine
        .handle_authorization_change(AuthorizationState::NotDetermined);

    assert!(reports.lock().is_empty());
    assert!(h.engine.is_live(id));
    assert_eq!(h.engine.authorization(), AuthorizationState::NotDetermined);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_subscription_fires_on_every_sample_until_canceled() {
    let h = Harness::authorized();
    let (id, reports) = h.subscription(AccuracyLevel::Room);

    h.engine.handle_location(h.sample(3000.0, Duration::ZERO));
    h.engine.handle_location(h.sample(2.0, Duration::ZERO));
    h.engine.handle_location(h.sample(400.0, Duration::from_secs(100)));

    {
        let reports = reports.lock();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.status == LocationStatus::Success));
        assert_eq!(reports[0].achieved_accuracy, AccuracyLevel::City);
        assert_eq!(reports[1].achieved_accuracy, AccuracyLevel::Room);
    }
    assert!(h.engine.is_live(id));

    assert!(h.engine.cancel(id));
    h.engine.handle_location(h.sample(2.0, Duration::ZERO));
    assert_eq!(reports.lock().len(), 3);
    h.assert_session_invariant();
}

#[test]
fn test_force_complete_subscription_reports_success() {
    let h = Harness::authorized();
    let (id, reports) = h.subscription(AccuracyLevel::Block);
    let sample = h.sample(20.0, Duration::ZERO);
    h.engine.handle_location(sample);

    assert!(h.engine.force_complete(id));

    let reports = reports.lock();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].status, LocationStatus::Success);
    assert_eq!(reports[1].location, Some(sample));
    assert!(!h.engine.is_live(id));
    assert!(!h.engine.is_session_running());
}

#[test]
fn test_sensor_failure_ends_subscriptions_only() {
    let h = Harness::authorized();
    let (one_shot, one_shot_reports) = h.one_shot(AccuracyLevel::Block, 10, false);
    let (subscription, subscription_reports) = h.subscription(AccuracyLevel::Block);

    h.engine
        .handle_sensor_failure(&SensorError::new("location unknown"));

    assert_eq!(statuses(&subscription_reports), vec![LocationStatus::Error]);
    assert!(!h.engine.is_live(subscription));
    assert!(one_shot_reports.lock().is_empty());
    assert!(h.engine.is_live(one_shot));

    h.advance(10);
    assert_eq!(statuses(&one_shot_reports), vec![LocationStatus::TimedOut]);
}

#[test]
fn test_significant_change_session_config() {
    let h = Harness::authorized();
    let (callback, reports) = recorder();
    let id = h
        .engine
        .enqueue(LocationRequest::significant_change_subscription(callback));

    let config = h.sensor.session_config().unwrap();
    assert_eq!(config.accuracy, None);
    assert!(config.significant_changes);

    h.engine.handle_location(h.sample(800.0, Duration::ZERO));
    assert_eq!(statuses(&reports), vec![LocationStatus::Success]);

    h.engine.cancel(id);
    assert!(!h.sensor.is_session_running());
}

// ============================================================================
// Cancel / force-complete
// ============================================================================

#[test]
fn test_cancel_is_silent_and_idempotent() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::Block, 10, false);

    assert!(h.engine.cancel(id));
    assert!(!h.engine.cancel(id));
    assert!(!h.engine.force_complete(id));
    h.advance(20);

    assert!(reports.lock().is_empty());
    assert!(!h.engine.is_session_running());
}

#[test]
fn test_force_complete_fires_once() {
    let h = Harness::authorized();
    let (id, reports) = h.one_shot(AccuracyLevel::Room, 10, false);

    assert!(h.engine.force_complete(id));
    assert!(!h.engine.force_complete(id));
    assert!(!h.engine.cancel(id));
    h.advance(20);

    assert_eq!(statuses(&reports), vec![LocationStatus::TimedOut]);
}

#[test]
fn test_unknown_ids_are_noops() {
    let h = Harness::authorized();
    let unknown = RequestId::next();
    assert!(!h.engine.cancel(unknown));
    assert!(!h.engine.force_complete(unknown));
    assert_eq!(h.sensor.session_starts(), 0);
}

// ============================================================================
// Session management
// ============================================================================

#[test]
fn test_session_runs_iff_requests_live() {
    let h = Harness::authorized();
    h.assert_session_invariant();

    let (a, _) = h.one_shot(AccuracyLevel::City, 10, false);
    h.assert_session_invariant();
    let (b, _) = h.subscription(AccuracyLevel::Block);
    h.assert_session_invariant();
    let (_c, _) = h.one_shot(AccuracyLevel::Room, 5, false);
    h.assert_session_invariant();

    h.advance(5);
    h.assert_session_invariant();
    h.engine.cancel(a);
    h.assert_session_invariant();
    h.engine.force_complete(b);
    h.assert_session_invariant();
    assert!(!h.engine.is_session_running());
    assert_eq!(h.sensor.session_stops(), 1);
}

#[test]
fn test_session_follows_finest_desired_accuracy() {
    let h = Harness::with_config(
        AuthorizationState::Authorized,
        LocationConfig::new().with_distance_filter_m(25.0),
    );
    let (_, _) = h.one_shot(AccuracyLevel::City, 30, false);
    assert_eq!(
        h.engine.session_config().and_then(|c| c.accuracy),
        Some(AccuracyLevel::City)
    );

    let (room, _) = h.one_shot(AccuracyLevel::Room, 30, false);
    let config = h.sensor.session_config().unwrap();
    assert_eq!(config.accuracy, Some(AccuracyLevel::Room));
    assert_eq!(config.distance_filter, DistanceFilter::Meters(25.0));

    h.engine.cancel(room);
    assert_eq!(
        h.sensor.session_config().and_then(|c| c.accuracy),
        Some(AccuracyLevel::City)
    );
    assert_eq!(h.sensor.session_starts(), 3);
}

#[test]
fn test_last_sample_keeps_freshest() {
    let h = Harness::authorized();
    let fresh = h.sample(30.0, Duration::ZERO);
    let stale = h.sample(5.0, Duration::from_secs(30));

    h.engine.handle_location(fresh);
    h.engine.handle_location(stale);

    assert_eq!(h.engine.last_sample(), Some(fresh));
}

// ============================================================================
// Reentrancy
// ============================================================================

#[test]
fn test_callback_can_cancel_later_request() {
    let h = Harness::authorized();
    let (_, victim_reports) = recorder();
    let victim_slot: Arc<Mutex<Option<RequestId>>> = Arc::new(Mutex::new(None));

    let engine = h.engine.clone();
    let slot = Arc::clone(&victim_slot);
    let canceler: LocationCallback = Arc::new(move |_: &LocationReport| {
        if let Some(id) = slot.lock().take() {
            engine.cancel(id);
        }
    });
    h.engine.enqueue(LocationRequest::accuracy_subscription(AccuracyLevel::City, canceler).unwrap());

    let victim = LocationRequest::accuracy_subscription(AccuracyLevel::City, {
        let sink = Arc::clone(&victim_reports);
        Arc::new(move |r: &LocationReport| sink.lock().push(*r))
    })
    .unwrap();
    *victim_slot.lock() = Some(h.engine.enqueue(victim));

    h.engine.handle_location(h.sample(10.0, Duration::ZERO));

    assert!(victim_reports.lock().is_empty());
    assert_eq!(h.engine.live_request_count(), 1);
}

#[test]
fn test_callback_can_enqueue_during_event() {
    let h = Harness::authorized();
    let (_, follow_up_reports) = recorder();

    let engine = h.engine.clone();
    let sink = Arc::clone(&follow_up_reports);
    let chaining: LocationCallback = Arc::new(move |_: &LocationReport| {
        let sink = Arc::clone(&sink);
        let follow_up = LocationRequest::one_shot(
            AccuracyLevel::City,
            Duration::from_secs(10),
            false,
            Arc::new(move |r: &LocationReport| sink.lock().push(*r)),
        )
        .unwrap();
        engine.enqueue(follow_up);
    });
    h.engine.enqueue(
        LocationRequest::one_shot(AccuracyLevel::City, Duration::from_secs(10), false, chaining)
            .unwrap(),
    );

    h.engine.handle_location(h.sample(10.0, Duration::ZERO));

    // The follow-up joined after the snapshot, so this sample is not applied to it.
    assert!(follow_up_reports.lock().is_empty());
    assert_eq!(h.engine.live_request_count(), 1);
    h.assert_session_invariant();

    h.engine.handle_location(h.sample(10.0, Duration::ZERO));
    assert_eq!(statuses(&follow_up_reports), vec![LocationStatus::Success]);
    h.assert_session_invariant();
}

// ============================================================================
// Headings
// ============================================================================

fn heading_recorder() -> (HeadingCallback, Arc<Mutex<Vec<HeadingReport>>>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback: HeadingCallback = Arc::new(move |r: &HeadingReport| sink.lock().push(*r));
    (callback, reports)
}

#[test]
fn test_heading_unavailable_fires_once() {
    let h = Harness::authorized();
    let (callback, reports) = heading_recorder();

    let id = h.engine.subscribe_heading(callback);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, HeadingStatus::Unavailable);
    assert!(!h.engine.is_live(id));
    assert!(!h.sensor.is_heading_running());
}

#[test]
fn test_heading_subscription_lifecycle() {
    let h = Harness::authorized();
    h.sensor.set_heading_available(true);
    let (callback, reports) = heading_recorder();

    let id = h.engine.subscribe_heading(callback);
    assert!(h.sensor.is_heading_running());
    assert!(h.engine.is_heading_session_running());

    h.engine
        .handle_heading(HeadingSample::new(90.0, 92.0, 5.0));
    h.engine
        .handle_heading(HeadingSample::new(91.0, 93.0, -1.0));

    // Location authorization does not touch headings.
    h.engine.handle_authorization_change(AuthorizationState::Denied);
    assert!(h.engine.is_live(id));

    assert!(h.engine.cancel(id));
    h.engine
        .handle_heading(HeadingSample::new(92.0, 94.0, 5.0));

    let statuses: Vec<_> = reports.lock().iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![HeadingStatus::Success, HeadingStatus::Invalid]);
    assert!(!h.sensor.is_heading_running());
    assert_eq!(h.engine.live_heading_count(), 0);
    assert_eq!(
        h.engine.last_heading().map(|s| s.true_heading),
        Some(92.0)
    );
}

#[test]
fn test_handle_event_dispatches() {
    let h = Harness::authorized();
    let (_, reports) = h.one_shot(AccuracyLevel::City, 10, false);

    h.engine
        .handle_event(SensorEvent::Location(h.sample(100.0, Duration::ZERO)));

    assert_eq!(statuses(&reports), vec![LocationStatus::Success]);
}
