//! Bookkeeping for live requests and sensor state.
//!
//! The registry is plain data guarded by the engine's mutex. It never calls
//! callbacks or talks to the sensor; the engine does both after deciding what
//! changed here.

use std::collections::BTreeMap;

use crate::accuracy::AccuracyLevel;
use crate::config::DistanceFilter;
use crate::heading::{HeadingRequest, HeadingSample};
use crate::location::LocationSample;
use crate::request::{LocationRequest, RequestId, RequestKind};
use crate::sensor::SessionConfig;
use crate::status::AuthorizationState;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    requests: BTreeMap<RequestId, LocationRequest>,
    headings: BTreeMap<RequestId, HeadingRequest>,
    last_sample: Option<LocationSample>,
    last_heading: Option<HeadingSample>,
    /// Configuration of the running location session, `None` when stopped.
    pub session: Option<SessionConfig>,
    pub heading_running: bool,
    pub authorization: AuthorizationState,
}

impl Registry {
    pub fn new(authorization: AuthorizationState) -> Self {
        Self {
            authorization,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, request: LocationRequest) {
        self.requests.insert(request.id(), request);
    }

    pub fn remove(&mut self, id: RequestId) -> Option<LocationRequest> {
        self.requests.remove(&id)
    }

    pub fn get(&self, id: RequestId) -> Option<&LocationRequest> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut LocationRequest> {
        self.requests.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Snapshot of live location request IDs in ascending order.
    pub fn ids(&self) -> Vec<RequestId> {
        self.requests.keys().copied().collect()
    }

    /// IDs of deferred requests whose countdown has not begun.
    pub fn pending_deferred(&self) -> Vec<RequestId> {
        self.requests
            .values()
            .filter(|r| r.is_deferred() && !r.has_timer_started())
            .map(LocationRequest::id)
            .collect()
    }

    pub fn last_sample(&self) -> Option<LocationSample> {
        self.last_sample
    }

    /// Keep `sample` if it is at least as fresh as the current best.
    /// Returns whether it was kept.
    pub fn record_sample(&mut self, sample: LocationSample) -> bool {
        match &self.last_sample {
            Some(best) if !sample.is_at_least_as_fresh_as(best) => false,
            _ => {
                self.last_sample = Some(sample);
                true
            }
        }
    }

    /// Session configuration the live set needs, `None` when it is empty.
    pub fn desired_session(&self, distance_filter: DistanceFilter) -> Option<SessionConfig> {
        if self.requests.is_empty() {
            return None;
        }

        let mut accuracy: Option<AccuracyLevel> = None;
        let mut significant_changes = false;
        for request in self.requests.values() {
            match request.kind() {
                RequestKind::SignificantChangeSubscription => significant_changes = true,
                RequestKind::OneShot | RequestKind::AccuracySubscription => {
                    let desired = request.desired_accuracy();
                    accuracy = Some(accuracy.map_or(desired, |a| a.max(desired)));
                }
            }
        }

        Some(SessionConfig {
            accuracy,
            significant_changes,
            distance_filter,
        })
    }

    pub fn insert_heading(&mut self, request: HeadingRequest) {
        self.headings.insert(request.id(), request);
    }

    pub fn remove_heading(&mut self, id: RequestId) -> Option<HeadingRequest> {
        self.headings.remove(&id)
    }

    pub fn get_heading(&self, id: RequestId) -> Option<&HeadingRequest> {
        self.headings.get(&id)
    }

    pub fn heading_len(&self) -> usize {
        self.headings.len()
    }

    pub fn heading_ids(&self) -> Vec<RequestId> {
        self.headings.keys().copied().collect()
    }

    pub fn last_heading(&self) -> Option<HeadingSample> {
        self.last_heading
    }

    pub fn record_heading(&mut self, sample: HeadingSample) {
        self.last_heading = Some(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::LocationCallback;
    use crate::status::LocationReport;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn noop() -> LocationCallback {
        Arc::new(|_: &LocationReport| {})
    }

    fn one_shot(level: AccuracyLevel) -> LocationRequest {
        LocationRequest::one_shot(level, Duration::from_secs(10), false, noop()).unwrap()
    }

    #[test]
    fn test_empty_registry_wants_no_session() {
        let registry = Registry::default();
        assert_eq!(registry.desired_session(DistanceFilter::None), None);
    }

    #[test]
    fn test_session_uses_finest_desired_accuracy() {
        let mut registry = Registry::default();
        registry.insert(one_shot(AccuracyLevel::City));
        registry.insert(one_shot(AccuracyLevel::House));
        registry.insert(one_shot(AccuracyLevel::Block));

        let session = registry
            .desired_session(DistanceFilter::Meters(10.0))
            .unwrap();
        assert_eq!(session.accuracy, Some(AccuracyLevel::House));
        assert!(!session.significant_changes);
        assert_eq!(session.distance_filter, DistanceFilter::Meters(10.0));
    }

    #[test]
    fn test_significant_changes_only_session() {
        let mut registry = Registry::default();
        registry.insert(LocationRequest::significant_change_subscription(noop()));

        let session = registry.desired_session(DistanceFilter::None).unwrap();
        assert_eq!(session.accuracy, None);
        assert!(session.significant_changes);
    }

    #[test]
    fn test_ids_are_ascending() {
        let mut registry = Registry::default();
        let a = one_shot(AccuracyLevel::City);
        let b = one_shot(AccuracyLevel::City);
        let (a_id, b_id) = (a.id(), b.id());
        registry.insert(b);
        registry.insert(a);
        assert_eq!(registry.ids(), vec![a_id, b_id]);
    }

    #[test]
    fn test_record_sample_keeps_freshest() {
        let t0 = Instant::now();
        let mut registry = Registry::default();
        let newer = LocationSample::with_timestamp(1.0, 1.0, 50.0, t0 + Duration::from_secs(2));
        let older = LocationSample::with_timestamp(2.0, 2.0, 5.0, t0);

        assert!(registry.record_sample(newer));
        assert!(!registry.record_sample(older));
        assert_eq!(registry.last_sample(), Some(newer));
    }

    #[test]
    fn test_pending_deferred_excludes_started_timers() {
        let mut registry = Registry::default();
        let deferred =
            LocationRequest::one_shot(AccuracyLevel::City, Duration::from_secs(5), true, noop())
                .unwrap();
        let id = deferred.id();
        registry.insert(deferred);
        registry.insert(one_shot(AccuracyLevel::City));

        assert_eq!(registry.pending_deferred(), vec![id]);
    }
}
