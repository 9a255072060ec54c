//! In-memory sensor for tests and demos.

use parking_lot::Mutex;

use super::{LocationSensor, SessionConfig};
use crate::status::AuthorizationState;

#[derive(Debug, Default)]
struct FakeSensorState {
    authorization: AuthorizationState,
    heading_available: bool,
    session: Option<SessionConfig>,
    heading_running: bool,
    session_starts: usize,
    session_stops: usize,
    authorization_requests: usize,
}

/// Deterministic [`LocationSensor`] that records every control call.
///
/// It never produces events by itself: tests feed samples and authorization
/// changes straight into the engine and use this type to assert how the
/// engine drove the session.
#[derive(Debug, Default)]
pub struct FakeSensor {
    state: Mutex<FakeSensorState>,
}

impl FakeSensor {
    /// Create a sensor reporting the given authorization state.
    pub fn new(authorization: AuthorizationState) -> Self {
        let sensor = Self::default();
        sensor.state.lock().authorization = authorization;
        sensor
    }

    /// Create an already-authorized sensor.
    pub fn authorized() -> Self {
        Self::new(AuthorizationState::Authorized)
    }

    /// Change what [`LocationSensor::authorization_state`] returns.
    pub fn set_authorization(&self, authorization: AuthorizationState) {
        self.state.lock().authorization = authorization;
    }

    /// Change what [`LocationSensor::heading_available`] returns.
    pub fn set_heading_available(&self, available: bool) {
        self.state.lock().heading_available = available;
    }

    pub fn is_session_running(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Configuration of the running session, if any.
    pub fn session_config(&self) -> Option<SessionConfig> {
        self.state.lock().session
    }

    pub fn is_heading_running(&self) -> bool {
        self.state.lock().heading_running
    }

    /// Number of `start_session` calls (including reconfigurations).
    pub fn session_starts(&self) -> usize {
        self.state.lock().session_starts
    }

    /// Number of `stop_session` calls.
    pub fn session_stops(&self) -> usize {
        self.state.lock().session_stops
    }

    /// Number of permission prompts requested.
    pub fn authorization_requests(&self) -> usize {
        self.state.lock().authorization_requests
    }
}

impl LocationSensor for FakeSensor {
    fn start_session(&self, config: &SessionConfig) {
        let mut state = self.state.lock();
        state.session = Some(*config);
        state.session_starts += 1;
    }

    fn stop_session(&self) {
        let mut state = self.state.lock();
        state.session = None;
        state.session_stops += 1;
    }

    fn authorization_state(&self) -> AuthorizationState {
        self.state.lock().authorization
    }

    fn request_authorization(&self) {
        self.state.lock().authorization_requests += 1;
    }

    fn heading_available(&self) -> bool {
        self.state.lock().heading_available
    }

    fn start_heading_updates(&self) {
        self.state.lock().heading_running = true;
    }

    fn stop_heading_updates(&self) {
        self.state.lock().heading_running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::AccuracyLevel;
    use crate::config::DistanceFilter;

    #[test]
    fn test_records_session_control() {
        let sensor = FakeSensor::authorized();
        let config = SessionConfig {
            accuracy: Some(AccuracyLevel::Block),
            significant_changes: false,
            distance_filter: DistanceFilter::None,
        };

        sensor.start_session(&config);
        assert!(sensor.is_session_running());
        assert_eq!(sensor.session_config(), Some(config));

        sensor.stop_session();
        assert!(!sensor.is_session_running());
        assert_eq!(sensor.session_starts(), 1);
        assert_eq!(sensor.session_stops(), 1);
    }

    #[test]
    fn test_authorization_is_settable() {
        let sensor = FakeSensor::default();
        assert_eq!(
            sensor.authorization_state(),
            AuthorizationState::NotDetermined
        );
        sensor.set_authorization(AuthorizationState::Denied);
        assert_eq!(sensor.authorization_state(), AuthorizationState::Denied);
    }
}
