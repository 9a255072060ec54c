//! Boundary with the platform location sensor.
//!
//! The engine consumes exactly four things from the sensor:
//!
//! 1. Location samples ([`SensorEvent::Location`])
//! 2. Authorization changes ([`SensorEvent::Authorization`])
//! 3. Session control ([`LocationSensor::start_session`], [`LocationSensor::stop_session`])
//! 4. A synchronous authorization query ([`LocationSensor::authorization_state`])
//!
//! Heading updates and sensor failures travel over the same event enum.
//!
//! # Threading
//!
//! Platform sensors usually deliver on their own thread. Adapters must not
//! call back into the engine from inside the control methods below; they
//! push [`SensorEvent`]s into a channel that
//! [`LocationManager::spawn_event_loop`](crate::LocationManager::spawn_event_loop)
//! drains one event at a time.

mod fake;

pub use fake::FakeSensor;

use thiserror::Error;

use crate::accuracy::AccuracyLevel;
use crate::config::DistanceFilter;
use crate::heading::HeadingSample;
use crate::location::LocationSample;
use crate::status::AuthorizationState;

/// How the sensor session should run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Accuracy to configure standard updates for; `None` when only
    /// significant-change monitoring is needed.
    pub accuracy: Option<AccuracyLevel>,
    /// Whether significant-change monitoring is needed.
    pub significant_changes: bool,
    /// Minimum movement between reported samples.
    pub distance_filter: DistanceFilter,
}

/// Opaque failure surfaced by the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Location sensor failure: {message}")]
pub struct SensorError {
    message: String,
}

impl SensorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Event delivered by the sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// A new location sample.
    Location(LocationSample),
    /// The authorization/enablement state changed.
    Authorization(AuthorizationState),
    /// The sensor failed to produce a location.
    Failure(SensorError),
    /// A new compass heading.
    Heading(HeadingSample),
}

/// Control surface of the platform location sensor.
///
/// All methods must be cheap and non-blocking. `start_session` and
/// `stop_session` are idempotent; calling `start_session` on a running
/// session applies the new configuration.
pub trait LocationSensor: Send + Sync {
    /// Start (or reconfigure) the location session.
    fn start_session(&self, config: &SessionConfig);

    /// Stop the location session.
    fn stop_session(&self);

    /// Current authorization/enablement state.
    fn authorization_state(&self) -> AuthorizationState;

    /// Ask the platform to show its permission prompt.
    ///
    /// The answer arrives later as [`SensorEvent::Authorization`].
    fn request_authorization(&self) {}

    /// Whether the device can report compass headings.
    fn heading_available(&self) -> bool {
        false
    }

    /// Start heading updates.
    fn start_heading_updates(&self) {}

    /// Stop heading updates.
    fn stop_heading_updates(&self) {}
}
