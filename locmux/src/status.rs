//! Request outcomes and authorization state.

use std::fmt;

use serde::Serialize;

use crate::accuracy::AccuracyLevel;
use crate::location::LocationSample;

/// Outcome reported to a request callback.
///
/// `Success` and `TimedOut` accompany a (possibly stale) location. The
/// `Services*` statuses and `Error` accompany no location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    /// Desired accuracy reached (or a subscription update).
    Success,
    /// Desired accuracy not reached before the timeout.
    TimedOut,
    /// The user has not answered the permission prompt yet.
    ServicesNotDetermined,
    /// The user denied this app access to location services.
    ServicesDenied,
    /// Access is blocked by policy (parental controls, MDM, ...).
    ServicesRestricted,
    /// Location services are off device-wide.
    ServicesDisabled,
    /// The sensor reported a failure.
    Error,
}

impl LocationStatus {
    /// Whether this status is one of the error outcomes.
    pub fn is_error(&self) -> bool {
        !matches!(self, LocationStatus::Success | LocationStatus::TimedOut)
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationStatus::Success => "success",
            LocationStatus::TimedOut => "timed out",
            LocationStatus::ServicesNotDetermined => "services not determined",
            LocationStatus::ServicesDenied => "services denied",
            LocationStatus::ServicesRestricted => "services restricted",
            LocationStatus::ServicesDisabled => "services disabled",
            LocationStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Authorization/enablement state as reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
    /// Location services are switched off system-wide.
    ServicesDisabled,
}

impl AuthorizationState {
    /// Whether the user has answered the prompt (or policy decided for them).
    pub fn is_resolved(&self) -> bool {
        *self != AuthorizationState::NotDetermined
    }

    /// Whether location updates may flow.
    pub fn is_authorized(&self) -> bool {
        *self == AuthorizationState::Authorized
    }

    /// Terminal failure status for this state, if it forbids location access.
    pub fn failure_status(&self) -> Option<LocationStatus> {
        match self {
            AuthorizationState::Denied => Some(LocationStatus::ServicesDenied),
            AuthorizationState::Restricted => Some(LocationStatus::ServicesRestricted),
            AuthorizationState::ServicesDisabled => Some(LocationStatus::ServicesDisabled),
            AuthorizationState::NotDetermined | AuthorizationState::Authorized => None,
        }
    }

    /// Caller-facing summary of this state.
    pub fn services_state(&self) -> ServicesState {
        match self {
            AuthorizationState::NotDetermined => ServicesState::Unavailable,
            AuthorizationState::Denied => ServicesState::Denied,
            AuthorizationState::Restricted => ServicesState::Restricted,
            AuthorizationState::ServicesDisabled => ServicesState::Disabled,
            AuthorizationState::Authorized => ServicesState::Available,
        }
    }
}

/// Availability of location services for this app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicesState {
    /// Authorization has not been determined yet.
    Unavailable,
    Denied,
    Restricted,
    Disabled,
    Available,
}

/// Values handed to a location callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationReport {
    /// Most recent and accurate location available, if any.
    pub location: Option<LocationSample>,
    /// Accuracy level the location actually satisfies.
    pub achieved_accuracy: AccuracyLevel,
    pub status: LocationStatus,
}

impl LocationReport {
    pub fn new(
        location: Option<LocationSample>,
        achieved_accuracy: AccuracyLevel,
        status: LocationStatus,
    ) -> Self {
        Self {
            location,
            achieved_accuracy,
            status,
        }
    }

    /// A report carrying no location.
    pub fn failure(status: LocationStatus) -> Self {
        Self::new(None, AccuracyLevel::None, status)
    }
}
