//! Configuration for the location manager.

use std::fmt;

/// Minimum movement before the sensor reports a new sample.
///
/// Passed through unmodified to the sensor session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DistanceFilter {
    /// Report every update regardless of movement.
    #[default]
    None,
    /// Report only after moving at least this many meters.
    Meters(f64),
}

impl DistanceFilter {
    /// Filter distance in meters, `None` when unfiltered.
    pub fn meters(&self) -> Option<f64> {
        match self {
            DistanceFilter::None => None,
            DistanceFilter::Meters(m) => Some(*m),
        }
    }
}

impl fmt::Display for DistanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceFilter::None => write!(f, "none"),
            DistanceFilter::Meters(m) => write!(f, "{:.1}m", m),
        }
    }
}

/// Location manager configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationConfig {
    /// Distance filter applied to every sensor session.
    pub distance_filter: DistanceFilter,
}

impl LocationConfig {
    /// Create a configuration with defaults (no distance filter).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distance filter in meters. Non-positive or non-finite values
    /// disable filtering.
    pub fn with_distance_filter_m(mut self, meters: f64) -> Self {
        self.distance_filter = if meters.is_finite() && meters > 0.0 {
            DistanceFilter::Meters(meters)
        } else {
            DistanceFilter::None
        };
        self
    }
}
