//! Accuracy policy.
//!
//! An [`AccuracyLevel`] abstracts both the horizontal accuracy and the recency
//! of a location sample. Each level is strictly tighter than the previous one:
//!
//! ```text
//! Level          horizontal error ≤    sample age ≤
//! City                 5000 m              600 s
//! Neighborhood         1000 m              300 s
//! Block                 100 m               60 s
//! House                  15 m               15 s
//! Room                    5 m                5 s
//! ```
//!
//! Everything in this module is a pure function of its inputs.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Horizontal accuracy threshold for [`AccuracyLevel::City`] (meters).
pub const HORIZONTAL_ACCURACY_CITY_M: f64 = 5000.0;
/// Horizontal accuracy threshold for [`AccuracyLevel::Neighborhood`] (meters).
pub const HORIZONTAL_ACCURACY_NEIGHBORHOOD_M: f64 = 1000.0;
/// Horizontal accuracy threshold for [`AccuracyLevel::Block`] (meters).
pub const HORIZONTAL_ACCURACY_BLOCK_M: f64 = 100.0;
/// Horizontal accuracy threshold for [`AccuracyLevel::House`] (meters).
pub const HORIZONTAL_ACCURACY_HOUSE_M: f64 = 15.0;
/// Horizontal accuracy threshold for [`AccuracyLevel::Room`] (meters).
pub const HORIZONTAL_ACCURACY_ROOM_M: f64 = 5.0;

/// Maximum sample age for [`AccuracyLevel::City`].
pub const STALE_THRESHOLD_CITY: Duration = Duration::from_secs(600);
/// Maximum sample age for [`AccuracyLevel::Neighborhood`].
pub const STALE_THRESHOLD_NEIGHBORHOOD: Duration = Duration::from_secs(300);
/// Maximum sample age for [`AccuracyLevel::Block`].
pub const STALE_THRESHOLD_BLOCK: Duration = Duration::from_secs(60);
/// Maximum sample age for [`AccuracyLevel::House`].
pub const STALE_THRESHOLD_HOUSE: Duration = Duration::from_secs(15);
/// Maximum sample age for [`AccuracyLevel::Room`].
pub const STALE_THRESHOLD_ROOM: Duration = Duration::from_secs(5);

/// Accuracy and recency level of location data.
///
/// `Room` is the highest level, `City` the lowest valid one. `None` is never
/// valid as a *desired* accuracy; as an *achieved* accuracy it means that not
/// even the `City` thresholds were met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyLevel {
    None,
    City,
    Neighborhood,
    Block,
    House,
    Room,
}

/// The (horizontal error, age) bar a sample has to clear for one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyThresholds {
    /// Maximum horizontal error in meters.
    pub max_horizontal_error_m: f64,
    /// Maximum time since the sample was captured.
    pub max_age: Duration,
}

impl AccuracyThresholds {
    /// Whether a sample with the given error and age clears both thresholds.
    pub fn is_satisfied_by(&self, horizontal_error_m: f64, age: Duration) -> bool {
        horizontal_error_m <= self.max_horizontal_error_m && age <= self.max_age
    }
}

impl AccuracyLevel {
    /// Valid desired levels, tightest first.
    pub const DESCENDING: [AccuracyLevel; 5] = [
        AccuracyLevel::Room,
        AccuracyLevel::House,
        AccuracyLevel::Block,
        AccuracyLevel::Neighborhood,
        AccuracyLevel::City,
    ];

    /// Thresholds for this level, or `None` for [`AccuracyLevel::None`].
    pub fn thresholds(&self) -> Option<AccuracyThresholds> {
        let (max_horizontal_error_m, max_age) = match self {
            AccuracyLevel::None => return None,
            AccuracyLevel::City => (HORIZONTAL_ACCURACY_CITY_M, STALE_THRESHOLD_CITY),
            AccuracyLevel::Neighborhood => (
                HORIZONTAL_ACCURACY_NEIGHBORHOOD_M,
                STALE_THRESHOLD_NEIGHBORHOOD,
            ),
            AccuracyLevel::Block => (HORIZONTAL_ACCURACY_BLOCK_M, STALE_THRESHOLD_BLOCK),
            AccuracyLevel::House => (HORIZONTAL_ACCURACY_HOUSE_M, STALE_THRESHOLD_HOUSE),
            AccuracyLevel::Room => (HORIZONTAL_ACCURACY_ROOM_M, STALE_THRESHOLD_ROOM),
        };
        Some(AccuracyThresholds {
            max_horizontal_error_m,
            max_age,
        })
    }

    /// Whether this level may be used as the desired accuracy of a request.
    pub fn is_valid_desired(&self) -> bool {
        *self != AccuracyLevel::None
    }

    /// Short lowercase name, used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyLevel::None => "none",
            AccuracyLevel::City => "city",
            AccuracyLevel::Neighborhood => "neighborhood",
            AccuracyLevel::Block => "block",
            AccuracyLevel::House => "house",
            AccuracyLevel::Room => "room",
        }
    }
}

impl fmt::Display for AccuracyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a sample into the finest level whose thresholds it satisfies.
///
/// Scans from `Room` toward `City` and returns the first match, or
/// [`AccuracyLevel::None`] if even `City` is not met. A negative or NaN
/// horizontal error denotes an invalid reading and always yields `None`.
pub fn achieved_accuracy(horizontal_error_m: f64, age: Duration) -> AccuracyLevel {
    if horizontal_error_m.is_nan() || horizontal_error_m < 0.0 {
        return AccuracyLevel::None;
    }

    AccuracyLevel::DESCENDING
        .into_iter()
        .find(|level| {
            level
                .thresholds()
                .is_some_and(|t| t.is_satisfied_by(horizontal_error_m, age))
        })
        .unwrap_or(AccuracyLevel::None)
}
