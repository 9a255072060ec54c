//! Location samples delivered by the sensor.

use std::time::{Duration, Instant};

use crate::accuracy::{achieved_accuracy, AccuracyLevel};

/// A single location reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius of uncertainty in meters. Negative means the reading is invalid.
    pub horizontal_accuracy_m: f64,
    /// When the sensor captured this reading.
    pub timestamp: Instant,
}

impl LocationSample {
    /// Create a sample captured now.
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy_m: f64) -> Self {
        Self::with_timestamp(latitude, longitude, horizontal_accuracy_m, Instant::now())
    }

    /// Create a sample with an explicit capture time.
    pub fn with_timestamp(
        latitude: f64,
        longitude: f64,
        horizontal_accuracy_m: f64,
        timestamp: Instant,
    ) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy_m,
            timestamp,
        }
    }

    /// Time elapsed between capture and `now` (zero if captured "in the future").
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    /// The finest accuracy level this sample satisfies at `now`.
    pub fn achieved_accuracy(&self, now: Instant) -> AccuracyLevel {
        achieved_accuracy(self.horizontal_accuracy_m, self.age(now))
    }

    /// Freshest-wins comparison used to keep the registry's best sample.
    ///
    /// A newer capture wins. Equal capture times prefer the lower (or equal)
    /// horizontal error.
    pub fn is_at_least_as_fresh_as(&self, other: &LocationSample) -> bool {
        if self.timestamp != other.timestamp {
            return self.timestamp > other.timestamp;
        }
        self.horizontal_accuracy_m <= other.horizontal_accuracy_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_saturates() {
        let t0 = Instant::now();
        let sample = LocationSample::with_timestamp(53.55, 9.99, 10.0, t0 + Duration::from_secs(5));
        assert_eq!(sample.age(t0), Duration::ZERO);
        assert_eq!(
            sample.age(t0 + Duration::from_secs(7)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_achieved_accuracy_uses_age_at_now() {
        let t0 = Instant::now();
        let sample = LocationSample::with_timestamp(53.55, 9.99, 4.0, t0);
        assert_eq!(sample.achieved_accuracy(t0), AccuracyLevel::Room);
        assert_eq!(
            sample.achieved_accuracy(t0 + Duration::from_secs(30)),
            AccuracyLevel::Block
        );
    }

    #[test]
    fn test_newer_sample_wins() {
        let t0 = Instant::now();
        let old = LocationSample::with_timestamp(0.0, 0.0, 5.0, t0);
        let new = LocationSample::with_timestamp(0.0, 0.0, 500.0, t0 + Duration::from_secs(1));
        assert!(new.is_at_least_as_fresh_as(&old));
        assert!(!old.is_at_least_as_fresh_as(&new));
    }

    #[test]
    fn test_tie_prefers_lower_error() {
        let t0 = Instant::now();
        let coarse = LocationSample::with_timestamp(0.0, 0.0, 50.0, t0);
        let fine = LocationSample::with_timestamp(0.0, 0.0, 10.0, t0);
        assert!(fine.is_at_least_as_fresh_as(&coarse));
        assert!(!coarse.is_at_least_as_fresh_as(&fine));
        assert!(fine.is_at_least_as_fresh_as(&fine));
    }
}
