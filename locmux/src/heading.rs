//! Compass heading subscriptions.
//!
//! Heading updates run on their own sensor session, independent of the
//! location session and of location authorization. A subscription stays live
//! until it is canceled.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::request::RequestId;

/// A single compass reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    /// Degrees relative to true north.
    pub true_heading: f64,
    /// Degrees relative to magnetic north.
    pub magnetic_heading: f64,
    /// Maximum deviation in degrees. Negative means the reading is invalid.
    pub accuracy_deg: f64,
    pub timestamp: Instant,
}

impl HeadingSample {
    pub fn new(true_heading: f64, magnetic_heading: f64, accuracy_deg: f64) -> Self {
        Self {
            true_heading,
            magnetic_heading,
            accuracy_deg,
            timestamp: Instant::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the reading carries a usable accuracy.
    pub fn is_valid(&self) -> bool {
        self.accuracy_deg >= 0.0
    }
}

/// Outcome reported to a heading callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingStatus {
    Success,
    /// The reading had a negative accuracy.
    Invalid,
    /// The device cannot report headings.
    Unavailable,
}

impl fmt::Display for HeadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeadingStatus::Success => "success",
            HeadingStatus::Invalid => "invalid",
            HeadingStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Values handed to a heading callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReport {
    pub heading: Option<HeadingSample>,
    pub status: HeadingStatus,
}

impl HeadingReport {
    /// Report for an incoming reading, `Invalid` when its accuracy is negative.
    pub fn from_sample(sample: HeadingSample) -> Self {
        let status = if sample.is_valid() {
            HeadingStatus::Success
        } else {
            HeadingStatus::Invalid
        };
        Self {
            heading: Some(sample),
            status,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            heading: None,
            status: HeadingStatus::Unavailable,
        }
    }
}

/// Callback receiving heading updates.
pub type HeadingCallback = Arc<dyn Fn(&HeadingReport) + Send + Sync>;

/// One live heading subscription.
pub struct HeadingRequest {
    id: RequestId,
    callback: HeadingCallback,
}

impl fmt::Debug for HeadingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadingRequest")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl HeadingRequest {
    pub fn new(callback: HeadingCallback) -> Self {
        Self {
            id: RequestId::next(),
            callback,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn callback(&self) -> HeadingCallback {
        Arc::clone(&self.callback)
    }
}
