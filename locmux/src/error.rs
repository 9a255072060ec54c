//! Library error types.
//!
//! Runtime outcomes (timeouts, denied authorization, sensor failures) are not
//! errors at this level: they are delivered through request callbacks as a
//! [`LocationStatus`](crate::LocationStatus). `LocationError` only covers
//! misuse of the API that can be detected synchronously.

use thiserror::Error;

use crate::accuracy::AccuracyLevel;

/// Errors returned synchronously by the request API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The desired accuracy was `None`, which no sample can be held against.
    #[error("Invalid desired accuracy: {0} (must be city or finer)")]
    InvalidDesiredAccuracy(AccuracyLevel),
}
