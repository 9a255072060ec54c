//! Locmux - location request multiplexing
//!
//! This library lets many independent callers ask a single device location
//! sensor for "the current location" (one-shot requests with a desired
//! accuracy and optional timeout) or for a stream of updates (subscriptions),
//! while only one physical sensing session runs at a time. The session is
//! started when the first request arrives and stopped as soon as the last one
//! completes, to keep power draw down.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LocationManager                            │
//! │   request_location / subscribe_* / force_complete / cancel        │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LocationEngine                             │
//! │                                                                   │
//! │   Registry (live requests, last sample, session state)            │
//! │        ▲                    │                     │               │
//! │        │ SensorEvent        │ start/stop          │ schedule      │
//! └────────┼────────────────────┼─────────────────────┼──────────────┘
//!          │                    ▼                     ▼
//!   ┌──────┴──────────────────────────┐     ┌──────────────────┐
//!   │          LocationSensor          │     │  TimerScheduler  │
//!   │  (platform adapter / FakeSensor) │     │ (tokio / manual) │
//!   └──────────────────────────────────┘     └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use locmux::{AccuracyLevel, LocationConfig, LocationManager};
//! use std::time::Duration;
//!
//! let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
//! let sensor = Arc::new(MyPlatformSensor::new(events_tx));
//! let manager = LocationManager::new(sensor, LocationConfig::default());
//! manager.spawn_event_loop(events_rx, CancellationToken::new());
//!
//! let id = manager.request_location(
//!     AccuracyLevel::Block,
//!     Duration::from_secs(10),
//!     false,
//!     |report| println!("{:?}: {:?}", report.status, report.location),
//! )?;
//! ```

pub mod accuracy;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod heading;
pub mod location;
pub mod manager;
mod registry;
pub mod request;
pub mod sensor;
pub mod status;
pub mod timer;

pub use accuracy::{achieved_accuracy, AccuracyLevel, AccuracyThresholds};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DistanceFilter, LocationConfig};
pub use engine::LocationEngine;
pub use error::LocationError;
pub use heading::{HeadingCallback, HeadingReport, HeadingSample, HeadingStatus};
pub use location::LocationSample;
pub use manager::LocationManager;
pub use request::{LocationCallback, LocationRequest, RequestId, RequestKind};
pub use sensor::{FakeSensor, LocationSensor, SensorError, SensorEvent, SessionConfig};
pub use status::{AuthorizationState, LocationReport, LocationStatus, ServicesState};
pub use timer::{ManualScheduler, TimerAction, TimerHandle, TimerScheduler, TokioScheduler};
