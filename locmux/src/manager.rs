//! Public facade.
//!
//! [`LocationManager`] is the entry point applications use. It validates
//! arguments, builds requests, and forwards to the [`LocationEngine`]. It
//! also owns the glue that marshals sensor events from a channel onto the
//! engine, one event at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::accuracy::AccuracyLevel;
use crate::clock::{Clock, SystemClock};
use crate::config::LocationConfig;
use crate::engine::LocationEngine;
use crate::error::LocationError;
use crate::heading::{HeadingCallback, HeadingReport};
use crate::request::{LocationRequest, RequestId};
use crate::sensor::{LocationSensor, SensorEvent};
use crate::status::{LocationReport, ServicesState};
use crate::timer::{TimerScheduler, TokioScheduler};

/// Shares one location sensor among any number of requests.
#[derive(Debug, Clone)]
pub struct LocationManager {
    engine: LocationEngine,
}

impl LocationManager {
    /// Create a manager using wall-clock time and tokio timers.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new(sensor: Arc<dyn LocationSensor>, config: LocationConfig) -> Self {
        Self::with_runtime(
            sensor,
            Arc::new(TokioScheduler::current()),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Create a manager with an explicit scheduler and clock.
    pub fn with_runtime(
        sensor: Arc<dyn LocationSensor>,
        scheduler: Arc<dyn TimerScheduler>,
        clock: Arc<dyn Clock>,
        config: LocationConfig,
    ) -> Self {
        Self {
            engine: LocationEngine::new(sensor, scheduler, clock, config),
        }
    }

    /// The underlying engine, for queries and direct event injection.
    pub fn engine(&self) -> &LocationEngine {
        &self.engine
    }

    /// Ask for the current location once.
    ///
    /// The callback fires exactly once: with `Success` as soon as a sample
    /// meets `desired`, or with `TimedOut` and the best sample so far when
    /// `timeout` elapses. A zero timeout waits indefinitely. With
    /// `delay_until_authorized`, the timeout does not start counting until
    /// the user has answered the permission prompt.
    pub fn request_location<F>(
        &self,
        desired: AccuracyLevel,
        timeout: Duration,
        delay_until_authorized: bool,
        callback: F,
    ) -> Result<RequestId, LocationError>
    where
        F: Fn(&LocationReport) + Send + Sync + 'static,
    {
        let request =
            LocationRequest::one_shot(desired, timeout, delay_until_authorized, Arc::new(callback))?;
        Ok(self.engine.enqueue(request))
    }

    /// Subscribe to every location update at the finest accuracy.
    pub fn subscribe_to_location_updates<F>(&self, callback: F) -> RequestId
    where
        F: Fn(&LocationReport) + Send + Sync + 'static,
    {
        self.engine
            .enqueue(LocationRequest::location_subscription(Arc::new(callback)))
    }

    /// Subscribe to every location update, configuring the sensor for
    /// `desired`.
    ///
    /// Every sample is reported with `Success` regardless of whether it
    /// meets `desired`.
    pub fn subscribe_with_accuracy<F>(
        &self,
        desired: AccuracyLevel,
        callback: F,
    ) -> Result<RequestId, LocationError>
    where
        F: Fn(&LocationReport) + Send + Sync + 'static,
    {
        let request = LocationRequest::accuracy_subscription(desired, Arc::new(callback))?;
        Ok(self.engine.enqueue(request))
    }

    /// Subscribe to significant location changes (low power, coarse).
    pub fn subscribe_to_significant_changes<F>(&self, callback: F) -> RequestId
    where
        F: Fn(&LocationReport) + Send + Sync + 'static,
    {
        self.engine
            .enqueue(LocationRequest::significant_change_subscription(Arc::new(callback)))
    }

    /// Subscribe to compass heading updates.
    pub fn subscribe_to_heading_updates<F>(&self, callback: F) -> RequestId
    where
        F: Fn(&HeadingReport) + Send + Sync + 'static,
    {
        let callback: HeadingCallback = Arc::new(callback);
        self.engine.subscribe_heading(callback)
    }

    /// Complete a request now with the best sample known. No-op for unknown IDs.
    pub fn force_complete(&self, id: RequestId) {
        self.engine.force_complete(id);
    }

    /// Cancel a request; its callback will not fire. No-op for unknown IDs.
    pub fn cancel(&self, id: RequestId) {
        self.engine.cancel(id);
    }

    /// Availability of location services, straight from the sensor.
    pub fn services_state(&self) -> ServicesState {
        self.engine.sensor_authorization().services_state()
    }

    /// Feed sensor events from `events` into the engine until the channel
    /// closes or `shutdown` is cancelled.
    pub fn spawn_event_loop(
        &self,
        mut events: mpsc::UnboundedReceiver<SensorEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            info!("Location event loop started");

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break,

                    event = events.recv() => {
                        let Some(event) = event else { break };
                        debug!(event = ?event, "Sensor event");
                        engine.handle_event(event);
                    }
                }
            }

            info!("Location event loop stopped");
        })
    }
}
