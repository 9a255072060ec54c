//! Simulated location sensor.
//!
//! Behaves like a phone GPS after a cold start: the first fixes are coarse
//! and accuracy halves with every fix until it settles. Authorization starts
//! undetermined and is answered (or not) after a configurable prompt delay.
//!
//! ```text
//!   request_authorization ──► sleep(prompt_delay) ──► SensorEvent::Authorization
//!   start_session ──► every interval ──► SensorEvent::Location (while authorized)
//!   stop_session  ──► cancel session task
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use locmux::{AuthorizationState, LocationSample, LocationSensor, SensorEvent, SessionConfig};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy of the first fix.
    pub initial_accuracy_m: f64,
    /// Accuracy the receiver settles at.
    pub final_accuracy_m: f64,
    pub interval: Duration,
    /// How the user answers the permission prompt; `None` never answers.
    pub prompt_answer: Option<AuthorizationState>,
    pub prompt_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latitude: 53.5511,
            longitude: 9.9937,
            initial_accuracy_m: 2000.0,
            final_accuracy_m: 4.0,
            interval: Duration::from_millis(500),
            prompt_answer: Some(AuthorizationState::Authorized),
            prompt_delay: Duration::from_millis(300),
        }
    }
}

/// Accuracy of fix number `fix` during warm-up.
pub fn warm_up_accuracy(initial_m: f64, final_m: f64, fix: u32) -> f64 {
    let halvings = fix.min(64) as i32;
    (initial_m * 0.5f64.powi(halvings)).max(final_m)
}

#[derive(Debug, Default)]
struct SimState {
    authorization: AuthorizationState,
    session: Option<CancellationToken>,
    prompted: bool,
}

/// [`LocationSensor`] backed by tokio tasks emitting synthetic events.
pub struct SimulatedSensor {
    config: SimulationConfig,
    events: mpsc::UnboundedSender<SensorEvent>,
    runtime: Handle,
    state: Arc<Mutex<SimState>>,
}

impl std::fmt::Debug for SimulatedSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedSensor")
            .field("config", &self.config)
            .field("authorization", &self.state.lock().authorization)
            .finish_non_exhaustive()
    }
}

impl SimulatedSensor {
    /// Create a sensor sending events into `events`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: SimulationConfig, events: mpsc::UnboundedSender<SensorEvent>) -> Self {
        Self {
            config,
            events,
            runtime: Handle::current(),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }
}

impl LocationSensor for SimulatedSensor {
    fn start_session(&self, session: &SessionConfig) {
        let mut state = self.state.lock();
        if state.session.is_some() {
            debug!(accuracy = ?session.accuracy, "Simulated session reconfigured");
            return;
        }

        info!(
            accuracy = ?session.accuracy,
            distance_filter = %session.distance_filter,
            "Simulated GPS starting"
        );
        let token = CancellationToken::new();
        state.session = Some(token.clone());

        let config = self.config.clone();
        let events = self.events.clone();
        let shared = Arc::clone(&self.state);
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            let mut fix = 0u32;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !shared.lock().authorization.is_authorized() {
                            continue;
                        }
                        let accuracy =
                            warm_up_accuracy(config.initial_accuracy_m, config.final_accuracy_m, fix);
                        fix = fix.saturating_add(1);

                        // Offset the reported position by the error radius, north-east.
                        let offset_deg = accuracy / METERS_PER_DEGREE * std::f64::consts::FRAC_1_SQRT_2;
                        let sample = LocationSample::with_timestamp(
                            config.latitude + offset_deg,
                            config.longitude + offset_deg,
                            accuracy,
                            Instant::now(),
                        );
                        if events.send(SensorEvent::Location(sample)).is_err() {
                            break;
                        }
                    }
                }
            }

            debug!("Simulated GPS task finished");
        });
    }

    fn stop_session(&self) {
        if let Some(token) = self.state.lock().session.take() {
            info!("Simulated GPS stopping");
            token.cancel();
        }
    }

    fn authorization_state(&self) -> AuthorizationState {
        self.state.lock().authorization
    }

    fn request_authorization(&self) {
        {
            let mut state = self.state.lock();
            if state.prompted {
                return;
            }
            state.prompted = true;
        }

        let Some(answer) = self.config.prompt_answer else {
            info!("Permission prompt shown, user will not answer");
            return;
        };

        info!(answer = ?answer, delay_ms = self.config.prompt_delay.as_millis() as u64, "Permission prompt shown");
        let delay = self.config.prompt_delay;
        let events = self.events.clone();
        let shared = Arc::clone(&self.state);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.lock().authorization = answer;
            let _ = events.send(SensorEvent::Authorization(answer));
        });
    }
}
