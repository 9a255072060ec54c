//! Common types and utilities shared across CLI commands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use locmux::{
    AccuracyLevel, AuthorizationState, LocationConfig, LocationManager, LocationReport,
    LocationStatus,
};

use crate::error::CliError;
use crate::simulator::{SimulatedSensor, SimulationConfig};

/// Desired accuracy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AccuracyArg {
    /// Within 5 km, up to 10 minutes old
    City,
    /// Within 1 km, up to 5 minutes old
    Neighborhood,
    /// Within 100 m, up to 1 minute old
    Block,
    /// Within 15 m, up to 15 seconds old
    House,
    /// Within 5 m, up to 5 seconds old
    Room,
}

impl From<AccuracyArg> for AccuracyLevel {
    fn from(arg: AccuracyArg) -> Self {
        match arg {
            AccuracyArg::City => AccuracyLevel::City,
            AccuracyArg::Neighborhood => AccuracyLevel::Neighborhood,
            AccuracyArg::Block => AccuracyLevel::Block,
            AccuracyArg::House => AccuracyLevel::House,
            AccuracyArg::Room => AccuracyLevel::Room,
        }
    }
}

/// How the simulated user answers the permission prompt.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum PromptAnswer {
    /// Grant access
    Grant,
    /// Deny access
    Deny,
    /// Access blocked by device policy
    Restrict,
    /// Location services switched off system-wide
    Disable,
    /// Never answer
    Ignore,
}

impl PromptAnswer {
    fn authorization(self) -> Option<AuthorizationState> {
        match self {
            PromptAnswer::Grant => Some(AuthorizationState::Authorized),
            PromptAnswer::Deny => Some(AuthorizationState::Denied),
            PromptAnswer::Restrict => Some(AuthorizationState::Restricted),
            PromptAnswer::Disable => Some(AuthorizationState::ServicesDisabled),
            PromptAnswer::Ignore => None,
        }
    }
}

/// Simulated sensor options shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct SimulationArgs {
    /// True latitude of the simulated device
    #[arg(long, default_value_t = 53.5511, allow_negative_numbers = true)]
    pub lat: f64,

    /// True longitude of the simulated device
    #[arg(long, default_value_t = 9.9937, allow_negative_numbers = true)]
    pub lon: f64,

    /// Accuracy of the first GPS fix in meters
    #[arg(long, default_value_t = 2000.0)]
    pub initial_accuracy: f64,

    /// Accuracy the GPS settles at in meters
    #[arg(long, default_value_t = 4.0)]
    pub final_accuracy: f64,

    /// Milliseconds between GPS fixes
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// How the user answers the permission prompt
    #[arg(long, value_enum, default_value_t = PromptAnswer::Grant)]
    pub prompt: PromptAnswer,

    /// Milliseconds before the user answers the prompt
    #[arg(long, default_value_t = 300)]
    pub prompt_delay_ms: u64,

    /// Minimum movement in meters between reported fixes (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub distance_filter: f64,
}

impl SimulationArgs {
    pub fn to_config(&self) -> Result<SimulationConfig, CliError> {
        if !(self.initial_accuracy > 0.0 && self.final_accuracy > 0.0) {
            return Err(CliError::InvalidArgument(
                "GPS accuracies must be positive".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(CliError::InvalidArgument(
                "--interval-ms must be greater than zero".to_string(),
            ));
        }

        Ok(SimulationConfig {
            latitude: self.lat,
            longitude: self.lon,
            initial_accuracy_m: self.initial_accuracy,
            final_accuracy_m: self.final_accuracy,
            interval: Duration::from_millis(self.interval_ms),
            prompt_answer: self.prompt.authorization(),
            prompt_delay: Duration::from_millis(self.prompt_delay_ms),
        })
    }

    pub fn location_config(&self) -> LocationConfig {
        LocationConfig::new().with_distance_filter_m(self.distance_filter)
    }
}

/// A manager wired to a simulated sensor and a running event loop.
pub struct DemoSession {
    pub manager: LocationManager,
    shutdown: CancellationToken,
    event_loop: JoinHandle<()>,
}

impl DemoSession {
    pub fn start(args: &SimulationArgs) -> Result<Self, CliError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sensor = Arc::new(SimulatedSensor::new(args.to_config()?, events_tx));
        let manager = LocationManager::new(sensor, args.location_config());

        let shutdown = CancellationToken::new();
        let event_loop = manager.spawn_event_loop(events_rx, shutdown.clone());

        Ok(Self {
            manager,
            shutdown,
            event_loop,
        })
    }

    pub async fn shutdown(self) -> Result<(), CliError> {
        self.shutdown.cancel();
        self.event_loop
            .await
            .map_err(|e| CliError::EventLoop(e.to_string()))
    }
}

/// Channel-backed callback: reports arrive on the returned receiver.
pub fn report_channel() -> (
    impl Fn(&LocationReport) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<LocationReport>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = move |report: &LocationReport| {
        let _ = tx.send(*report);
    };
    (callback, rx)
}

/// Printable form of a [`LocationReport`].
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub status: LocationStatus,
    pub achieved_accuracy: AccuracyLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_accuracy_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u64>,
}

impl ReportView {
    pub fn new(report: &LocationReport, now: Instant) -> Self {
        let location = report.location.as_ref();
        Self {
            status: report.status,
            achieved_accuracy: report.achieved_accuracy,
            latitude: location.map(|l| l.latitude),
            longitude: location.map(|l| l.longitude),
            horizontal_accuracy_m: location.map(|l| l.horizontal_accuracy_m),
            age_ms: location.map(|l| l.age(now).as_millis() as u64),
        }
    }
}

/// Print a report as text or JSON.
pub fn print_report(report: &LocationReport, json: bool) -> Result<(), CliError> {
    let view = ReportView::new(report, Instant::now());
    if json {
        println!("{}", serde_json::to_string(&view)?);
        return Ok(());
    }

    match (view.latitude, view.longitude, view.horizontal_accuracy_m) {
        (Some(lat), Some(lon), Some(accuracy)) => println!(
            "{:<24} {:>10.5}, {:>10.5}  ±{:.0} m  ({})",
            view.status.to_string(),
            lat,
            lon,
            accuracy,
            view.achieved_accuracy
        ),
        _ => println!("{:<24} no location", view.status.to_string()),
    }
    Ok(())
}
