//! One-shot location request.

use std::time::Duration;

use clap::Args;
use tracing::info;

use super::common::{print_report, report_channel, AccuracyArg, DemoSession, SimulationArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Accuracy the location must reach
    #[arg(short, long, value_enum, default_value_t = AccuracyArg::Block)]
    pub accuracy: AccuracyArg,

    /// Seconds to wait before giving up with the best fix so far (0 waits forever)
    #[arg(short, long, default_value_t = 10.0)]
    pub timeout: f64,

    /// Do not start the timeout until the permission prompt is answered
    #[arg(long)]
    pub defer_timeout: bool,

    #[command(flatten)]
    pub simulation: SimulationArgs,
}

/// Run the locate command.
pub async fn run(args: LocateArgs, json: bool) -> Result<(), CliError> {
    if !args.timeout.is_finite() || args.timeout < 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "--timeout must be a non-negative number of seconds, got {}",
            args.timeout
        )));
    }
    let timeout = Duration::from_secs_f64(args.timeout);

    let session = DemoSession::start(&args.simulation)?;
    let (callback, mut reports) = report_channel();

    let id = session.manager.request_location(
        args.accuracy.into(),
        timeout,
        args.defer_timeout,
        callback,
    )?;
    info!(request_id = %id, accuracy = ?args.accuracy, timeout_s = args.timeout, "Locating");

    let report = reports
        .recv()
        .await
        .ok_or_else(|| CliError::EventLoop("request dropped without a result".to_string()))?;
    print_report(&report, json)?;

    session.shutdown().await
}
