//! Location subscription.

use clap::Args;
use tracing::info;

use super::common::{print_report, report_channel, AccuracyArg, DemoSession, SimulationArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Configure the sensor for this accuracy (default: finest)
    #[arg(short, long, value_enum, conflicts_with = "significant")]
    pub accuracy: Option<AccuracyArg>,

    /// Only report significant location changes
    #[arg(long)]
    pub significant: bool,

    /// Stop after this many updates (0 runs until Ctrl-C)
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    #[command(flatten)]
    pub simulation: SimulationArgs,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, json: bool) -> Result<(), CliError> {
    let session = DemoSession::start(&args.simulation)?;
    let (callback, mut reports) = report_channel();

    let id = match (args.significant, args.accuracy) {
        (true, _) => session.manager.subscribe_to_significant_changes(callback),
        (false, Some(accuracy)) => session
            .manager
            .subscribe_with_accuracy(accuracy.into(), callback)?,
        (false, None) => session.manager.subscribe_to_location_updates(callback),
    };
    info!(request_id = %id, "Watching location");

    let mut received = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            report = reports.recv() => {
                let Some(report) = report else { break };
                print_report(&report, json)?;
                if report.status.is_error() {
                    break;
                }
                received += 1;
                if args.count > 0 && received >= args.count {
                    break;
                }
            }
        }
    }

    session.manager.cancel(id);
    session.shutdown().await
}
