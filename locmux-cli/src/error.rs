//! CLI error types.

use thiserror::Error;

use locmux::LocationError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Event loop error: {0}")]
    EventLoop(String),
}
