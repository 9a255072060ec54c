//! CLI subcommands.

pub mod common;
pub mod locate;
pub mod watch;
