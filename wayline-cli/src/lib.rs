//! Command-line interface for replaying recorded journeys through Wayline.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod replay;
mod scenario;

pub use error::CliError;
pub use scenario::ScenarioError;

use replay::ReplayArgs;

const ARG_SCENARIO: &str = "scenario";
const ARG_UNITS: &str = "units";
const ARG_MOVE_AWAY_THRESHOLD: &str = "move-away-threshold";
const ENV_SCENARIO: &str = "WAYLINE_CMDS_REPLAY_SCENARIO";

/// Run the Wayline CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when arguments, configuration or the scenario are
/// unusable, or when output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Replay(args) => replay::run_replay(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "wayline",
    about = "Route-following utilities for the Wayline engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Feed a recorded fix sequence through a routing session.
    Replay(ReplayArgs),
}

#[cfg(test)]
mod tests;
