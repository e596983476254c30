//! Entry point for the `wayline` command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use wayline_cli::CliError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match wayline_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("wayline: {err}");
            ExitCode::FAILURE
        }
    }
}
