//! `vlisten` binary entrypoint.

use std::process::ExitCode;

use clap::Parser;
use validator_listener::cli_app::{Cli, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vlisten: {err}");
            ExitCode::FAILURE
        }
    }
}
