//! Top-level CLI definition and dispatch.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::channel::NetlinkBinder;
use crate::core::config::Config;
use crate::core::errors::VlError;
use crate::daemon::ListenerDaemon;
use crate::daemon::escalation::{Broadcaster, JsonlBroadcaster};
use crate::daemon::signals::SignalFlags;
use crate::logger::Logger;
use crate::protocol::{nlmsg, parse_payload};

/// Validator listener: escalates kernel integrity reports seen during boot.
#[derive(Parser)]
#[command(name = "vlisten", version, about)]
pub struct Cli {
    /// Configuration file (falls back to `$VLISTEN_CONFIG`, then defaults).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Listen for Validator reports in the foreground until SIGTERM.
    Run,
    /// Parse a Validator report from a file (or stdin) and print it as JSON.
    Parse {
        /// Report file; stdin when omitted.
        file: Option<PathBuf>,
        /// Input is a whole netlink datagram rather than bare report text.
        #[arg(long)]
        framed: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Dispatch CLI commands.
///
/// # Errors
/// Returns an error if the subcommand fails.
pub fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Run => run_daemon(cli.config.as_deref())?,
        Command::Parse { file, framed } => {
            let input = read_input(file.as_deref())?;
            let payload = if *framed {
                nlmsg::payload(&input)
            } else {
                input.as_slice()
            };
            println!("{}", serde_json::to_string(&parse_payload(payload))?);
        }
        Command::Config => {
            let config = Config::load(cli.config.as_deref())?;
            print!("{}", config.to_toml_string()?);
        }
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "vlisten", &mut io::stdout());
        }
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>, VlError> {
    match file {
        Some(path) => std::fs::read(path).map_err(|source| VlError::io(path, source)),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|source| VlError::io("<stdin>", source))?;
            Ok(buf)
        }
    }
}

fn run_daemon(config_path: Option<&Path>) -> Result<(), VlError> {
    let config = Config::load(config_path)?;
    let log = config.logging.path.as_deref().map_or_else(
        || Logger::stderr(config.logging.level),
        |path| Logger::open(path, config.logging.level),
    );
    let broadcaster: Box<dyn Broadcaster> = match &config.escalation.path {
        Some(path) => Box::new(JsonlBroadcaster::open(path)?),
        None => Box::new(JsonlBroadcaster::stdout()),
    };

    let signals = SignalFlags::install()?;
    let mut daemon = ListenerDaemon::new(&config, broadcaster, &log);
    daemon.start(&NetlinkBinder);
    daemon.run(&signals)
}
