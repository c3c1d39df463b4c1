//! tracksidectl - Trackside lap timing CLI
//!
//! Drives LLRP RFID readers (or simulated ones), folds their tag sightings
//! into laps and prints results to the console.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "tracksidectl")]
#[command(about = "Trackside lap timing - drive RFID readers and time laps")]
#[command(version)]
#[command(long_about = "
tracksidectl connects to LLRP RFID readers at the track side, configures them
for continuous inventory and turns tag sightings into laps per rider.

Readers without an address can run on synthetic traffic with --simulate.
Use --json for machine-readable output.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured reader until interrupted
    Run {
        /// Configuration file (.yaml, .yml or .json)
        #[arg(short, long, env = "TRACKSIDE_CONFIG")]
        config: PathBuf,

        /// Replace every reader with simulated traffic
        #[arg(long)]
        simulate: bool,

        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },

    /// Check a configuration file and print it with defaults filled in
    Validate {
        /// Configuration file (.yaml, .yml or .json)
        #[arg(short, long, env = "TRACKSIDE_CONFIG")]
        config: PathBuf,

        /// Validate as if every reader were simulated
        #[arg(long)]
        simulate: bool,
    },

    /// Decode one LLRP frame given as hex
    Decode {
        /// Frame bytes, header included
        frame: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn default_filter(level: &str) -> String {
    [
        "tracksidectl",
        "trackside_reader",
        "trackside_link",
        "trackside_laps",
        "trackside_config",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",")
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            config,
            simulate,
            duration,
        } => {
            let duration = duration.map(Duration::from_secs);
            commands::run::execute(config, *simulate, duration, cli.json).await
        }
        Commands::Validate { config, simulate } => {
            commands::validate::execute(config, *simulate, cli.json).await
        }
        Commands::Decode { frame } => commands::decode::execute(frame, cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_run_with_simulate() -> TestResult {
        let cli = Cli::try_parse_from([
            "tracksidectl",
            "-vv",
            "run",
            "--config",
            "track.yaml",
            "--simulate",
            "--duration",
            "30",
        ])?;
        assert_eq!(cli.verbose, 2);
        assert!(!cli.json);
        match cli.command {
            Commands::Run {
                config,
                simulate,
                duration,
            } => {
                assert_eq!(config, PathBuf::from("track.yaml"));
                assert!(simulate);
                assert_eq!(duration, Some(30));
            }
            _ => return Err("expected run".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_validate_json_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["tracksidectl", "validate", "-c", "t.json", "--json"])?;
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Validate { simulate: false, .. }));
        Ok(())
    }

    #[test]
    fn parse_decode_takes_frame() -> TestResult {
        let cli = Cli::try_parse_from(["tracksidectl", "decode", "043e0000000a00000005"])?;
        assert!(matches!(cli.command, Commands::Decode { ref frame } if frame == "043e0000000a00000005"));
        Ok(())
    }

    #[test]
    fn parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["tracksidectl"]).is_err());
    }

    #[test]
    fn default_filter_covers_library_targets() {
        let filter = default_filter("debug");
        assert!(filter.contains("tracksidectl=debug"));
        assert!(filter.contains("trackside_reader=debug"));
    }
}
