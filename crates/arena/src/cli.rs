//! Command-line interface handling for the Arena host.
//!
//! Arguments override values from the configuration file.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the tick interval in milliseconds
    pub tick_ms: Option<u64>,
    /// Optional override for the number of ticks to run
    pub max_ticks: Option<u64>,
    /// Start with scripted subscribers paused
    pub paused: bool,
}

/// Builds the clap command describing every supported option.
pub fn command() -> Command {
    Command::new("Arena")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multiplayer arena host driving scripted bots and level generators")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("arena.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tick-ms")
                .short('t')
                .long("tick-ms")
                .value_name("MS")
                .help("Simulation tick interval in milliseconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("max-ticks")
                .long("max-ticks")
                .value_name("N")
                .help("Stop after N ticks (0 runs until interrupted)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("paused")
                .long("paused")
                .help("Start with bots and scripts paused")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Builds arguments from already parsed matches.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("arena.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            tick_ms: matches.get_one::<u64>("tick-ms").copied(),
            max_ticks: matches.get_one::<u64>("max-ticks").copied(),
            paused: matches.get_flag("paused"),
        }
    }
}
