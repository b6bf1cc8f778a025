//! # Arena Host
//!
//! Runs a game session that drives the arena event system once per tick,
//! loads native scripts from configuration and accepts console debug
//! commands.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! arena
//!
//! # Start paused and stop after 1000 ticks
//! arena --paused --max-ticks 1000
//!
//! # JSON logging
//! arena --json-logs --log-level debug
//! ```
//!
//! ## Console
//!
//! - `pausebots` toggles the pause on every bot and script
//! - `stepbots [n]` lets paused scripts run `n` more ticks (default 1)
//! - `stats` logs dispatch statistics
//! - `quit` shuts down
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `arena.toml`).
//! If the file doesn't exist, a default configuration will be created.

use tracing::error;

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod scripts;
pub mod session;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Entry point for the Arena host, called from `main`.
///
/// Parses arguments, loads the configuration, sets up logging and runs the
/// application. Startup and runtime errors are logged and exit with code 1.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };
    config.apply_overrides(&args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, ScriptSettings, SessionSettings};
pub use session::GameSession;
