//! Configuration management for the Arena host.
//!
//! This module handles loading, validation, and CLI overrides of the host
//! configuration stored in a TOML file.

use crate::cli::CliArgs;
use arena_event_system::{EventKind, ScriptContext};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_stats_interval_ticks() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_team_index() -> i32 {
    0
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Game session settings
    pub session: SessionSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
    /// Native scripts to load into the session
    #[serde(default)]
    pub scripts: Vec<ScriptSettings>,
}

/// Game session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Simulation tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Stop after this many ticks (0 runs until a shutdown signal)
    #[serde(default)]
    pub max_ticks: u64,
    /// Start with scripted subscribers paused
    #[serde(default)]
    pub start_paused: bool,
    /// Accept `pausebots` / `stepbots` from the console
    #[serde(default = "default_true")]
    pub debug_commands: bool,
    /// Log dispatch statistics every this many ticks (0 disables)
    #[serde(default = "default_stats_interval_ticks")]
    pub stats_interval_ticks: u64,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

/// A native script to run in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Script name, also used as the player name for bots
    pub name: String,
    /// Script kind; decides what happens when a handler fails
    pub context: ScriptContext,
    /// Events the script defines handlers for
    pub events: Vec<EventKind>,
    /// Team the script's player is on
    #[serde(default = "default_team_index")]
    pub team_index: i32,
    /// Send a global chat message every this many ticks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_every_ticks: Option<u64>,
    /// Make the tick handler fail on this tick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_at_tick: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings {
                tick_interval_ms: default_tick_interval(),
                max_ticks: 0,
                start_paused: false,
                debug_commands: true,
                stats_interval_ticks: default_stats_interval_ticks(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
            scripts: vec![
                ScriptSettings {
                    name: "Sentinel".to_string(),
                    context: ScriptContext::Robot,
                    events: vec![EventKind::Tick, EventKind::ChatMessage, EventKind::PlayerJoined],
                    team_index: 0,
                    chat_every_ticks: Some(100),
                    fail_at_tick: None,
                },
                ScriptSettings {
                    name: "Arena Levelgen".to_string(),
                    context: ScriptContext::Levelgen,
                    events: vec![EventKind::Tick, EventKind::PlayerJoined, EventKind::PlayerLeft],
                    team_index: -1,
                    chat_every_ticks: None,
                    fail_at_tick: None,
                },
            ],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the loaded file.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(tick_ms) = args.tick_ms {
            self.session.tick_interval_ms = tick_ms;
        }
        if let Some(max_ticks) = args.max_ticks {
            self.session.max_ticks = max_ticks;
        }
        if args.paused {
            self.session.start_paused = true;
        }
    }

    /// Validates the configuration and returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.session.tick_interval_ms == 0 {
            return Err("session.tick_interval_ms must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        let mut names = HashSet::new();
        for script in &self.scripts {
            if script.name.trim().is_empty() {
                return Err("Script name cannot be empty".to_string());
            }
            if !names.insert(script.name.as_str()) {
                return Err(format!("Duplicate script name: {}", script.name));
            }
            if script.events.is_empty() {
                return Err(format!("Script '{}' handles no events", script.name));
            }
            if script.chat_every_ticks == Some(0) {
                return Err(format!(
                    "Script '{}': chat_every_ticks must be greater than 0",
                    script.name
                ));
            }
        }

        Ok(())
    }
}
