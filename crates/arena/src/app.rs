//! Main application logic and lifecycle management.
//!
//! The `Application` drives a [`GameSession`] from a single task: a tick
//! interval, console lines from stdin and the shutdown signal are
//! multiplexed with `tokio::select!`. The session is not `Send` and is never
//! moved to another task.

use crate::commands::ConsoleCommand;
use crate::config::AppConfig;
use crate::logging::display_banner;
use crate::session::{CommandOutcome, GameSession};
use crate::signals::shutdown_signal;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Why the main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_ticks` was reached
    TickLimit,
    /// `quit` was typed at the console
    Quit,
    /// SIGINT / SIGTERM
    Signal,
}

pub struct Application {
    config: AppConfig,
    console: bool,
}

impl Application {
    /// Validates the merged configuration and prepares the application.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration validated successfully");

        display_banner(config.session.debug_commands);
        Ok(Self { config, console: true })
    }

    /// Runs the session until the tick limit, `quit`, or a shutdown signal.
    pub async fn run(self) -> Result<StopReason, Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let mut session = GameSession::new(&self.config.session);
        for script in &self.config.scripts {
            session.add_script(script.clone());
        }

        let session_settings = &self.config.session;
        let mut ticker =
            tokio::time::interval(Duration::from_millis(session_settings.tick_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        let mut console = BufReader::new(tokio::io::stdin()).lines();
        let mut console_open = self.console;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        info!("✅ Arena is running ({} script(s))", session.scripts().len());
        info!("🛑 Press Ctrl+C to shut down");

        let reason = loop {
            tokio::select! {
                now = ticker.tick() => {
                    let delta = now.saturating_duration_since(last_tick);
                    last_tick = now;
                    session.tick(u32::try_from(delta.as_millis()).unwrap_or(u32::MAX));

                    let ticks = session.ticks();
                    let every = session_settings.stats_interval_ticks;
                    if every > 0 && ticks % every == 0 {
                        session.log_stats();
                    }
                    if session_settings.max_ticks > 0 && ticks >= session_settings.max_ticks {
                        info!("🏁 Reached tick limit ({})", session_settings.max_ticks);
                        break StopReason::TickLimit;
                    }
                }
                line = console.next_line(), if console_open => {
                    match line {
                        Ok(Some(line)) => match ConsoleCommand::parse(&line) {
                            Ok(Some(command)) => {
                                if session.apply_command(command) == CommandOutcome::Quit {
                                    info!("👋 Quit requested from console");
                                    break StopReason::Quit;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!("⚠️ {}", e),
                        },
                        Ok(None) => {
                            console_open = false;
                        }
                        Err(e) => {
                            error!("❌ Console read failed: {}", e);
                            console_open = false;
                        }
                    }
                }
                result = &mut shutdown => {
                    result?;
                    info!("📡 Received shutdown signal - shutting down");
                    break StopReason::Signal;
                }
            }
        };

        log_final_statistics(&session);
        drop(session);
        info!("✅ Arena shutdown complete");
        Ok(reason)
    }

    fn log_configuration_summary(&self) {
        let session = &self.config.session;
        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", session.tick_interval_ms);
        if session.max_ticks > 0 {
            info!("  🏁 Tick limit: {}", session.max_ticks);
        }
        info!("  ⏸️ Start paused: {}", session.start_paused);
        info!("  🐞 Debug commands: {}", session.debug_commands);
        for script in &self.config.scripts {
            info!("  📜 {} ({}): {} event(s)", script.name, script.context, script.events.len());
        }
    }
}

fn log_final_statistics(session: &GameSession) {
    let stats = session.stats();
    info!("📊 Final Statistics:");
    info!("  - Ticks run: {}", session.ticks());
    info!("  - Events fired: {}", stats.events_fired);
    info!("  - Events suppressed: {}", stats.events_suppressed);
    info!("  - Handler failures: {}", stats.handler_failures);
    info!("  - Scripts destroyed: {}", stats.subscribers_destroyed);
}
