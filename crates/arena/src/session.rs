//! Game session.
//!
//! [`GameSession`] owns the event manager for its lifetime and drives it
//! once per simulation tick: apply staged subscription changes, fire the
//! tick, then relay any chat the scripts queued while handling it.

use crate::commands::ConsoleCommand;
use crate::config::{ScriptSettings, SessionSettings};
use crate::scripts::{ChatOutbox, NativeScript};
use arena_event_system::{DispatchStats, EventManager, PlayerChange, Subscriber, SubscriberId};
use std::rc::Rc;
use tracing::{info, warn};

/// What the host loop should do after a console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

pub struct GameSession {
    events: Rc<EventManager>,
    scripts: Vec<Rc<NativeScript>>,
    outbox: ChatOutbox,
    debug_commands: bool,
    ticks: u64,
}

impl GameSession {
    pub fn new(settings: &SessionSettings) -> Self {
        let events = EventManager::get();
        if settings.start_paused {
            events.set_paused(true);
        }

        Self {
            events,
            scripts: Vec::new(),
            outbox: ChatOutbox::default(),
            debug_commands: settings.debug_commands,
            ticks: 0,
        }
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn scripts(&self) -> &[Rc<NativeScript>] {
        &self.scripts
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn stats(&self) -> DispatchStats {
        self.events.stats()
    }

    /// Loads a script, subscribes it to its configured events and announces
    /// its player. Subscriptions take effect at the next tick.
    pub fn add_script(&mut self, settings: ScriptSettings) -> SubscriberId {
        let script = Rc::new(NativeScript::new(settings, &self.events, self.outbox.clone()));
        let accepted = NativeScript::subscribe_configured(&script, &self.events);
        info!(
            "📜 Loaded {} script '{}' ({} event subscriptions)",
            script.context(),
            script.name(),
            accepted
        );

        let id = script.id();
        self.events.fire_player_event(PlayerChange::Joined, Some(id), script.player());
        self.scripts.push(script);
        id
    }

    /// Unloads a script and announces its player leaving.
    pub fn remove_script(&mut self, id: SubscriberId) -> bool {
        let Some(index) = self.scripts.iter().position(|s| s.id() == id) else {
            return false;
        };
        let script = self.scripts.remove(index);
        self.events.unsubscribe_all(id);
        info!("📤 Unloaded script '{}'", script.name());
        self.events.fire_player_event(PlayerChange::Left, Some(id), script.player());
        true
    }

    /// Runs one simulation tick.
    pub fn tick(&mut self, delta_ms: u32) {
        self.events.commit();
        self.reap_destroyed();

        self.events.fire_tick(delta_ms);
        self.relay_chat();
        self.ticks += 1;
    }

    fn reap_destroyed(&mut self) {
        let (destroyed, alive): (Vec<_>, Vec<_>) =
            self.scripts.drain(..).partition(|s| s.is_destroyed());
        self.scripts = alive;

        for script in destroyed {
            warn!("💀 Script '{}' was destroyed after a failure", script.name());
            let id = script.id();
            self.events.fire_player_event(PlayerChange::Left, Some(id), script.player());
        }
    }

    fn relay_chat(&self) {
        let queued: Vec<_> = self.outbox.borrow_mut().drain(..).collect();
        for chat in queued {
            info!("💬 {}: {}", chat.player.name, chat.message);
            self.events.fire_chat_message(
                Some(chat.sender),
                &chat.message,
                Some(&chat.player),
                true,
            );
        }
    }

    /// Applies a console command.
    pub fn apply_command(&self, command: ConsoleCommand) -> CommandOutcome {
        if command.is_debug() && !self.debug_commands {
            warn!("Debug commands are disabled; ignoring {:?}", command);
            return CommandOutcome::Continue;
        }

        match command {
            ConsoleCommand::PauseBots => self.events.toggle_pause(),
            ConsoleCommand::StepBots(steps) => {
                if !self.events.is_paused() {
                    warn!("stepbots only works while bots are paused (use pausebots)");
                }
                self.events.add_steps(steps);
            }
            ConsoleCommand::Stats => self.log_stats(),
            ConsoleCommand::Quit => return CommandOutcome::Quit,
        }
        CommandOutcome::Continue
    }

    /// Logs the dispatch counters and the number of loaded scripts.
    pub fn log_stats(&self) {
        let stats = self.events.stats();
        info!(
            "📊 Tick {} - fired: {}, suppressed: {}, handler calls: {}, failures: {}, \
             destroyed: {}, scripts: {}",
            self.ticks,
            stats.events_fired,
            stats.events_suppressed,
            stats.handler_invocations,
            stats.handler_failures,
            stats.subscribers_destroyed,
            self.scripts.len()
        );
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        for script in self.scripts.drain(..) {
            self.events.unsubscribe_all_immediate(script.id());
        }
        self.events.commit();
        EventManager::shutdown();
    }
}
