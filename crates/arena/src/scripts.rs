//! Native scripts.
//!
//! A [`NativeScript`] is a Rust stand-in for a sandboxed bot or levelgen
//! script. It handles the events its settings list, can post periodic
//! global chat, and can be told to fail on a given tick.

use crate::config::ScriptSettings;
use arena_event_system::{
    EventKind, EventManager, EventPayload, PlayerInfoRef, ScriptContext, ScriptError, Subscriber,
    SubscriberId,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace};

/// A chat line a script wants broadcast after the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingChat {
    pub sender: SubscriberId,
    pub player: PlayerInfoRef,
    pub message: String,
}

/// Chat lines queued by scripts during a tick.
pub type ChatOutbox = Rc<RefCell<Vec<OutgoingChat>>>;

pub struct NativeScript {
    id: SubscriberId,
    settings: ScriptSettings,
    player: PlayerInfoRef,
    events: Weak<EventManager>,
    outbox: ChatOutbox,
    ticks_seen: Cell<u64>,
    deliveries: Cell<u64>,
    in_handler: Cell<bool>,
    destroyed: Cell<bool>,
}

impl NativeScript {
    pub fn new(settings: ScriptSettings, events: &Rc<EventManager>, outbox: ChatOutbox) -> Self {
        let player = match settings.context {
            ScriptContext::Robot => {
                PlayerInfoRef::robot(settings.name.clone(), settings.team_index)
            }
            _ => PlayerInfoRef::human(settings.name.clone(), settings.team_index),
        };

        Self {
            id: SubscriberId::new(),
            settings,
            player,
            events: Rc::downgrade(events),
            outbox,
            ticks_seen: Cell::new(0),
            deliveries: Cell::new(0),
            in_handler: Cell::new(false),
            destroyed: Cell::new(false),
        }
    }

    /// Subscribes `script` to every event in its settings. Returns how many
    /// subscriptions were accepted.
    pub fn subscribe_configured(script: &Rc<NativeScript>, events: &EventManager) -> usize {
        script
            .settings
            .events
            .iter()
            .filter(|kind| events.subscribe(script.clone(), **kind, script.settings.context, false))
            .count()
    }

    pub fn context(&self) -> ScriptContext {
        self.settings.context
    }

    pub fn player(&self) -> &PlayerInfoRef {
        &self.player
    }

    /// Ticks this script has handled.
    pub fn ticks_seen(&self) -> u64 {
        self.ticks_seen.get()
    }

    /// Total handler calls, of any kind.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn on_tick(&self) -> Result<(), ScriptError> {
        let tick = self.ticks_seen.get() + 1;
        self.ticks_seen.set(tick);

        if self.settings.fail_at_tick == Some(tick) {
            return Err(ScriptError::Runtime(format!(
                "{}: onTick: scripted failure on tick {tick}",
                self.settings.name
            )));
        }

        if let Some(every) = self.settings.chat_every_ticks {
            if every > 0 && tick % every == 0 {
                self.outbox.borrow_mut().push(OutgoingChat {
                    sender: self.id,
                    player: self.player.clone(),
                    message: format!("{} checking in at tick {tick}", self.settings.name),
                });
            }
        }
        Ok(())
    }
}

impl Subscriber for NativeScript {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn name(&self) -> &str {
        &self.settings.name
    }

    fn has_handler(&self, kind: EventKind) -> bool {
        self.settings.events.contains(&kind)
    }

    fn invoke_handler(&self, kind: EventKind, payload: &EventPayload) -> Result<(), ScriptError> {
        if self.destroyed.get() {
            return Err(ScriptError::Destroyed(self.settings.name.clone()));
        }
        if !self.has_handler(kind) {
            return Err(ScriptError::MissingFunction(kind.handler_name().to_string()));
        }

        self.deliveries.set(self.deliveries.get() + 1);
        self.in_handler.set(true);

        let result = match (kind, payload) {
            (EventKind::Tick, _) => self.on_tick(),
            (EventKind::ChatMessage, EventPayload::Chat { message, player, .. }) => {
                let from = player.as_ref().map(|p| p.name.as_str()).unwrap_or("server");
                debug!(
                    script = %self.settings.name,
                    "💬 {} heard {}: {}",
                    self.settings.name,
                    from,
                    message
                );
                Ok(())
            }
            _ => {
                let json = payload.to_json().map_err(|e| ScriptError::Runtime(e.to_string()))?;
                trace!(
                    script = %self.settings.name,
                    "{} <- {}",
                    kind.handler_name(),
                    String::from_utf8_lossy(&json)
                );
                Ok(())
            }
        };

        if result.is_ok() {
            self.in_handler.set(false);
        }
        result
    }

    /// Marks the script dead and drops its subscriptions. Kinds other than
    /// the one being dispatched stop reaching it at once.
    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        info!("🗑️ Destroying script '{}' ({})", self.settings.name, self.settings.context);
        if let Some(events) = self.events.upgrade() {
            events.detach(self.id);
        }
    }

    fn clear_script_state(&self) {
        if self.in_handler.replace(false) {
            debug!("Cleared interrupted handler state for '{}'", self.settings.name);
        }
    }
}
