//! # Event Kinds, Payloads and Errors
//!
//! This module defines the closed set of events the simulation can raise,
//! the payload each one carries to scripts, and the error types used at the
//! engine and script boundaries.
//!
//! Every [`EventKind`] maps to exactly one handler function name. A script
//! that wants to hear about an event defines that function; the engine asks
//! the script whether it exists before accepting a subscription.

use crate::types::{ObjectRef, PlayerInfoRef, ShipRef, ZoneRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Event Kinds
// ============================================================================

/// Discrete occurrences the simulation can notify scripts about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Tick,
    ShipSpawned,
    ShipKilled,
    PlayerJoined,
    PlayerLeft,
    ChatMessage,
    NexusOpened,
    NexusClosed,
    ZoneEntered,
    ZoneLeft,
    ScoreChanged,
    CoreDestroyed,
    PlayerTeamChanged,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 13;

    /// All event kinds, in table order.
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Tick,
        EventKind::ShipSpawned,
        EventKind::ShipKilled,
        EventKind::PlayerJoined,
        EventKind::PlayerLeft,
        EventKind::ChatMessage,
        EventKind::NexusOpened,
        EventKind::NexusClosed,
        EventKind::ZoneEntered,
        EventKind::ZoneLeft,
        EventKind::ScoreChanged,
        EventKind::CoreDestroyed,
        EventKind::PlayerTeamChanged,
    ];

    /// Position of this kind in per-kind tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Event name used in logs and configuration.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Tick => "Tick",
            EventKind::ShipSpawned => "ShipSpawned",
            EventKind::ShipKilled => "ShipKilled",
            EventKind::PlayerJoined => "PlayerJoined",
            EventKind::PlayerLeft => "PlayerLeft",
            EventKind::ChatMessage => "ChatMessage",
            EventKind::NexusOpened => "NexusOpened",
            EventKind::NexusClosed => "NexusClosed",
            EventKind::ZoneEntered => "ZoneEntered",
            EventKind::ZoneLeft => "ZoneLeft",
            EventKind::ScoreChanged => "ScoreChanged",
            EventKind::CoreDestroyed => "CoreDestroyed",
            EventKind::PlayerTeamChanged => "PlayerTeamChanged",
        }
    }

    /// Name of the script function that handles this event.
    pub fn handler_name(self) -> &'static str {
        match self {
            EventKind::Tick => "onTick",
            EventKind::ShipSpawned => "onShipSpawned",
            EventKind::ShipKilled => "onShipKilled",
            EventKind::PlayerJoined => "onPlayerJoined",
            EventKind::PlayerLeft => "onPlayerLeft",
            EventKind::ChatMessage => "onMsgReceived",
            EventKind::NexusOpened => "onNexusOpened",
            EventKind::NexusClosed => "onNexusClosed",
            EventKind::ZoneEntered => "onShipEnteredZone",
            EventKind::ZoneLeft => "onShipLeftZone",
            EventKind::ScoreChanged => "onScoreChanged",
            EventKind::CoreDestroyed => "onCoreDestroyed",
            EventKind::PlayerTeamChanged => "onPlayerTeamChanged",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    /// Accepts either the event name (`"Tick"`) or its handler name (`"onTick"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s) || kind.handler_name() == s)
            .ok_or_else(|| format!("Unknown event kind: {s}"))
    }
}

/// Direction of a ship crossing a zone boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneTransit {
    Entered,
    Left,
}

impl ZoneTransit {
    /// Event kind fired for this transit.
    pub fn kind(self) -> EventKind {
        match self {
            ZoneTransit::Entered => EventKind::ZoneEntered,
            ZoneTransit::Left => EventKind::ZoneLeft,
        }
    }
}

/// A change to a player's presence or team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerChange {
    Joined,
    Left,
    TeamChanged,
}

impl PlayerChange {
    /// Event kind fired for this change.
    pub fn kind(self) -> EventKind {
        match self {
            PlayerChange::Joined => EventKind::PlayerJoined,
            PlayerChange::Left => EventKind::PlayerLeft,
            PlayerChange::TeamChanged => EventKind::PlayerTeamChanged,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Arguments delivered to a handler, one variant per payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EventPayload {
    /// NexusOpened, NexusClosed
    Empty,
    /// Tick
    Tick { delta_ms: u32 },
    /// ShipSpawned
    Ship { ship: ShipRef },
    /// ShipKilled
    ShipKilled {
        ship: ShipRef,
        damaging_object: Option<ObjectRef>,
        shooter: Option<ObjectRef>,
    },
    /// ChatMessage
    Chat {
        message: String,
        player: Option<PlayerInfoRef>,
        is_global: bool,
    },
    /// PlayerJoined, PlayerLeft, PlayerTeamChanged
    Player { player: PlayerInfoRef },
    /// ScoreChanged
    Score {
        score: i32,
        team_index: i32,
        player: Option<PlayerInfoRef>,
    },
    /// ZoneEntered, ZoneLeft
    Zone { ship: ShipRef, zone: ZoneRef },
    /// CoreDestroyed
    Core { core: ObjectRef },
}

impl EventPayload {
    /// Returns true if this payload shape is the one `kind` carries.
    pub fn fits(&self, kind: EventKind) -> bool {
        use EventKind::*;
        match self {
            EventPayload::Empty => matches!(kind, NexusOpened | NexusClosed),
            EventPayload::Tick { .. } => kind == Tick,
            EventPayload::Ship { .. } => kind == ShipSpawned,
            EventPayload::ShipKilled { .. } => kind == ShipKilled,
            EventPayload::Chat { .. } => kind == ChatMessage,
            EventPayload::Player { .. } => {
                matches!(kind, PlayerJoined | PlayerLeft | PlayerTeamChanged)
            }
            EventPayload::Score { .. } => kind == ScoreChanged,
            EventPayload::Zone { .. } => matches!(kind, ZoneEntered | ZoneLeft),
            EventPayload::Core { .. } => kind == CoreDestroyed,
        }
    }

    /// Serializes the payload as JSON for script bridges that marshal
    /// handler arguments as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!("🔴 Payload serialization failed: {} (payload debug: {:?})", e, self);
            EventError::Serialization(e)
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A second engine was constructed while one is still alive on this thread
    #[error("There is only one EventManager per simulation thread; one is already alive")]
    DuplicateConstruction,
    /// The subscriber's script does not define the handler for the event
    #[error("Script '{script}' has no {handler} function for the {event} event")]
    MissingHandler {
        event: EventKind,
        handler: &'static str,
        script: String,
    },
    /// Payload serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a subscriber when its handler is invoked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The handler raised an error while running
    #[error("{0}")]
    Runtime(String),
    /// The handler function disappeared after subscribing
    #[error("Handler function {0} not found")]
    MissingFunction(String),
    /// The subscriber was already torn down
    #[error("Script '{0}' has been destroyed")]
    Destroyed(String),
}
