//! # Core Type Definitions
//!
//! Identifiers and the minimal game-object references carried in event
//! payloads. The engine never owns game objects; these are lightweight
//! snapshots that a script bridge can hand to a script.
//!
//! ## Key Types
//!
//! - [`SubscriberId`] - Stable identity of a scripted subscriber
//! - [`ScriptContext`] - Which kind of script a subscription belongs to
//! - [`ObjectId`] - Server-side id of a replicated game object
//! - [`ShipRef`], [`ZoneRef`], [`ObjectRef`], [`PlayerInfoRef`] - Payload references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identity of a scripted subscriber (a bot, a level generator).
///
/// Wraps a UUID so subscriber identities cannot be confused with object ids.
/// Two handles refer to the same subscriber exactly when their ids are equal.
///
/// # Examples
///
/// ```rust
/// use arena_event_system::SubscriberId;
///
/// let a = SubscriberId::new();
/// let b = SubscriberId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Creates a new random subscriber id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side id of a game object (ship, zone, core, projectile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Script Context
// ============================================================================

/// The kind of script that owns a subscription.
///
/// The context decides what happens when the script's handler fails: a
/// failing [`ScriptContext::Robot`] is shut down, every other context only
/// gets an error logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptContext {
    /// A bot controlling a ship
    Robot,
    /// A level generator script
    Levelgen,
    /// An editor or server plugin script
    Plugin,
    /// A script typed into the console
    Console,
}

impl ScriptContext {
    /// Returns true if a handler failure in this context destroys the subscriber.
    #[inline]
    pub fn is_robot(self) -> bool {
        matches!(self, ScriptContext::Robot)
    }

    /// Lowercase name used in config files and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptContext::Robot => "robot",
            ScriptContext::Levelgen => "levelgen",
            ScriptContext::Plugin => "plugin",
            ScriptContext::Console => "console",
        }
    }
}

impl fmt::Display for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "robot" | "bot" => Ok(ScriptContext::Robot),
            "levelgen" => Ok(ScriptContext::Levelgen),
            "plugin" => Ok(ScriptContext::Plugin),
            "console" => Ok(ScriptContext::Console),
            other => Err(format!("Unknown script context: {other}")),
        }
    }
}

// ============================================================================
// Payload References
// ============================================================================

/// Generic reference to a game object (damaging projectile, shooter, core).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Server-side object id
    pub id: ObjectId,
    /// Numeric object type, as exposed to scripts
    pub type_number: u8,
}

/// Reference to a ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipRef {
    /// Server-side object id of the ship
    pub id: ObjectId,
    /// Name of the controlling player, if any
    pub pilot: Option<String>,
    /// Team the ship belongs to
    pub team_index: i32,
}

/// Reference to a zone a ship can enter or leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRef {
    /// Server-side object id of the zone
    pub id: ObjectId,
    /// Numeric object type of the zone (goal zone, loadout zone, ...)
    pub type_number: u8,
    /// Id assigned by the level author, 0 when unassigned
    pub user_assigned_id: i32,
}

/// Script-visible information about a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfoRef {
    /// Player name
    pub name: String,
    /// Team index the player is on
    pub team_index: i32,
    /// Whether the player is a bot
    pub is_robot: bool,
}

impl PlayerInfoRef {
    /// Creates player info for a human player.
    pub fn human(name: impl Into<String>, team_index: i32) -> Self {
        Self { name: name.into(), team_index, is_robot: false }
    }

    /// Creates player info for a bot.
    pub fn robot(name: impl Into<String>, team_index: i32) -> Self {
        Self { name: name.into(), team_index, is_robot: true }
    }
}
