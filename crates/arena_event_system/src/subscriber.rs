//! # Subscriber Interface
//!
//! The engine's only view of a script. Whatever runs the script (a Lua
//! binding, a native Rust stand-in, a test mock) implements [`Subscriber`].
//!
//! ## Contract
//!
//! - `invoke_handler` must report failures as [`ScriptError`] and never
//!   unwind past this boundary.
//! - `destroy` must leave the subscriber unsubscribed from every event kind
//!   by the next commit, either through the deferred
//!   [`EventManager::unsubscribe_all`](crate::EventManager::unsubscribe_all)
//!   or, when no dispatch can be running, the immediate variant.

use crate::events::{EventKind, EventPayload, ScriptError};
use crate::types::SubscriberId;
use std::rc::Rc;

/// A scriptable entity that can be notified of events.
pub trait Subscriber {
    /// Stable identity used to compare subscribers.
    fn id(&self) -> SubscriberId;

    /// Script name for log lines.
    fn name(&self) -> &str;

    /// Whether the script defines the handler function for `kind`.
    fn has_handler(&self, kind: EventKind) -> bool;

    /// Calls the script's handler for `kind` with `payload`.
    fn invoke_handler(&self, kind: EventKind, payload: &EventPayload) -> Result<(), ScriptError>;

    /// Tears the subscriber down after its handler failed.
    fn destroy(&self);

    /// Unwinds any transient evaluation state left behind by a failed call.
    fn clear_script_state(&self) {}
}

/// Shared handle to a subscriber.
pub type SubscriberHandle = Rc<dyn Subscriber>;
