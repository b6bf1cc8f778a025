//! # Arena Event System
//!
//! Routes discrete game events (ticks, ships spawning and dying, players
//! joining, chat, zone transits, score changes) to sandboxed scripts such as
//! bots and level generators, without the simulation knowing who listens.
//!
//! ## Core Guarantees
//!
//! - **Safe mutation**: scripts may subscribe and unsubscribe from inside a
//!   handler. Requests are staged and applied by [`EventManager::commit`]
//!   between dispatches, so the list being walked never changes under it.
//! - **Isolation**: a failing handler never reaches the caller. A failing bot
//!   is destroyed; any other script only gets an error logged. Delivery of
//!   that one firing stops at the failure.
//! - **Pause and step**: a global pause silences scripts; `add_steps(n)` lets
//!   paused scripts see exactly `n` more ticks.
//!
//! ## Tick Flow
//!
//! 1. [`EventManager::commit`] applies last tick's staged changes
//! 2. The simulation fires this tick's events (`fire_tick`, `fire_chat_message`, ...)
//! 3. Each firing consults the pause state, builds its payload, and walks
//!    the live subscribers in subscription order
//!
//! ## Quick Start
//!
//! ```rust
//! use arena_event_system::*;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! struct Greeter {
//!     id: SubscriberId,
//!     ticks: Cell<u32>,
//! }
//!
//! impl Subscriber for Greeter {
//!     fn id(&self) -> SubscriberId { self.id }
//!     fn name(&self) -> &str { "greeter" }
//!     fn has_handler(&self, kind: EventKind) -> bool { kind == EventKind::Tick }
//!     fn invoke_handler(
//!         &self,
//!         _kind: EventKind,
//!         _payload: &EventPayload,
//!     ) -> Result<(), ScriptError> {
//!         self.ticks.set(self.ticks.get() + 1);
//!         Ok(())
//!     }
//!     fn destroy(&self) {}
//! }
//!
//! let events = EventManager::get();
//! let greeter = Rc::new(Greeter { id: SubscriberId::new(), ticks: Cell::new(0) });
//! events.subscribe(greeter.clone(), EventKind::Tick, ScriptContext::Robot, false);
//!
//! events.commit();
//! events.fire_tick(16);
//! assert_eq!(greeter.ticks.get(), 1);
//!
//! events.unsubscribe_all_immediate(greeter.id);
//! drop(events);
//! EventManager::shutdown();
//! ```

// tests
mod tests;

#[cfg(test)]
mod testing;

// Core modules
mod dispatch;
pub mod events;
pub mod manager;
pub mod stats;
pub mod subscriber;
pub mod subscriptions;
pub mod suppression;
pub mod types;

pub use events::{EventError, EventKind, EventPayload, PlayerChange, ScriptError, ZoneTransit};
pub use manager::EventManager;
pub use stats::DispatchStats;
pub use subscriber::{Subscriber, SubscriberHandle};
pub use subscriptions::{Subscription, SubscriptionTable};
pub use suppression::{SuppressionState, INACTIVE_STEP_BUDGET};
pub use types::*;
