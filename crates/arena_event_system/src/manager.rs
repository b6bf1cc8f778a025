//! The event manager and its lifecycle.
//!
//! One [`EventManager`] serves every script of a game session. It is
//! created lazily by [`EventManager::get`] and released by
//! [`EventManager::shutdown`] when the session ends.
//!
//! The manager is single-threaded: subscriber handles are `Rc` and all state
//! uses `Cell`/`RefCell`. The singleton therefore lives in thread-local
//! storage, one per simulation thread.

use crate::events::{EventError, EventKind};
use crate::stats::DispatchStats;
use crate::subscriber::SubscriberHandle;
use crate::subscriptions::SubscriptionTable;
use crate::suppression::SuppressionState;
use crate::types::{ScriptContext, SubscriberId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

thread_local! {
    static INSTANCE: RefCell<Option<Rc<EventManager>>> = const { RefCell::new(None) };
    static CONSTRUCTED: Cell<bool> = const { Cell::new(false) };
}

/// Routes game events to subscribed scripts.
///
/// All methods take `&self`, so a handler running inside a dispatch may
/// subscribe and unsubscribe through the same manager. Those requests are
/// staged and applied by the next [`commit`](EventManager::commit).
pub struct EventManager {
    pub(crate) table: SubscriptionTable,
    pub(crate) suppression: SuppressionState,
    pub(crate) stats: RefCell<DispatchStats>,
}

impl EventManager {
    /// Creates the manager for this thread.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateConstruction`] if a manager is already
    /// alive on this thread.
    pub fn try_new() -> Result<Self, EventError> {
        if CONSTRUCTED.with(|flag| flag.replace(true)) {
            return Err(EventError::DuplicateConstruction);
        }

        debug!("🏗️ Event manager constructed");
        Ok(Self {
            table: SubscriptionTable::new(),
            suppression: SuppressionState::new(),
            stats: RefCell::new(DispatchStats::default()),
        })
    }

    /// Creates the manager for this thread.
    ///
    /// # Panics
    ///
    /// Panics if a manager is already alive on this thread. Two managers
    /// mean the session lifecycle is broken.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(manager) => manager,
            Err(e) => panic!("{e}"),
        }
    }

    /// Returns the thread's manager, constructing it on first access.
    pub fn get() -> Rc<EventManager> {
        INSTANCE.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| Rc::new(EventManager::new()))
                .clone()
        })
    }

    /// Releases the thread's manager. A later [`get`](EventManager::get)
    /// builds a fresh one, once every outstanding handle is dropped.
    pub fn shutdown() {
        let released = INSTANCE.with(|slot| slot.borrow_mut().take());
        if let Some(manager) = released {
            let outstanding = Rc::strong_count(&manager) - 1;
            info!("🛑 Event manager shut down ({} outstanding handle(s))", outstanding);
        }
    }

    /// Whether [`get`](EventManager::get) currently holds a manager.
    pub fn is_initialized() -> bool {
        INSTANCE.with(|slot| slot.borrow().is_some())
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Stages a subscription of `subscriber` to `kind`.
    ///
    /// # Arguments
    ///
    /// * `subscriber` - Handle to the script being subscribed
    /// * `kind` - Event the script wants to hear about
    /// * `context` - Script kind, used by the failure policy
    /// * `fail_silently` - Skip the error log when the handler is missing
    ///
    /// # Returns
    ///
    /// `true` if the subscriber is, or will be after the next commit,
    /// subscribed. `false` if its script has no handler for `kind`.
    pub fn subscribe(
        &self,
        subscriber: SubscriberHandle,
        kind: EventKind,
        context: ScriptContext,
        fail_silently: bool,
    ) -> bool {
        self.table.subscribe(subscriber, kind, context, fail_silently)
    }

    /// Stages a subscription, reporting a missing handler as an error.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MissingHandler`] if the script does not define
    /// the handler for `kind`.
    pub fn try_subscribe(
        &self,
        subscriber: SubscriberHandle,
        kind: EventKind,
        context: ScriptContext,
    ) -> Result<(), EventError> {
        self.table.try_subscribe(subscriber, kind, context)
    }

    /// Stages an unsubscription. See [`SubscriptionTable::unsubscribe`].
    pub fn unsubscribe(&self, id: SubscriberId, kind: EventKind) {
        self.table.unsubscribe(id, kind);
    }

    /// Removes a subscription on the spot. The caller guarantees no dispatch
    /// of `kind` is running.
    pub fn unsubscribe_immediate(&self, id: SubscriberId, kind: EventKind) {
        self.table.unsubscribe_immediate(id, kind);
    }

    /// Stages removal of `id` from every event kind. Safe from inside a handler.
    pub fn unsubscribe_all(&self, id: SubscriberId) {
        self.table.unsubscribe_all(id);
    }

    /// Removes `id` from every event kind on the spot.
    pub fn unsubscribe_all_immediate(&self, id: SubscriberId) {
        self.table.unsubscribe_all_immediate(id);
    }

    /// Removes `id` from every kind not currently being dispatched and
    /// stages its removal from the one that is.
    ///
    /// [`Subscriber::destroy`](crate::Subscriber::destroy) implementations
    /// call this so a destroyed script hears nothing more, even later in
    /// the same tick. Safe from inside a handler.
    pub fn detach(&self, id: SubscriberId) {
        self.table.detach(id);
    }

    /// Whether `id` is in the live list for `kind` and will be notified
    /// when `kind` fires.
    pub fn is_subscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.table.is_subscribed(id, kind)
    }

    /// Whether `id` is waiting for the next commit to join `kind`.
    pub fn is_pending_subscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.table.is_pending_subscribed(id, kind)
    }

    /// Whether `id` is waiting for the next commit to leave `kind`.
    pub fn is_pending_unsubscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.table.is_pending_unsubscribed(id, kind)
    }

    /// Number of live subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.table.live_count(kind)
    }

    /// Applies staged subscribe/unsubscribe requests. Call once per tick,
    /// before firing that tick's events.
    ///
    /// A commit requested while a dispatch is in flight is deferred to the
    /// next call.
    pub fn commit(&self) {
        if !self.table.has_pending() {
            return;
        }
        if self.table.is_dispatching() {
            warn!("⚠️ Commit requested during event dispatch; deferring to next tick");
            return;
        }
        if self.table.commit() {
            self.stats.borrow_mut().commits_applied += 1;
        }
    }

    // ------------------------------------------------------------------
    // Pause / step
    // ------------------------------------------------------------------

    /// Pauses or resumes every scripted subscriber.
    ///
    /// While paused, events are only delivered when a step budget granted
    /// by [`add_steps`](EventManager::add_steps) remains.
    pub fn set_paused(&self, paused: bool) {
        self.suppression.set_paused(paused);
    }

    /// Flips the pause state. This is the `pausebots` console command.
    pub fn toggle_pause(&self) {
        self.suppression.toggle_pause();
    }

    /// Whether scripted subscribers are paused.
    pub fn is_paused(&self) -> bool {
        self.suppression.is_paused()
    }

    /// Lets paused subscribers see the next `steps` ticks. Ignored while running.
    ///
    /// # Arguments
    ///
    /// * `steps` - Number of ticks to deliver; replaces any unused budget
    pub fn add_steps(&self, steps: i32) {
        self.suppression.add_steps(steps);
    }

    /// Ticks paused subscribers may still receive.
    ///
    /// # Returns
    ///
    /// The remaining budget, or [`INACTIVE_STEP_BUDGET`](crate::INACTIVE_STEP_BUDGET)
    /// if no stepping was ever requested.
    pub fn step_budget(&self) -> i32 {
        self.suppression.step_budget()
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        self.stats.borrow().clone()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        // The flag may already be gone during thread teardown.
        let _ = CONSTRUCTED.try_with(|flag| flag.set(false));
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("subscriptions", &self.table)
            .field("suppression", &self.suppression)
            .field("stats", &self.stats)
            .finish()
    }
}
