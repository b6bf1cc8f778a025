//! # Subscription Table
//!
//! Per-event-kind subscriber lists with staged mutation.
//!
//! Every kind owns three ordered collections: `live` (who gets notified),
//! `pending_add` and `pending_remove`. Subscribe and unsubscribe only ever
//! touch the staging collections; [`SubscriptionTable::commit`] folds them
//! into `live` between dispatches. A dispatch can therefore walk `live` by
//! index while handlers subscribe and unsubscribe freely.
//!
//! Each collection sits in its own `RefCell` and is borrowed only for the
//! length of one table operation, never across a handler call.

use crate::events::{EventError, EventKind};
use crate::subscriber::SubscriberHandle;
use crate::types::{ScriptContext, SubscriberId};
use std::cell::{Cell, RefCell};
use std::fmt;
use tracing::{debug, error, trace};

/// A subscriber registered for one event kind.
#[derive(Clone)]
pub struct Subscription {
    pub subscriber: SubscriberHandle,
    pub context: ScriptContext,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber.name())
            .field("id", &self.subscriber.id())
            .field("context", &self.context)
            .finish()
    }
}

#[derive(Default)]
struct KindTable {
    live: RefCell<Vec<Subscription>>,
    pending_add: RefCell<Vec<Subscription>>,
    pending_remove: RefCell<Vec<SubscriberId>>,
    dispatching: Cell<bool>,
}

impl KindTable {
    fn in_live(&self, id: SubscriberId) -> bool {
        self.live.borrow().iter().any(|s| s.id() == id)
    }

    fn in_pending_add(&self, id: SubscriberId) -> bool {
        self.pending_add.borrow().iter().any(|s| s.id() == id)
    }

    fn in_pending_remove(&self, id: SubscriberId) -> bool {
        self.pending_remove.borrow().contains(&id)
    }

    fn remove_live(&self, id: SubscriberId) -> bool {
        let mut live = self.live.borrow_mut();
        match live.iter().position(|s| s.id() == id) {
            // Order-preserving: notification order is insertion order.
            Some(index) => {
                live.remove(index);
                true
            }
            None => false,
        }
    }

    fn remove_pending_add(&self, id: SubscriberId) {
        let mut pending = self.pending_add.borrow_mut();
        if let Some(index) = pending.iter().position(|s| s.id() == id) {
            pending.remove(index);
        }
    }

    fn remove_pending_remove(&self, id: SubscriberId) {
        let mut pending = self.pending_remove.borrow_mut();
        if let Some(index) = pending.iter().position(|pending_id| *pending_id == id) {
            pending.remove(index);
        }
    }
}

/// Subscriber lists for every [`EventKind`], plus their staging areas.
pub struct SubscriptionTable {
    kinds: [KindTable; EventKind::COUNT],
    any_pending: Cell<bool>,
}

impl SubscriptionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            kinds: std::array::from_fn(|_| KindTable::default()),
            any_pending: Cell::new(false),
        }
    }

    #[inline]
    fn kind(&self, kind: EventKind) -> &KindTable {
        &self.kinds[kind.index()]
    }

    /// Stages a subscription of `subscriber` to `kind`.
    ///
    /// Returns `true` if the subscriber is, or will be after the next commit,
    /// subscribed. Returns `false` without staging anything if the script has
    /// no handler for `kind`; the miss is logged unless `fail_silently`.
    pub fn subscribe(
        &self,
        subscriber: SubscriberHandle,
        kind: EventKind,
        context: ScriptContext,
        fail_silently: bool,
    ) -> bool {
        match self.try_subscribe(subscriber, kind, context) {
            Ok(()) => true,
            Err(e) => {
                if !fail_silently {
                    error!("❌ Error subscribing to {} event: {}", kind, e);
                }
                false
            }
        }
    }

    /// Stages a subscription of `subscriber` to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MissingHandler`] if the script does not define
    /// the handler for `kind`. Nothing is staged in that case.
    pub fn try_subscribe(
        &self,
        subscriber: SubscriberHandle,
        kind: EventKind,
        context: ScriptContext,
    ) -> Result<(), EventError> {
        let id = subscriber.id();
        let table = self.kind(kind);

        if table.in_live(id) || table.in_pending_add(id) {
            return Ok(());
        }

        if !subscriber.has_handler(kind) {
            return Err(EventError::MissingHandler {
                event: kind,
                handler: kind.handler_name(),
                script: subscriber.name().to_string(),
            });
        }

        // Re-subscribing cancels a removal staged earlier this tick.
        table.remove_pending_remove(id);

        trace!("➕ '{}' pending subscription to {} ({})", subscriber.name(), kind, context);
        table.pending_add.borrow_mut().push(Subscription { subscriber, context });
        self.any_pending.set(true);
        Ok(())
    }

    /// Stages removal of `id` from `kind`. No-op if it is not subscribed or
    /// already pending removal.
    pub fn unsubscribe(&self, id: SubscriberId, kind: EventKind) {
        let table = self.kind(kind);

        if (table.in_live(id) || table.in_pending_add(id)) && !table.in_pending_remove(id) {
            table.remove_pending_add(id);
            table.pending_remove.borrow_mut().push(id);
            self.any_pending.set(true);
            trace!("➖ {} pending unsubscription from {}", id, kind);
        }
    }

    /// Removes `id` from `kind` without staging.
    ///
    /// Only valid when no dispatch of `kind` is running, e.g. while the
    /// owning session is being torn down.
    pub fn unsubscribe_immediate(&self, id: SubscriberId, kind: EventKind) {
        let table = self.kind(kind);
        debug_assert!(!table.dispatching.get(), "immediate unsubscribe during {kind} dispatch");

        table.remove_live(id);
        table.remove_pending_add(id);
        table.remove_pending_remove(id);
    }

    /// Stages removal of `id` from every event kind.
    pub fn unsubscribe_all(&self, id: SubscriberId) {
        for kind in EventKind::ALL {
            self.unsubscribe(id, kind);
        }
    }

    /// Removes `id` from every event kind without staging.
    pub fn unsubscribe_all_immediate(&self, id: SubscriberId) {
        for kind in EventKind::ALL {
            self.unsubscribe_immediate(id, kind);
        }
    }

    /// Takes `id` out of every event kind as soon as it is safe to.
    ///
    /// Kinds that are not being dispatched lose the subscriber on the spot.
    /// The kind currently being dispatched only stages the removal, which the
    /// next commit applies. Used when a subscriber is destroyed, so later
    /// events in the same tick never reach it.
    pub fn detach(&self, id: SubscriberId) {
        for kind in EventKind::ALL {
            if self.kind(kind).dispatching.get() {
                self.unsubscribe(id, kind);
            } else {
                self.unsubscribe_immediate(id, kind);
            }
        }
    }

    /// Whether `id` is in the live list for `kind`.
    pub fn is_subscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.kind(kind).in_live(id)
    }

    /// Whether `id` is staged to be added to `kind`.
    pub fn is_pending_subscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.kind(kind).in_pending_add(id)
    }

    /// Whether `id` is staged to be removed from `kind`.
    pub fn is_pending_unsubscribed(&self, id: SubscriberId, kind: EventKind) -> bool {
        self.kind(kind).in_pending_remove(id)
    }

    /// Whether any subscribe or unsubscribe is waiting for a commit.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.any_pending.get()
    }

    /// Number of live subscribers for `kind`.
    #[inline]
    pub fn live_count(&self, kind: EventKind) -> usize {
        self.kind(kind).live.borrow().len()
    }

    /// Live subscription at `index` for `kind`, cloned out of the list.
    #[inline]
    pub fn live_at(&self, kind: EventKind, index: usize) -> Option<Subscription> {
        self.kind(kind).live.borrow().get(index).cloned()
    }

    /// Applies every staged change. Removals go first, so a subscriber that
    /// subscribed and unsubscribed within the same tick never becomes live.
    ///
    /// Returns `true` if anything was staged.
    pub fn commit(&self) -> bool {
        if !self.any_pending.get() {
            return false;
        }

        let mut removed = 0usize;
        let mut added = 0usize;

        for table in &self.kinds {
            for id in table.pending_remove.borrow().iter() {
                if table.remove_live(*id) {
                    removed += 1;
                }
            }
        }

        for table in &self.kinds {
            let mut pending = table.pending_add.borrow_mut();
            added += pending.len();
            table.live.borrow_mut().append(&mut pending);
        }

        for table in &self.kinds {
            table.pending_add.borrow_mut().clear();
            table.pending_remove.borrow_mut().clear();
        }

        self.any_pending.set(false);
        debug!("🔄 Committed subscriptions: {} added, {} removed", added, removed);
        true
    }

    /// Marks `kind` as being dispatched. Returns `false` if it already is.
    pub(crate) fn begin_dispatch(&self, kind: EventKind) -> bool {
        !self.kind(kind).dispatching.replace(true)
    }

    pub(crate) fn end_dispatch(&self, kind: EventKind) {
        self.kind(kind).dispatching.set(false);
    }

    /// Whether a dispatch of any kind is in flight.
    pub fn is_dispatching(&self) -> bool {
        self.kinds.iter().any(|table| table.dispatching.get())
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let count = self.live_count(kind);
            if count > 0 {
                map.entry(&kind.name(), &count);
            }
        }
        map.finish()
    }
}
