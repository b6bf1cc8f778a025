//! Event firing.
//!
//! One entry point per payload shape, all funnelling into
//! [`EventManager::fire_with`]. The payload is built only after suppression
//! has been checked, and at most once per firing.
//!
//! A handler failure stops delivery of that one firing: later subscribers
//! in the list do not see it, but every other event and every later firing
//! is unaffected. Failures never reach the caller. A script destroyed
//! earlier in the same firing is skipped rather than counted again.

use crate::events::{EventKind, EventPayload, PlayerChange, ScriptError, ZoneTransit};
use crate::manager::EventManager;
use crate::subscriptions::{Subscription, SubscriptionTable};
use crate::types::{ObjectRef, PlayerInfoRef, ShipRef, SubscriberId, ZoneRef};
use tracing::{debug, error, trace, warn};

/// Clears the per-kind dispatch flag even if a handler unwinds.
struct DispatchGuard<'a> {
    table: &'a SubscriptionTable,
    kind: EventKind,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.table.end_dispatch(self.kind);
    }
}

impl EventManager {
    /// Fires `kind` to every live subscriber except `sender`.
    ///
    /// `payload` runs only if the event is not suppressed. Subscribers are
    /// notified in subscription order; the live list is fixed for the whole
    /// firing because handler-side subscribe/unsubscribe calls are staged.
    pub fn fire_with<F>(&self, kind: EventKind, sender: Option<SubscriberId>, payload: F)
    where
        F: FnOnce() -> EventPayload,
    {
        if self.suppression.should_suppress(self.table.live_count(kind)) {
            self.stats.borrow_mut().events_suppressed += 1;
            return;
        }

        if !self.table.begin_dispatch(kind) {
            warn!(
                "⚠️ Handler fired {} while {} was being dispatched; ignoring nested firing",
                kind, kind
            );
            self.stats.borrow_mut().nested_dispatches_rejected += 1;
            return;
        }
        let _guard = DispatchGuard { table: &self.table, kind };

        let payload = payload();
        if !payload.fits(kind) {
            error!("❌ {} fired with a mismatched payload {:?}; dropping it", kind, payload);
            return;
        }

        if kind == EventKind::Tick {
            self.suppression.consume_tick();
        }

        let count = self.table.live_count(kind);
        self.stats.borrow_mut().events_fired += 1;
        trace!("📨 Firing {} to {} subscriber(s)", kind, count);

        for index in 0..count {
            let Some(subscription) = self.table.live_at(kind, index) else {
                break;
            };

            if sender == Some(subscription.id()) {
                continue;
            }

            self.stats.borrow_mut().handler_invocations += 1;
            match subscription.subscriber.invoke_handler(kind, &payload) {
                Ok(()) => {}
                Err(ScriptError::Destroyed(name)) => {
                    debug!("Skipping {} for destroyed script '{}'", kind, name);
                }
                Err(e) => {
                    self.handle_firing_error(&subscription, kind, &e);
                    return;
                }
            }
        }
    }

    /// Applies the failure policy for a handler that returned an error.
    fn handle_firing_error(&self, subscription: &Subscription, kind: EventKind, e: &ScriptError) {
        self.stats.borrow_mut().handler_failures += 1;

        if subscription.context.is_robot() {
            error!(
                script = %subscription.subscriber.name(),
                "❌ Error handling event {}: {}. Shutting bot down.",
                kind,
                e
            );
            subscription.subscriber.destroy();
            self.stats.borrow_mut().subscribers_destroyed += 1;
        } else {
            error!(
                script = %subscription.subscriber.name(),
                context = %subscription.context,
                "❌ Error firing event {}: {}",
                kind,
                e
            );
        }

        subscription.subscriber.clear_script_state();
    }

    /// NexusOpened, NexusClosed
    pub fn fire_event(&self, kind: EventKind) {
        self.fire_with(kind, None, || EventPayload::Empty);
    }

    /// Tick. Each delivered tick spends one step while paused.
    pub fn fire_tick(&self, delta_ms: u32) {
        self.fire_with(EventKind::Tick, None, || EventPayload::Tick { delta_ms });
    }

    /// ShipSpawned
    pub fn fire_ship_spawned(&self, ship: &ShipRef) {
        self.fire_with(EventKind::ShipSpawned, None, || EventPayload::Ship { ship: ship.clone() });
    }

    /// ShipKilled. The damaging object and shooter are absent for
    /// environmental deaths.
    pub fn fire_ship_killed(
        &self,
        ship: &ShipRef,
        damaging_object: Option<&ObjectRef>,
        shooter: Option<&ObjectRef>,
    ) {
        self.fire_with(EventKind::ShipKilled, None, || EventPayload::ShipKilled {
            ship: ship.clone(),
            damaging_object: damaging_object.cloned(),
            shooter: shooter.cloned(),
        });
    }

    /// CoreDestroyed
    pub fn fire_core_destroyed(&self, core: &ObjectRef) {
        self.fire_with(EventKind::CoreDestroyed, None, || EventPayload::Core {
            core: core.clone(),
        });
    }

    /// ChatMessage. The sending script, if any, does not hear its own message.
    pub fn fire_chat_message(
        &self,
        sender: Option<SubscriberId>,
        message: &str,
        player: Option<&PlayerInfoRef>,
        is_global: bool,
    ) {
        self.fire_with(EventKind::ChatMessage, sender, || EventPayload::Chat {
            message: message.to_string(),
            player: player.cloned(),
            is_global,
        });
    }

    /// PlayerJoined, PlayerLeft, PlayerTeamChanged. A script that is itself
    /// the acting player is not told about its own joining or leaving.
    pub fn fire_player_event(
        &self,
        change: PlayerChange,
        acting: Option<SubscriberId>,
        player: &PlayerInfoRef,
    ) {
        self.fire_with(change.kind(), acting, || EventPayload::Player {
            player: player.clone(),
        });
    }

    /// ScoreChanged
    pub fn fire_score_changed(
        &self,
        score: i32,
        team_index: i32,
        player: Option<&PlayerInfoRef>,
    ) {
        self.fire_with(EventKind::ScoreChanged, None, || EventPayload::Score {
            score,
            team_index,
            player: player.cloned(),
        });
    }

    /// ZoneEntered, ZoneLeft
    pub fn fire_zone_event(&self, transit: ZoneTransit, ship: &ShipRef, zone: &ZoneRef) {
        self.fire_with(transit.kind(), None, || EventPayload::Zone {
            ship: ship.clone(),
            zone: zone.clone(),
        });
    }
}
