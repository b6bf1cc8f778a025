//! Tests for subscription staging, dispatch and suppression through the
//! event manager.

#[cfg(test)]
mod tests {
    use crate::events::{EventError, EventKind, EventPayload, PlayerChange, ZoneTransit};
    use crate::manager::EventManager;
    use crate::testing::MockScript;
    use crate::types::{ObjectId, ObjectRef, PlayerInfoRef, ScriptContext, ShipRef, ZoneRef};
    use std::cell::Cell;
    use std::rc::Rc;

    fn ship(id: u32) -> ShipRef {
        ShipRef { id: ObjectId(id), pilot: Some("Robot".to_string()), team_index: 1 }
    }

    fn live(manager: &EventManager, script: &MockScript, kind: EventKind) -> MockScript {
        assert!(manager.subscribe(script.handle(), kind, ScriptContext::Robot, false));
        script.clone()
    }

    #[test]
    fn test_idempotent_subscribe() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);

        assert!(manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false));
        assert!(manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false));
        manager.commit();

        assert_eq!(manager.subscriber_count(EventKind::Tick), 1);
        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 1);
    }

    #[test]
    fn test_missing_handler_rejection() {
        let manager = EventManager::new();
        let levelgen = MockScript::handling("levelgen", &[EventKind::ScoreChanged]);

        let context = ScriptContext::Levelgen;
        assert!(!manager.subscribe(levelgen.handle(), EventKind::Tick, context, false));
        manager.commit();

        assert!(!manager.is_subscribed(levelgen.id(), EventKind::Tick));
        assert!(!manager.is_pending_subscribed(levelgen.id(), EventKind::Tick));

        let err = manager
            .try_subscribe(levelgen.handle(), EventKind::Tick, ScriptContext::Levelgen)
            .unwrap_err();
        assert!(matches!(err, EventError::MissingHandler { event: EventKind::Tick, .. }));
        assert_eq!(err.to_string(), "Script 'levelgen' has no onTick function for the Tick event");
    }

    #[test]
    fn test_deferred_visibility() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);

        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        assert!(!manager.is_subscribed(bot.id(), EventKind::Tick));
        assert!(manager.is_pending_subscribed(bot.id(), EventKind::Tick));

        // Not live yet, so nothing to deliver to.
        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 0);

        manager.commit();
        assert!(manager.is_subscribed(bot.id(), EventKind::Tick));
        assert!(!manager.is_pending_subscribed(bot.id(), EventKind::Tick));
    }

    #[test]
    fn test_subscribe_then_unsubscribe_same_tick() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);

        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.unsubscribe(bot.id(), EventKind::Tick);
        manager.commit();

        assert!(!manager.is_subscribed(bot.id(), EventKind::Tick));
        assert!(!manager.is_pending_subscribed(bot.id(), EventKind::Tick));
        assert!(!manager.is_pending_unsubscribed(bot.id(), EventKind::Tick));
        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 0);
    }

    #[test]
    fn test_mutation_during_dispatch() {
        let manager = Rc::new(EventManager::new());
        let kind = EventKind::ShipSpawned;
        let a = MockScript::handling("a", &[kind]);
        let b = MockScript::handling("b", &[kind]);
        let c = MockScript::handling("c", &[kind]);
        let d = MockScript::handling("d", &[kind]);
        for script in [&a, &b, &c] {
            live(&manager, script, kind);
        }
        manager.commit();

        let weak = Rc::downgrade(&manager);
        let (b_id, d_handle) = (b.id(), d.handle());
        a.on_invoke(move || {
            let manager = weak.upgrade().expect("manager alive during dispatch");
            manager.unsubscribe(b_id, kind);
            manager.subscribe(d_handle.clone(), kind, ScriptContext::Robot, false);
        });

        manager.fire_ship_spawned(&ship(7));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1, "b was live when the firing started");
        assert_eq!(c.call_count(), 1);
        assert_eq!(d.call_count(), 0, "d was only pending");

        manager.commit();
        assert!(!manager.is_subscribed(b.id(), kind));
        assert!(manager.is_subscribed(d.id(), kind));

        manager.fire_ship_spawned(&ship(8));
        assert_eq!(b.call_count(), 1);
        assert_eq!(d.call_count(), 1);
    }

    #[test]
    fn test_fail_fast_per_event() {
        let manager = EventManager::new();
        let kind = EventKind::ScoreChanged;
        let a = MockScript::handling("a", &[kind, EventKind::Tick]);
        let b = MockScript::handling("b", &[kind]);
        let c = MockScript::handling("c", &[kind, EventKind::Tick]);
        for script in [&a, &b, &c] {
            manager.subscribe(script.handle(), kind, ScriptContext::Levelgen, false);
        }
        manager.subscribe(a.handle(), EventKind::Tick, ScriptContext::Levelgen, false);
        manager.subscribe(c.handle(), EventKind::Tick, ScriptContext::Levelgen, false);
        manager.commit();
        b.fail_handlers();

        manager.fire_score_changed(10, 0, None);
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 0);

        // Other kinds and later firings are unaffected.
        manager.fire_tick(16);
        assert_eq!(c.call_count(), 1);
        manager.fire_score_changed(11, 0, None);
        assert_eq!(a.call_count(), 3);
        assert_eq!(b.call_count(), 2);
        assert_eq!(manager.stats().handler_failures, 2);
    }

    #[test]
    fn test_robot_failure_destroys_subscriber() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);
        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.commit();
        bot.fail_handlers();

        manager.fire_tick(16);

        assert!(bot.is_destroyed());
        assert_eq!(bot.state_clears(), 1);
        assert_eq!(manager.stats().subscribers_destroyed, 1);
    }

    #[test]
    fn test_levelgen_failure_only_logs() {
        let manager = EventManager::new();
        let levelgen = MockScript::handling("levelgen", &[EventKind::Tick, EventKind::NexusOpened]);
        manager.subscribe(levelgen.handle(), EventKind::Tick, ScriptContext::Levelgen, false);
        manager.subscribe(
            levelgen.handle(),
            EventKind::NexusOpened,
            ScriptContext::Levelgen,
            false,
        );
        manager.commit();
        levelgen.fail_handlers();

        manager.fire_tick(16);
        manager.fire_event(EventKind::NexusOpened);

        assert!(!levelgen.is_destroyed());
        assert_eq!(levelgen.state_clears(), 2);
        assert!(manager.is_subscribed(levelgen.id(), EventKind::NexusOpened));
        assert_eq!(manager.stats().subscribers_destroyed, 0);
    }

    #[test]
    fn test_zero_subscribers_never_build_payload() {
        let manager = EventManager::new();
        let built = Cell::new(0);

        for kind in EventKind::ALL {
            manager.fire_with(kind, None, || {
                built.set(built.get() + 1);
                EventPayload::Empty
            });
        }

        assert_eq!(built.get(), 0);
        assert_eq!(manager.stats().events_suppressed, EventKind::COUNT as u64);
        assert_eq!(manager.stats().events_fired, 0);
    }

    #[test]
    fn test_pause_and_step() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);
        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.commit();

        manager.set_paused(true);
        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 0);

        manager.add_steps(2);
        assert_eq!(manager.step_budget(), 2);
        manager.fire_tick(16);
        assert_eq!(manager.step_budget(), 1);
        manager.fire_tick(16);
        assert_eq!(manager.step_budget(), 0);
        manager.fire_tick(16);

        assert_eq!(bot.call_count(), 2);
        assert_eq!(manager.step_budget(), 0);
    }

    #[test]
    fn test_pause_suppresses_every_kind() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick, EventKind::ChatMessage]);
        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.subscribe(bot.handle(), EventKind::ChatMessage, ScriptContext::Robot, false);
        manager.commit();
        manager.set_paused(true);

        manager.fire_chat_message(None, "hello", None, true);
        assert_eq!(bot.call_count(), 0);

        // Steps let other kinds through too, but only ticks spend them.
        manager.add_steps(1);
        manager.fire_chat_message(None, "hello", None, true);
        assert_eq!(manager.step_budget(), 1);
        manager.fire_tick(16);
        manager.fire_chat_message(None, "hello again", None, true);
        assert_eq!(bot.call_count(), 2);
    }

    #[test]
    fn test_add_steps_ignored_while_running() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);
        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.commit();

        manager.add_steps(5);
        for _ in 0..8 {
            manager.fire_tick(16);
        }

        assert_eq!(bot.call_count(), 8);
        assert_eq!(manager.step_budget(), -1);

        // Pausing afterwards does not inherit the ignored steps.
        manager.set_paused(true);
        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 8);
    }

    #[test]
    fn test_self_notification_suppression() {
        let manager = EventManager::new();
        let x = MockScript::handling("x", &[EventKind::ChatMessage]);
        let y = MockScript::handling("y", &[EventKind::ChatMessage]);
        manager.subscribe(x.handle(), EventKind::ChatMessage, ScriptContext::Robot, false);
        manager.subscribe(y.handle(), EventKind::ChatMessage, ScriptContext::Robot, false);
        manager.commit();

        let author = PlayerInfoRef::robot("x", 0);
        manager.fire_chat_message(Some(x.id()), "gg", Some(&author), false);

        assert_eq!(x.call_count(), 0);
        assert_eq!(
            y.calls(),
            vec![(
                EventKind::ChatMessage,
                EventPayload::Chat {
                    message: "gg".to_string(),
                    player: Some(author),
                    is_global: false,
                }
            )]
        );
    }

    #[test]
    fn test_acting_player_not_told_about_itself() {
        let manager = EventManager::new();
        let joining = MockScript::handling("joining", &[EventKind::PlayerJoined]);
        let watcher = MockScript::handling("watcher", &[EventKind::PlayerJoined]);
        manager.subscribe(joining.handle(), EventKind::PlayerJoined, ScriptContext::Robot, false);
        manager.subscribe(
            watcher.handle(),
            EventKind::PlayerJoined,
            ScriptContext::Levelgen,
            false,
        );
        manager.commit();

        let player = PlayerInfoRef::robot("joining", 1);
        manager.fire_player_event(PlayerChange::Joined, Some(joining.id()), &player);

        assert_eq!(joining.call_count(), 0);
        assert_eq!(watcher.call_count(), 1);
    }

    #[test]
    #[should_panic(expected = "only one EventManager")]
    fn test_double_construction_is_fatal() {
        let _first = EventManager::new();
        let _second = EventManager::new();
    }

    #[test]
    fn test_try_new_reports_duplicate() {
        let first = EventManager::try_new().expect("first construction succeeds");
        assert!(matches!(EventManager::try_new(), Err(EventError::DuplicateConstruction)));
        drop(first);
        assert!(EventManager::try_new().is_ok());
    }

    #[test]
    fn test_singleton_lifecycle() {
        assert!(!EventManager::is_initialized());
        let first = EventManager::get();
        let again = EventManager::get();
        assert!(Rc::ptr_eq(&first, &again));
        drop(again);

        EventManager::shutdown();
        assert!(!EventManager::is_initialized());
        drop(first);

        let fresh = EventManager::get();
        assert!(EventManager::is_initialized());
        assert_eq!(fresh.subscriber_count(EventKind::Tick), 0);
        drop(fresh);
        EventManager::shutdown();
    }

    #[test]
    fn test_handler_can_reach_singleton() {
        let manager = EventManager::get();
        let bot = MockScript::handling("bot", &[EventKind::Tick, EventKind::CoreDestroyed]);
        let handle = bot.handle();
        let bot_id = bot.id();
        bot.on_invoke(move || {
            let manager = EventManager::get();
            if manager.is_subscribed(bot_id, EventKind::Tick) {
                manager.unsubscribe(bot_id, EventKind::Tick);
                manager.subscribe(
                    handle.clone(),
                    EventKind::CoreDestroyed,
                    ScriptContext::Robot,
                    false,
                );
            }
        });
        manager.subscribe(bot.handle(), EventKind::Tick, ScriptContext::Robot, false);
        manager.commit();

        manager.fire_tick(16);
        manager.commit();
        manager.fire_core_destroyed(&ObjectRef { id: ObjectId(3), type_number: 44 });

        assert!(!manager.is_subscribed(bot_id, EventKind::Tick));
        assert_eq!(bot.call_count(), 2);

        // Session teardown: no dispatch is running.
        manager.unsubscribe_all_immediate(bot_id);
        drop(manager);
        EventManager::shutdown();
    }

    #[test]
    fn test_nested_firing_of_same_kind_is_rejected() {
        let manager = Rc::new(EventManager::new());
        let bot = MockScript::handling("bot", &[EventKind::NexusOpened, EventKind::NexusClosed]);
        live(&manager, &bot, EventKind::NexusOpened);
        live(&manager, &bot, EventKind::NexusClosed);
        manager.commit();

        let weak = Rc::downgrade(&manager);
        bot.on_invoke(move || {
            if let Some(manager) = weak.upgrade() {
                manager.fire_event(EventKind::NexusOpened);
            }
        });

        manager.fire_event(EventKind::NexusOpened);
        // Outer NexusOpened delivered; nested one rejected.
        assert_eq!(bot.call_count(), 1);
        assert_eq!(manager.stats().nested_dispatches_rejected, 1);

        // A different kind may fire from inside a handler.
        manager.fire_event(EventKind::NexusClosed);
        assert_eq!(bot.calls().last().map(|(kind, _)| *kind), Some(EventKind::NexusOpened));
        assert_eq!(bot.call_count(), 3);
    }

    #[test]
    fn test_commit_during_dispatch_is_deferred() {
        let manager = Rc::new(EventManager::new());
        let bot = MockScript::handling("bot", &[EventKind::Tick]);
        let late = MockScript::handling("late", &[EventKind::Tick]);
        live(&manager, &bot, EventKind::Tick);
        manager.commit();

        let weak = Rc::downgrade(&manager);
        let late_handle = late.handle();
        bot.on_invoke(move || {
            if let Some(manager) = weak.upgrade() {
                manager.subscribe(
                    late_handle.clone(),
                    EventKind::Tick,
                    ScriptContext::Robot,
                    false,
                );
                manager.commit();
            }
        });

        manager.fire_tick(16);
        assert!(manager.is_pending_subscribed(late.id(), EventKind::Tick));
        assert_eq!(late.call_count(), 0);

        manager.commit();
        assert!(manager.is_subscribed(late.id(), EventKind::Tick));
    }

    #[test]
    fn test_zone_payload_reaches_handler() {
        let manager = EventManager::new();
        let levelgen = MockScript::handling("levelgen", &[EventKind::ZoneEntered]);
        manager.subscribe(
            levelgen.handle(),
            EventKind::ZoneEntered,
            ScriptContext::Levelgen,
            false,
        );
        manager.commit();

        let zone = ZoneRef { id: ObjectId(20), type_number: 12, user_assigned_id: 5 };
        manager.fire_zone_event(ZoneTransit::Entered, &ship(2), &zone);
        let shooter = ObjectRef { id: ObjectId(9), type_number: 1 };
        manager.fire_ship_killed(&ship(2), None, Some(&shooter));

        assert_eq!(
            levelgen.calls(),
            vec![(EventKind::ZoneEntered, EventPayload::Zone { ship: ship(2), zone })]
        );
    }

    #[test]
    fn test_destroyed_bot_is_detached_from_other_kinds() {
        let manager = Rc::new(EventManager::new());
        let bot = MockScript::handling("bot", &[EventKind::Tick, EventKind::ChatMessage]);
        let listener = MockScript::handling("listener", &[EventKind::ChatMessage]);
        live(&manager, &bot, EventKind::Tick);
        live(&manager, &bot, EventKind::ChatMessage);
        manager.subscribe(
            listener.handle(),
            EventKind::ChatMessage,
            ScriptContext::Levelgen,
            false,
        );
        manager.commit();

        let weak = Rc::downgrade(&manager);
        let bot_id = bot.id();
        bot.on_destroy(move || {
            if let Some(manager) = weak.upgrade() {
                manager.detach(bot_id);
            }
        });
        bot.fail_handlers();

        manager.fire_tick(16);
        assert!(!manager.is_subscribed(bot_id, EventKind::ChatMessage));
        assert!(manager.is_pending_unsubscribed(bot_id, EventKind::Tick));

        // Same tick, before any commit: the chat still reaches the listener.
        manager.fire_chat_message(None, "gg", None, true);

        assert_eq!(bot.call_count(), 1);
        assert_eq!(listener.call_count(), 1);
        assert_eq!(bot.destroy_count(), 1);
        assert_eq!(manager.stats().handler_failures, 1);
        assert_eq!(manager.stats().subscribers_destroyed, 1);

        manager.commit();
        assert_eq!(manager.subscriber_count(EventKind::Tick), 0);
    }

    #[test]
    fn test_destroyed_subscriber_still_listed_is_skipped() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick, EventKind::ChatMessage]);
        let listener = MockScript::handling("listener", &[EventKind::ChatMessage]);
        live(&manager, &bot, EventKind::Tick);
        live(&manager, &bot, EventKind::ChatMessage);
        manager.subscribe(
            listener.handle(),
            EventKind::ChatMessage,
            ScriptContext::Levelgen,
            false,
        );
        manager.commit();
        bot.fail_handlers();

        manager.fire_tick(16);
        assert!(manager.is_subscribed(bot.id(), EventKind::ChatMessage));
        manager.fire_chat_message(None, "gg", None, true);

        assert_eq!(listener.call_count(), 1);
        assert_eq!(bot.destroy_count(), 1);
        assert_eq!(bot.state_clears(), 1);
        assert_eq!(manager.stats().handler_failures, 1);
        assert_eq!(manager.stats().subscribers_destroyed, 1);
    }

    #[test]
    fn test_mismatched_payload_is_dropped() {
        let manager = EventManager::new();
        let bot = MockScript::handling("bot", &[EventKind::Tick]);
        live(&manager, &bot, EventKind::Tick);
        manager.commit();
        manager.set_paused(true);
        manager.add_steps(1);

        manager.fire_with(EventKind::Tick, None, || EventPayload::Empty);

        assert_eq!(bot.call_count(), 0);
        assert_eq!(manager.step_budget(), 1);
        assert_eq!(manager.stats().events_fired, 0);

        manager.fire_tick(16);
        assert_eq!(bot.call_count(), 1);
        assert_eq!(manager.step_budget(), 0);
    }
}
