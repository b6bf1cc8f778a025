//! Scripted subscriber double for unit tests.

use crate::events::{EventKind, EventPayload, ScriptError};
use crate::subscriber::{Subscriber, SubscriberHandle};
use crate::types::SubscriberId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Hook = Box<dyn Fn()>;

struct MockInner {
    id: SubscriberId,
    name: String,
    handlers: Vec<EventKind>,
    calls: RefCell<Vec<(EventKind, EventPayload)>>,
    failing: Cell<bool>,
    destroys: Cell<u32>,
    clears: Cell<u32>,
    hook: RefCell<Option<Hook>>,
    destroy_hook: RefCell<Option<Hook>>,
}

/// Cheaply clonable mock; every clone and handle shares one script.
#[derive(Clone)]
pub(crate) struct MockScript(Rc<MockInner>);

impl MockScript {
    pub fn handling(name: &str, handlers: &[EventKind]) -> Self {
        Self(Rc::new(MockInner {
            id: SubscriberId::new(),
            name: name.to_string(),
            handlers: handlers.to_vec(),
            calls: RefCell::new(Vec::new()),
            failing: Cell::new(false),
            destroys: Cell::new(0),
            clears: Cell::new(0),
            hook: RefCell::new(None),
            destroy_hook: RefCell::new(None),
        }))
    }

    pub fn handle(&self) -> SubscriberHandle {
        Rc::new(self.clone())
    }

    pub fn id(&self) -> SubscriberId {
        self.0.id
    }

    pub fn fail_handlers(&self) {
        self.0.failing.set(true);
    }

    /// Runs `hook` inside every handler invocation, before returning.
    pub fn on_invoke(&self, hook: impl Fn() + 'static) {
        *self.0.hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Runs `hook` whenever the engine destroys this script.
    pub fn on_destroy(&self, hook: impl Fn() + 'static) {
        *self.0.destroy_hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<(EventKind, EventPayload)> {
        self.0.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.0.calls.borrow().len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroys.get() > 0
    }

    pub fn destroy_count(&self) -> u32 {
        self.0.destroys.get()
    }

    pub fn state_clears(&self) -> u32 {
        self.0.clears.get()
    }
}

impl Subscriber for MockScript {
    fn id(&self) -> SubscriberId {
        self.0.id
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn has_handler(&self, kind: EventKind) -> bool {
        self.0.handlers.contains(&kind)
    }

    fn invoke_handler(&self, kind: EventKind, payload: &EventPayload) -> Result<(), ScriptError> {
        if self.is_destroyed() {
            return Err(ScriptError::Destroyed(self.0.name.clone()));
        }
        self.0.calls.borrow_mut().push((kind, payload.clone()));
        if let Some(hook) = self.0.hook.borrow().as_ref() {
            hook();
        }
        if self.0.failing.get() {
            let message = format!("attempt to index a nil value in {}", kind.handler_name());
            return Err(ScriptError::Runtime(message));
        }
        Ok(())
    }

    fn destroy(&self) {
        self.0.destroys.set(self.0.destroys.get() + 1);
        if let Some(hook) = self.0.destroy_hook.borrow().as_ref() {
            hook();
        }
    }

    fn clear_script_state(&self) {
        self.0.clears.set(self.0.clears.get() + 1);
    }
}
