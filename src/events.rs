//! Structured events for external observers

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::boundary::ErrorKind;
use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    StateChange {
        key: String,
        new_value: Value,
        old_value: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    ContextChange {
        context_name: String,
        key: String,
        new_value: Value,
        old_value: Option<Value>,
    },

    RouteChanged { path: String, template: String },

    Error {
        error: String,
        kind: ErrorKind,
        element: Option<NodeId>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StateChange { .. } => "state-change",
            Event::ContextChange { .. } => "context-change",
            Event::RouteChanged { .. } => "route-changed",
            Event::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Event)>;

struct Entry {
    id: ListenerId,
    /// Only events with this name, or every event when `None`
    filter: Option<&'static str>,
    listener: Listener,
}

/// Ordered listeners shared by every part of an app
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<Vec<Entry>>>,
    next_id: Rc<Cell<u64>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.add(None, Rc::new(listener))
    }

    /// Listen to events with one name, such as `route-changed`
    pub fn on<F>(&self, name: &'static str, listener: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.add(Some(name), Rc::new(listener))
    }

    fn add(&self, filter: Option<&'static str>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Entry {
            id,
            filter,
            listener,
        });
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Deliver an event to matching listeners in registration order
    pub fn emit(&self, event: Event) {
        let name = event.name();
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.filter.map_or(true, |f| f == name))
            .map(|entry| entry.listener.clone())
            .collect();
        for listener in targets {
            listener(&event);
        }
    }
}
