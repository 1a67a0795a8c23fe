//! Reactive key/value stores
//!
//! A [`Store`] holds JSON values by key. Writing a value that differs from
//! the current one notifies the key's subscribers in registration order and
//! then every change listener. Writing an equal value does nothing.

mod context;
pub mod value;

pub use context::{ContextError, ContextRegistry};
pub use serde_json::Value;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

/// Per-key callback receiving `(new_value, old_value)`
pub type Subscriber = Rc<dyn Fn(&Value, Option<&Value>)>;

/// Callback receiving every change made to a store
pub type ChangeListener = Rc<dyn Fn(&Change)>;

/// Which store a value lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Primary,
    Context(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Primary => write!(f, "state"),
            Scope::Context(name) => write!(f, "context:{}", name),
        }
    }
}

/// A single effective write
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub scope: Scope,
    pub key: String,
    pub new_value: Value,
    pub old_value: Option<Value>,
}

impl Change {
    /// Key as it appears inside a placeholder: `key` or `ns.key`
    pub fn binding_key(&self) -> String {
        match &self.scope {
            Scope::Primary => self.key.clone(),
            Scope::Context(name) => format!("{}.{}", name, self.key),
        }
    }
}

struct StoreInner {
    scope: Scope,
    values: RefCell<BTreeMap<String, Value>>,
    subscribers: RefCell<HashMap<String, Vec<(u64, Subscriber)>>>,
    listeners: RefCell<Vec<ChangeListener>>,
    next_id: Cell<u64>,
}

/// Shared handle to a reactive map
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("scope", &self.inner.scope)
            .field("values", &self.inner.values.borrow())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Scope::Primary)
    }
}

impl Store {
    pub fn new(scope: Scope) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                scope,
                values: RefCell::new(BTreeMap::new()),
                subscribers: RefCell::new(HashMap::new()),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.values.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.values.borrow().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner.values.borrow().clone()
    }

    /// Write a value, notifying only when it differs from the current one
    ///
    /// Returns whether anything was notified. Subscribers run before change
    /// listeners. No borrow is held while callbacks run, so callbacks may
    /// read or write the store; a callback that keeps rewriting the key it
    /// observes with fresh values recurses without bound.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();

        let old = self
            .inner
            .values
            .borrow_mut()
            .insert(key.clone(), value.clone());
        if old.as_ref() == Some(&value) {
            return false;
        }

        tracing::debug!(scope = %self.inner.scope, key = %key, value = %value, "store value changed");

        let subscribers: Vec<Subscriber> = self
            .inner
            .subscribers
            .borrow()
            .get(&key)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for subscriber in subscribers {
            subscriber(&value, old.as_ref());
        }

        let change = Change {
            scope: self.inner.scope.clone(),
            key,
            new_value: value,
            old_value: old,
        };
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&change);
        }
        true
    }

    /// Apply several writes as independent sequential `set` calls
    ///
    /// Not atomic: if a callback for an earlier key panics, that key stays
    /// written and later keys are never applied.
    pub fn update<K, V, I>(&self, entries: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Delete a key without notifying anyone
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow_mut().remove(key)
    }

    /// Delete every key without notifying anyone
    pub fn clear(&self) {
        self.inner.values.borrow_mut().clear();
    }

    /// Register a callback for one key
    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>) + 'static,
    {
        let key = key.into();
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push((id, Rc::new(callback)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            key,
            id,
        }
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .subscribers
            .borrow()
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Register a listener for every effective write, after existing listeners
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&Change) + 'static,
    {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }
}

/// Handle returned by [`Store::subscribe`]
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe to remove it"]
pub struct Subscription {
    store: Weak<StoreInner>,
    key: String,
    id: u64,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove exactly the callback this handle was issued for
    pub fn unsubscribe(self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut subscribers = store.subscribers.borrow_mut();
        if let Some(subs) = subscribers.get_mut(&self.key) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                subscribers.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Rc<dyn Fn(&Value, Option<&Value>)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let make = move |tag: &str| {
            let log = log2.clone();
            let tag = tag.to_string();
            Rc::new(move |new: &Value, old: Option<&Value>| {
                let old = old.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string());
                log.borrow_mut().push(format!("{}:{}:{}", tag, new, old));
            }) as Rc<dyn Fn(&Value, Option<&Value>)>
        };
        (log, make)
    }

    #[test]
    fn test_get_set() {
        let store = Store::default();
        assert_eq!(store.get("count"), None);
        assert!(store.set("count", 1));
        assert_eq!(store.get("count"), Some(json!(1)));
    }

    #[test]
    fn test_equal_write_notifies_once() {
        let store = Store::default();
        let (log, make) = recorder();
        let cb = make("a");
        let _sub = store.subscribe("k", move |n, o| cb(n, o));

        assert!(store.set("k", json!({"a": 1})));
        assert!(!store.set("k", json!({"a": 1})));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_null_differs_from_absent() {
        let store = Store::default();
        assert!(store.set("k", Value::Null));
        assert!(!store.set("k", Value::Null));
    }

    #[test]
    fn test_subscribers_in_order_with_old_value() {
        let store = Store::default();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        let _a = store.subscribe("k", move |n, o| first(n, o));
        let _b = store.subscribe("k", move |n, o| second(n, o));

        store.set("k", 1);
        store.set("k", 2);
        assert_eq!(
            *log.borrow(),
            vec![
                "first:1:none",
                "second:1:none",
                "first:2:1",
                "second:2:1",
            ]
        );
    }

    #[test]
    fn test_subscribers_run_before_listeners() {
        let store = Store::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        store.on_change(move |change| l1.borrow_mut().push(format!("listener:{}", change.key)));
        let l2 = log.clone();
        let _sub = store.subscribe("k", move |_, _| l2.borrow_mut().push("subscriber".to_string()));

        store.set("k", true);
        assert_eq!(*log.borrow(), vec!["subscriber", "listener:k"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_callback() {
        let store = Store::default();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let sub_a = store.subscribe("k", move |n, o| a(n, o));
        let _sub_b = store.subscribe("k", move |n, o| b(n, o));

        sub_a.unsubscribe();
        assert_eq!(store.subscriber_count("k"), 1);
        store.set("k", "x");
        assert_eq!(*log.borrow(), vec![r#"b:"x":none"#]);
    }

    #[test]
    fn test_update_is_sequential() {
        let store = Store::new(Scope::Context("user".to_string()));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        store.on_change(move |change| c.borrow_mut().push(change.binding_key()));

        store.update([("name", json!("Bob")), ("age", json!(30))]);
        assert_eq!(*changes.borrow(), vec!["user.name", "user.age"]);
    }

    #[test]
    fn test_update_partial_on_panic() {
        let store = Store::default();
        let _sub = store.subscribe("a", |_, _| panic!("subscriber failed"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.update([("a", 1), ("b", 2)]);
        }));
        assert!(result.is_err());
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn test_remove_and_clear_are_silent() {
        let store = Store::default();
        store.set("a", 1);
        store.set("b", 2);
        let notified = Rc::new(Cell::new(0));
        let n = notified.clone();
        store.on_change(move |_| n.set(n.get() + 1));

        assert_eq!(store.remove("a"), Some(json!(1)));
        store.clear();
        assert!(store.keys().is_empty());
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn test_subscriber_may_write_other_key() {
        let store = Store::default();
        let inner = store.clone();
        let _sub = store.subscribe("a", move |n, _| {
            inner.set("b", n.clone());
        });
        store.set("a", 7);
        assert_eq!(store.get("b"), Some(json!(7)));
    }
}
