//! Named context stores

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use super::{Scope, Store};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context requires a non-empty name")]
    EmptyName,

    #[error("Context with name '{0}' not found")]
    NotFound(String),
}

type CreateHook = Rc<dyn Fn(&Store)>;

/// Lookup-or-create registry holding at most one store per name
#[derive(Clone, Default)]
pub struct ContextRegistry {
    contexts: Rc<RefCell<Vec<(String, Store)>>>,
    hooks: Rc<RefCell<Vec<CreateHook>>>,
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the store for `name`, creating it on first use
    pub fn context(&self, name: &str) -> Result<Store, ContextError> {
        if name.is_empty() {
            return Err(ContextError::EmptyName);
        }
        if let Some(store) = self.find(name) {
            return Ok(store);
        }

        let store = Store::new(Scope::Context(name.to_string()));
        self.contexts
            .borrow_mut()
            .push((name.to_string(), store.clone()));
        tracing::debug!(context = name, "context created");

        let hooks = self.hooks.borrow().clone();
        for hook in hooks {
            hook(&store);
        }
        Ok(store)
    }

    /// Strict lookup that never creates
    pub fn get(&self, name: &str) -> Result<Store, ContextError> {
        self.find(name)
            .ok_or_else(|| ContextError::NotFound(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<Store> {
        self.contexts
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, store)| store.clone())
    }

    /// Context names in creation order
    pub fn names(&self) -> Vec<String> {
        self.contexts
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn stores(&self) -> Vec<Store> {
        self.contexts
            .borrow()
            .iter()
            .map(|(_, store)| store.clone())
            .collect()
    }

    /// Run `hook` for every context created from now on
    pub fn on_create<F>(&self, hook: F)
    where
        F: Fn(&Store) + 'static,
    {
        self.hooks.borrow_mut().push(Rc::new(hook));
    }
}
