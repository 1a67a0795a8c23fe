//! Namespaced persistence adapter

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "glint_";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored value for '{key}' has an unexpected shape: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value storage the adapter writes through
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Process-local backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }
}

/// JSON values stored under a fixed key prefix
#[derive(Clone)]
pub struct Saves {
    prefix: String,
    backend: Rc<dyn StorageBackend>,
}

impl std::fmt::Debug for Saves {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saves").field("prefix", &self.prefix).finish()
    }
}

impl Default for Saves {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, MemoryStorage::new())
    }
}

impl Saves {
    pub fn new(prefix: impl Into<String>, backend: impl StorageBackend + 'static) -> Self {
        Self {
            prefix: prefix.into(),
            backend: Rc::new(backend),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set_item(&self.full_key(key), &json);
        Ok(())
    }

    /// Read a value; text that is not JSON comes back as a string
    pub fn get(&self, key: &str) -> Option<Value> {
        let raw = self.backend.get_item(&self.full_key(key))?;
        if raw.is_empty() {
            return None;
        }
        Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }

    /// Read a value into a concrete type
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StorageError::Deserialize {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn remove(&self, key: &str) {
        self.backend.remove_item(&self.full_key(key));
    }

    /// Remove every key under this prefix, leaving other keys alone
    pub fn clear(&self) {
        for key in self.backend.keys() {
            if key.starts_with(&self.prefix) {
                self.backend.remove_item(&key);
            }
        }
    }

    /// Keys under this prefix, prefix stripped
    pub fn keys(&self) -> Vec<String> {
        self.backend
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }
}
