//! TOML configuration for an app and its router
//!
//! ```toml
//! [app]
//! title = "Shop"
//! storage_prefix = "shop_"
//!
//! [state]
//! count = 0
//!
//! [fallbacks]
//! component-render = "<p>oops</p>"
//!
//! [router]
//! mode = "history"
//! container = "#app"
//!
//! [router.routes]
//! "/" = "<h1>Home</h1>"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::app::{App, DEFAULT_TITLE};
use crate::boundary::{ErrorKind, DEFAULT_FALLBACK};
use crate::router::{History, Mode, Router, RouterError, RouterOptions, DEFAULT_NOT_FOUND};
use crate::storage::{MemoryStorage, Saves, DEFAULT_PREFIX};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unknown fallback kind '{0}'")]
    UnknownFallback(String),
    #[error("Invalid state value for '{key}': {source}")]
    State {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub mode: Mode,
    pub container: String,
    pub not_found: String,
    /// Path -> template
    pub routes: BTreeMap<String, String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Hash,
            container: "#app".to_string(),
            not_found: DEFAULT_NOT_FOUND.to_string(),
            routes: BTreeMap::new(),
        }
    }
}

impl RouterConfig {
    pub fn with_route(mut self, path: impl Into<String>, template: impl Into<String>) -> Self {
        self.routes.insert(path.into(), template.into());
        self
    }

    pub fn options(&self) -> RouterOptions {
        RouterOptions::default()
            .with_mode(self.mode)
            .with_container(self.container.clone())
            .with_not_found(self.not_found.clone())
    }

    /// Create a router for `app` with every configured route
    pub fn build(&self, app: &App, history: impl History + 'static) -> Result<Router, RouterError> {
        let router = Router::new(app, history, self.options())?;
        for (path, template) in &self.routes {
            router.add(path.clone(), template.clone());
        }
        Ok(router)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub storage_prefix: String,
    /// Initial values for the primary store
    pub state: BTreeMap<String, Value>,
    /// Error kind name (or `default`) -> markup
    pub fallbacks: BTreeMap<String, String>,
    pub router: Option<RouterConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            storage_prefix: DEFAULT_PREFIX.to_string(),
            state: BTreeMap::new(),
            fallbacks: BTreeMap::new(),
            router: None,
        }
    }
}

#[derive(Deserialize)]
struct TomlConfig {
    app: Option<TomlApp>,
    #[serde(default)]
    state: BTreeMap<String, toml::Value>,
    #[serde(default)]
    fallbacks: BTreeMap<String, String>,
    router: Option<TomlRouter>,
}

#[derive(Deserialize)]
struct TomlApp {
    title: Option<String>,
    storage_prefix: Option<String>,
}

#[derive(Deserialize)]
struct TomlRouter {
    #[serde(default)]
    mode: Mode,
    container: Option<String>,
    not_found: Option<String>,
    #[serde(default)]
    routes: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    pub fn with_fallback(mut self, kind: impl Into<String>, markup: impl Into<String>) -> Self {
        self.fallbacks.insert(kind.into(), markup.into());
        self
    }

    pub fn with_router(mut self, router: RouterConfig) -> Self {
        self.router = Some(router);
        self
    }

    /// Build an app persisting to in-memory storage
    pub fn build(&self) -> App {
        self.build_with_backend(MemoryStorage::new())
    }

    /// Build an app: title, fallbacks, then initial state
    pub fn build_with_backend(&self, backend: MemoryStorage) -> App {
        let app = App::with_saves(Saves::new(self.storage_prefix.clone(), backend));
        app.set_title(self.title.clone());
        for (kind, markup) in &self.fallbacks {
            app.boundary().set_fallback(kind, markup.clone());
        }
        for (key, value) in &self.state {
            app.set(key.clone(), value.clone());
        }
        app
    }
}

impl FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let parsed: TomlConfig = toml::from_str(content)?;

        for kind in parsed.fallbacks.keys() {
            if kind != DEFAULT_FALLBACK && kind.parse::<ErrorKind>().is_err() {
                return Err(ConfigError::UnknownFallback(kind.clone()));
            }
        }

        let mut state = BTreeMap::new();
        for (key, value) in parsed.state {
            let value = serde_json::to_value(value).map_err(|source| ConfigError::State {
                key: key.clone(),
                source,
            })?;
            state.insert(key, value);
        }

        let defaults = AppConfig::default();
        let app = parsed.app;
        Ok(AppConfig {
            title: app
                .as_ref()
                .and_then(|a| a.title.clone())
                .unwrap_or(defaults.title),
            storage_prefix: app
                .as_ref()
                .and_then(|a| a.storage_prefix.clone())
                .unwrap_or(defaults.storage_prefix),
            state,
            fallbacks: parsed.fallbacks,
            router: parsed.router.map(|r| {
                let defaults = RouterConfig::default();
                RouterConfig {
                    mode: r.mode,
                    container: r.container.unwrap_or(defaults.container),
                    not_found: r.not_found.unwrap_or(defaults.not_found),
                    routes: r.routes,
                }
            }),
        })
    }
}
