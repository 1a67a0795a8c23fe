//! Error boundary: local error capture with fallback markup

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::events::{Event, EventBus};

/// Where an error was caught
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ComponentRender,
    ComponentLifecycle,
    TemplateRender,
    RouterResolve,
    RouterGuard,
    ReadyCallback,
    FunctionCall,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::ComponentRender,
        ErrorKind::ComponentLifecycle,
        ErrorKind::TemplateRender,
        ErrorKind::RouterResolve,
        ErrorKind::RouterGuard,
        ErrorKind::ReadyCallback,
        ErrorKind::FunctionCall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ComponentRender => "component-render",
            ErrorKind::ComponentLifecycle => "component-lifecycle",
            ErrorKind::TemplateRender => "template-render",
            ErrorKind::RouterResolve => "router-resolve",
            ErrorKind::RouterGuard => "router-guard",
            ErrorKind::ReadyCallback => "ready-callback",
            ErrorKind::FunctionCall => "function-call",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown error kind '{}'", s))
    }
}

/// Fallback key used when a kind has no markup of its own
pub const DEFAULT_FALLBACK: &str = "default";

const DEFAULT_MARKUP: &str = r#"<div class="glint-error" role="alert">Component Rendering Error</div>"#;
const TEMPLATE_MARKUP: &str = r#"<div class="glint-error" role="alert">Template Rendering Error</div>"#;

/// Errors kept for inspection
const MAX_REPORTED: usize = 100;

/// One caught error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub message: String,
    pub element: Option<NodeId>,
}

type Handler = Rc<dyn Fn(&ReportedError)>;

struct BoundaryInner {
    fallbacks: RefCell<HashMap<String, String>>,
    handlers: RefCell<HashMap<ErrorKind, Handler>>,
    reported: RefCell<Vec<ReportedError>>,
    events: EventBus,
}

#[derive(Clone)]
pub struct ErrorBoundary {
    inner: Rc<BoundaryInner>,
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("fallbacks", &self.inner.fallbacks.borrow())
            .field("reported", &self.inner.reported.borrow().len())
            .finish()
    }
}

impl ErrorBoundary {
    pub fn new(events: EventBus) -> Self {
        let mut fallbacks = HashMap::new();
        fallbacks.insert(DEFAULT_FALLBACK.to_string(), DEFAULT_MARKUP.to_string());
        fallbacks.insert(
            ErrorKind::TemplateRender.as_str().to_string(),
            TEMPLATE_MARKUP.to_string(),
        );
        Self {
            inner: Rc::new(BoundaryInner {
                fallbacks: RefCell::new(fallbacks),
                handlers: RefCell::new(HashMap::new()),
                reported: RefCell::new(Vec::new()),
                events,
            }),
        }
    }

    /// Set the markup for an error kind name, or for `default`
    pub fn set_fallback(&self, kind: &str, markup: impl Into<String>) {
        self.inner
            .fallbacks
            .borrow_mut()
            .insert(kind.to_string(), markup.into());
    }

    /// Markup for `kind`, else the `default` markup
    pub fn fallback_for(&self, kind: ErrorKind) -> String {
        let fallbacks = self.inner.fallbacks.borrow();
        fallbacks
            .get(kind.as_str())
            .or_else(|| fallbacks.get(DEFAULT_FALLBACK))
            .cloned()
            .unwrap_or_else(|| DEFAULT_MARKUP.to_string())
    }

    pub fn default_fallback(&self) -> String {
        self.inner
            .fallbacks
            .borrow()
            .get(DEFAULT_FALLBACK)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MARKUP.to_string())
    }

    /// Run `handler` for every error of `kind`, replacing any earlier one
    pub fn register_handler<F>(&self, kind: ErrorKind, handler: F)
    where
        F: Fn(&ReportedError) + 'static,
    {
        self.inner
            .handlers
            .borrow_mut()
            .insert(kind, Rc::new(handler));
    }

    /// Record a caught error and return the markup to show in its place
    ///
    /// The handler for `kind` runs after logging. The `error` event is
    /// emitted whether or not a handler exists.
    pub fn handle(
        &self,
        error: &dyn fmt::Display,
        element: Option<NodeId>,
        kind: ErrorKind,
    ) -> String {
        let reported = ReportedError {
            kind,
            message: error.to_string(),
            element,
        };
        match element {
            Some(node) => tracing::error!(%kind, element = %node, "{}", reported.message),
            None => tracing::error!(%kind, "{}", reported.message),
        }

        {
            let mut log = self.inner.reported.borrow_mut();
            if log.len() == MAX_REPORTED {
                log.remove(0);
            }
            log.push(reported.clone());
        }

        let handler = self.inner.handlers.borrow().get(&kind).cloned();
        if let Some(handler) = handler {
            handler(&reported);
        }

        self.inner.events.emit(Event::Error {
            error: reported.message,
            kind,
            element,
        });

        self.fallback_for(kind)
    }

    /// Run a fallible closure, handling its error as `kind`
    pub fn guard<T, E, F>(&self, kind: ErrorKind, f: F) -> Option<T>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        match f() {
            Ok(value) => Some(value),
            Err(error) => {
                self.handle(&error, None, kind);
                None
            }
        }
    }

    /// Most recent errors, oldest first
    pub fn reported(&self) -> Vec<ReportedError> {
        self.inner.reported.borrow().clone()
    }
}
