//! Glint - a small reactive UI framework over an in-memory document
//!
//! This library provides a reactive store, markup templates with `{key}`
//! placeholders that refresh when their keys change, one-time mounted
//! components, and a router with asynchronous guards.
//!
//! # Example
//!
//! ```rust
//! use glint::App;
//!
//! let app = App::new();
//! app.render("<p>count={count}</p>").unwrap();
//! app.set("count", 5);
//! assert!(app.body_html().contains(">count=5</p>"));
//! ```

pub mod app;
pub mod boundary;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod markup;
pub mod router;
pub mod storage;
pub mod store;
pub mod template;

pub use app::{App, AppError, BoxError, DebugSnapshot};
pub use boundary::{ErrorBoundary, ErrorKind, ReportedError};
pub use component::{ComponentDescriptor, ComponentError, RenderError};
pub use config::{AppConfig, ConfigError, RouterConfig};
pub use dom::{Document, DomError, NodeId};
pub use error::MarkupError;
pub use events::{Event, EventBus};
pub use router::{Guard, GuardOutcome, MemoryHistory, Mode, Router, RouterError, RouterOptions};
pub use storage::{MemoryStorage, Saves, StorageBackend, StorageError};
pub use store::{ContextError, Store, Subscription, Value};

use thiserror::Error;

/// Any error the library reports to its caller
#[derive(Debug, Error)]
pub enum GlintError {
    #[error("markup errors: {}", format_markup_errors(.0))]
    Markup(Vec<MarkupError>),

    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl From<Vec<MarkupError>> for GlintError {
    fn from(errors: Vec<MarkupError>) -> Self {
        GlintError::Markup(errors)
    }
}

impl From<DomError> for GlintError {
    fn from(error: DomError) -> Self {
        match error {
            DomError::Markup(errors) => GlintError::Markup(errors),
            other => GlintError::App(AppError::Dom(other)),
        }
    }
}

fn format_markup_errors(errors: &[MarkupError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render a page template into a fresh app and return the body markup
///
/// # Example
///
/// ```rust
/// let html = glint::render_page("<h1>Hi</h1>", &[("name", "Bob".into())]).unwrap();
/// assert_eq!(html, "<h1>Hi</h1>");
/// ```
pub fn render_page(template: &str, state: &[(&str, Value)]) -> Result<String, GlintError> {
    let app = App::new();
    for (key, value) in state {
        app.set(*key, value.clone());
    }
    app.render(template).map_err(|e| match e {
        AppError::Dom(dom) => GlintError::from(dom),
        other => GlintError::App(other),
    })?;
    Ok(app.body_html())
}
