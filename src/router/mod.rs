//! Client-side router with asynchronous guards
//!
//! Every navigation, explicit or from history traversal, goes through
//! [`Router::resolve`]: the target path is read from the location, guards
//! run one after another, and only when all of them let it through is the
//! route committed and rendered into the container.
//!
//! Navigations are not serialized. When two resolutions overlap, each runs
//! its guard chain to completion and the one that commits last wins.

mod guard;
mod history;

pub use guard::{Guard, GuardError, GuardOutcome, GuardResult};
pub use history::{History, Location, MemoryHistory};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::App;
use crate::boundary::ErrorKind;
use crate::dom::NodeId;
use crate::events::Event;

/// Attribute marking elements whose clicks navigate through the router
pub const LINK_ATTR: &str = "data-router-link";

pub const DEFAULT_NOT_FOUND: &str = "<h1>404 - Page Not Found</h1>";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Container \"{0}\" not found")]
    ContainerNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Hash,
    History,
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub mode: Mode,
    /// Selector for the element routes render into
    pub container: String,
    pub not_found: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Hash,
            container: "#app".to_string(),
            not_found: DEFAULT_NOT_FOUND.to_string(),
        }
    }
}

impl RouterOptions {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_container(mut self, selector: impl Into<String>) -> Self {
        self.container = selector.into();
        self
    }

    pub fn with_not_found(mut self, template: impl Into<String>) -> Self {
        self.not_found = template.into();
        self
    }
}

struct RouterInner {
    app: App,
    history: Rc<dyn History>,
    mode: Mode,
    container: NodeId,
    routes: RefCell<HashMap<String, String>>,
    not_found: RefCell<String>,
    guards: RefCell<Vec<Guard>>,
    current_route: RefCell<Option<String>>,
}

#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("mode", &self.inner.mode)
            .field("container", &self.inner.container)
            .field("current_route", &self.inner.current_route.borrow())
            .finish()
    }
}

impl Router {
    /// Create a router rendering into the container named by `options`
    ///
    /// History mode is kept only when the platform supports push-state;
    /// otherwise the router uses hash mode for its whole lifetime.
    pub fn new(
        app: &App,
        history: impl History + 'static,
        options: RouterOptions,
    ) -> Result<Self, RouterError> {
        let container = app
            .select(&options.container)
            .ok_or_else(|| RouterError::ContainerNotFound(options.container.clone()))?;

        let mode = match options.mode {
            Mode::History if history.supports_push_state() => Mode::History,
            Mode::History => {
                tracing::debug!("push-state unavailable, falling back to hash mode");
                Mode::Hash
            }
            Mode::Hash => Mode::Hash,
        };

        Ok(Self {
            inner: Rc::new(RouterInner {
                app: app.clone(),
                history: Rc::new(history),
                mode,
                container,
                routes: RefCell::new(HashMap::new()),
                not_found: RefCell::new(options.not_found),
                guards: RefCell::new(Vec::new()),
                current_route: RefCell::new(None),
            }),
        })
    }

    pub fn add(&self, path: impl Into<String>, template: impl Into<String>) -> &Self {
        self.inner
            .routes
            .borrow_mut()
            .insert(path.into(), template.into());
        self
    }

    pub fn set_not_found(&self, template: impl Into<String>) -> &Self {
        *self.inner.not_found.borrow_mut() = template.into();
        self
    }

    /// Append a guard; guards run in the order they were added
    pub fn add_guard(&self, guard: Guard) -> &Self {
        self.inner.guards.borrow_mut().push(guard);
        self
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn container(&self) -> NodeId {
        self.inner.container
    }

    pub fn current_route(&self) -> Option<String> {
        self.inner.current_route.borrow().clone()
    }

    /// Registered paths, sorted
    pub fn routes(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.routes.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// The path the location currently points at
    pub fn path(&self) -> String {
        match self.inner.mode {
            Mode::History => self.inner.history.pathname(),
            Mode::Hash => {
                let hash = self.inner.history.hash();
                if hash.is_empty() {
                    "/".to_string()
                } else {
                    hash
                }
            }
        }
    }

    /// Resolve the initial location
    pub fn start(&self) -> LocalBoxFuture<'static, ()> {
        tracing::info!(mode = ?self.inner.mode, "router started");
        self.resolve()
    }

    /// Update the location, then resolve it
    pub fn navigate(&self, path: &str) -> LocalBoxFuture<'static, ()> {
        match self.inner.mode {
            Mode::History => self.inner.history.push_state(path),
            Mode::Hash => self.inner.history.set_hash(path),
        }
        tracing::info!(path, "navigate");
        self.resolve()
    }

    /// Back/forward traversal already moved the location; resolve it
    pub fn popstate(&self) -> LocalBoxFuture<'static, ()> {
        self.resolve()
    }

    /// Run the guard chain for the current location and commit if it passes
    ///
    /// The target and source paths are captured when this is called, not
    /// when the returned future first runs.
    pub fn resolve(&self) -> LocalBoxFuture<'static, ()> {
        let router = self.clone();
        let to = self.path();
        let from = self.current_route();

        async move {
            let guards = router.inner.guards.borrow().clone();
            for guard in guards {
                match guard.check(from.clone(), to.clone()).await {
                    Ok(GuardOutcome::Continue) => {}
                    Ok(GuardOutcome::Abort) => {
                        tracing::debug!(path = %to, "navigation aborted by guard");
                        return;
                    }
                    Ok(GuardOutcome::Redirect(target)) => {
                        tracing::debug!(path = %to, redirect = %target, "navigation redirected by guard");
                        router.navigate(&target).await;
                        return;
                    }
                    Err(error) => {
                        router
                            .inner
                            .app
                            .boundary()
                            .handle(&error, None, ErrorKind::RouterGuard);
                        return;
                    }
                }
            }
            router.commit(&to);
        }
        .boxed_local()
    }

    /// Render the current route again without running guards
    pub fn refresh(&self) {
        if let Some(path) = self.current_route() {
            self.commit(&path);
        }
    }

    /// Handle a click on `target`
    ///
    /// When `target` or an ancestor carries [`LINK_ATTR`] and an `href`, the
    /// default action is suppressed and the navigation future is returned.
    pub fn intercept_click(&self, target: NodeId) -> Option<LocalBoxFuture<'static, ()>> {
        let href = self.inner.app.with_document(|doc| {
            let selector = format!("[{}]", LINK_ATTR);
            let link = doc.closest(target, &selector)?;
            doc.attr(link, "href").map(str::to_string)
        })?;
        Some(self.navigate(&href))
    }

    fn commit(&self, path: &str) {
        let inner = &self.inner;
        *inner.current_route.borrow_mut() = Some(path.to_string());

        let template = inner
            .routes
            .borrow()
            .get(path)
            .cloned()
            .unwrap_or_else(|| inner.not_found.borrow().clone());

        let started = Instant::now();
        let resolved = inner.app.resolve_template(&template);
        if let Err(error) = inner.app.inject(inner.container, &template) {
            let boundary = inner.app.boundary();
            boundary.handle(&error, Some(inner.container), ErrorKind::RouterResolve);
            let fallback = boundary.default_fallback();
            inner.app.with_document_mut(|doc| {
                if doc.set_inner_html(inner.container, &fallback).is_err() {
                    doc.set_text_content(inner.container, &fallback);
                }
            });
            return;
        }

        tracing::debug!(
            route = path,
            elapsed_us = started.elapsed().as_micros() as u64,
            "route rendered"
        );
        inner.app.events().emit(Event::RouteChanged {
            path: path.to_string(),
            template: resolved,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    fn app_with_container() -> App {
        let app = App::new();
        app.render(r#"<main id="app"></main>"#).expect("Should render");
        app
    }

    fn container_html(router: &Router) -> String {
        router
            .inner
            .app
            .with_document(|doc| doc.inner_html(router.container()))
    }

    #[test]
    fn test_missing_container_fails() {
        let app = App::new();
        let err = Router::new(&app, MemoryHistory::new(), RouterOptions::default()).unwrap_err();
        assert_eq!(err, RouterError::ContainerNotFound("#app".to_string()));
    }

    #[test]
    fn test_history_mode_falls_back_to_hash() {
        let app = app_with_container();
        let options = RouterOptions::default().with_mode(Mode::History);
        let router = Router::new(&app, MemoryHistory::new().without_push_state(), options.clone())
            .expect("Should create");
        assert_eq!(router.mode(), Mode::Hash);

        let router = Router::new(&app, MemoryHistory::new(), options).expect("Should create");
        assert_eq!(router.mode(), Mode::History);
    }

    #[test]
    fn test_hash_path_defaults_to_root() {
        let app = app_with_container();
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        assert_eq!(router.path(), "/");
    }

    #[test]
    fn test_navigate_renders_route() {
        let app = app_with_container();
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        router.add("/", "<p>Home</p>").add("/about", "<p>About</p>");

        block_on(router.start());
        assert_eq!(router.current_route(), Some("/".to_string()));
        assert_eq!(container_html(&router), "<p>Home</p>");

        block_on(router.navigate("/about"));
        assert_eq!(router.current_route(), Some("/about".to_string()));
        assert_eq!(container_html(&router), "<p>About</p>");
    }

    #[test]
    fn test_not_found() {
        let app = app_with_container();
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        block_on(router.navigate("/missing"));
        assert_eq!(container_html(&router), DEFAULT_NOT_FOUND);

        router.set_not_found("<p>gone</p>");
        router.refresh();
        assert_eq!(container_html(&router), "<p>gone</p>");
    }

    #[test]
    fn test_guard_error_aborts() {
        let app = app_with_container();
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        router.add("/", "Home");
        router.add_guard(Guard::fallible(|_, _| Err("no session".into())));

        block_on(router.start());
        assert_eq!(router.current_route(), None);
        assert_eq!(container_html(&router), "");
        let reported = app.boundary().reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].kind, ErrorKind::RouterGuard);
    }

    #[test]
    fn test_invalid_route_markup_uses_fallback() {
        let app = app_with_container();
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        router.add("/", "<div>");

        block_on(router.start());
        assert_eq!(router.current_route(), Some("/".to_string()));
        assert_eq!(container_html(&router), app.boundary().default_fallback());
        assert_eq!(app.boundary().reported()[0].kind, ErrorKind::RouterResolve);
    }

    #[test]
    fn test_intercept_click() {
        let app = App::new();
        app.render(r#"<nav><a href="/about" data-router-link><b>About</b></a><a href="/x">plain</a></nav><main id="app"></main>"#)
            .expect("Should render");
        let router =
            Router::new(&app, MemoryHistory::new(), RouterOptions::default()).expect("Should create");
        router.add("/about", "About page");

        let (bold, plain) = app.with_document(|doc| {
            (
                doc.query_selector(doc.body(), "b").expect("b exists"),
                doc.query_selector_all(doc.body(), "a")[1],
            )
        });
        assert!(router.intercept_click(plain).is_none());
        let navigation = router.intercept_click(bold).expect("link intercepted");
        block_on(navigation);
        assert_eq!(router.current_route(), Some("/about".to_string()));
        assert_eq!(container_html(&router), "About page");
    }
}
