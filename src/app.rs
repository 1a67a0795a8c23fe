//! The application service shared by every part of a page
//!
//! An [`App`] owns the document, the primary store, the context registry,
//! the component registry, the error boundary, the event bus and the
//! persistence adapter. Clones are cheap handles to the same app.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::boundary::{ErrorBoundary, ErrorKind};
use crate::component::{
    mount, ComponentDescriptor, ComponentError, ComponentInfo, ComponentRegistry, Registration,
    MAX_MOUNTS_PER_PASS,
};
use crate::dom::{Document, DomError, NodeId};
use crate::events::{Event, EventBus};
use crate::markup::escape_text;
use crate::storage::Saves;
use crate::store::{Change, ContextError, ContextRegistry, Scope, Store, Subscription};
use crate::template::{self, BindFailure, StateScope};

/// Error type returned by user callbacks
pub type BoxError = Box<dyn std::error::Error>;

/// A function callable by name through [`App::call`]
pub type ExposedFn = Rc<dyn Fn(&[Value]) -> Result<Value, BoxError>>;

type ReadyCallback = Box<dyn FnOnce() -> Result<(), BoxError>>;

pub const DEFAULT_TITLE: &str = "Glint App";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Target element \"{0}\" not found")]
    TargetNotFound(String),

    #[error("Function '{0}' is not exposed")]
    UnknownFunction(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

#[derive(Error, Debug)]
#[error("Mount limit of {0} reached; a component may be rendering itself")]
struct MountLimit(usize);

/// Serializable view of an app for inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub title: String,
    pub state: BTreeMap<String, Value>,
    pub components: Vec<String>,
    pub contexts: Vec<String>,
    pub errors: usize,
}

struct AppInner {
    document: RefCell<Document>,
    state: Store,
    contexts: ContextRegistry,
    components: RefCell<ComponentRegistry>,
    events: EventBus,
    boundary: ErrorBoundary,
    saves: Saves,
    functions: RefCell<HashMap<String, ExposedFn>>,
    title: RefCell<String>,
    ready: Cell<bool>,
    ready_callbacks: RefCell<Vec<ReadyCallback>>,
}

#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("title", &self.inner.title.borrow())
            .field("state", &self.inner.state)
            .field("contexts", &self.inner.contexts)
            .finish()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_saves(Saves::default())
    }

    /// Create an app persisting through `saves`
    pub fn with_saves(saves: Saves) -> Self {
        let events = EventBus::new();
        let boundary = ErrorBoundary::new(events.clone());
        let app = Self {
            inner: Rc::new(AppInner {
                document: RefCell::new(Document::new()),
                state: Store::new(Scope::Primary),
                contexts: ContextRegistry::new(),
                components: RefCell::new(ComponentRegistry::new()),
                events,
                boundary,
                saves,
                functions: RefCell::new(HashMap::new()),
                title: RefCell::new(DEFAULT_TITLE.to_string()),
                ready: Cell::new(false),
                ready_callbacks: RefCell::new(Vec::new()),
            }),
        };

        app.wire_store(&app.inner.state);
        let weak = app.downgrade();
        app.inner.contexts.on_create(move |store| {
            if let Some(app) = App::upgrade(&weak) {
                app.wire_store(store);
            }
        });
        app
    }

    fn downgrade(&self) -> Weak<AppInner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<AppInner>) -> Option<App> {
        weak.upgrade().map(|inner| App { inner })
    }

    /// Change event first, then the binding refresh for the changed key
    fn wire_store(&self, store: &Store) {
        let events = self.inner.events.clone();
        store.on_change(move |change| events.emit(change_event(change)));

        let weak = self.downgrade();
        store.on_change(move |change| {
            if let Some(app) = App::upgrade(&weak) {
                app.refresh_bindings(&change.binding_key());
            }
        });
    }

    // State

    pub fn state(&self) -> &Store {
        &self.inner.state
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.inner.state.set(key, value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.get(key)
    }

    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>) + 'static,
    {
        self.inner.state.subscribe(key, callback)
    }

    /// Named context store, created on first use
    pub fn context(&self, name: &str) -> Result<Store, ContextError> {
        self.inner.contexts.context(name)
    }

    /// Named context store that must already exist
    pub fn find_context(&self, name: &str) -> Result<Store, ContextError> {
        self.inner.contexts.get(name)
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.inner.contexts
    }

    fn scope(&self) -> StateScope<'_> {
        StateScope::new(&self.inner.state, &self.inner.contexts)
    }

    /// Resolve placeholders against the state and every context
    pub fn resolve_template(&self, template: &str) -> String {
        template::resolve(template, &self.scope())
    }

    // Collaborators

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.inner.boundary
    }

    pub fn saves(&self) -> &Saves {
        &self.inner.saves
    }

    // Document

    /// Read the document
    ///
    /// The document stays borrowed while `f` runs, so `f` must not set
    /// state or render.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.document.borrow())
    }

    /// Mutate the document directly; the same restriction as [`App::with_document`] applies
    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.document.borrow_mut())
    }

    /// Markup currently inside `body`
    pub fn body_html(&self) -> String {
        self.with_document(|doc| doc.inner_html(doc.body()))
    }

    pub fn select(&self, selector: &str) -> Option<NodeId> {
        self.with_document(|doc| doc.select(selector))
    }

    /// Render a template into `body`
    pub fn render(&self, template: &str) -> Result<&Self, AppError> {
        self.render_to(template, "body")
    }

    /// Render a template into the first element matching `selector`
    pub fn render_to(&self, template: &str, selector: &str) -> Result<&Self, AppError> {
        let target = self
            .select(selector)
            .ok_or_else(|| AppError::TargetNotFound(selector.to_string()))?;
        self.inject(target, template)?;
        Ok(self)
    }

    /// Replace the content of `target` with a template: mount, bind, resolve
    pub(crate) fn inject(&self, target: NodeId, template: &str) -> Result<(), DomError> {
        self.with_document_mut(|doc| doc.set_inner_html(target, template))?;
        self.mount_components(target);

        let failures = self.with_document_mut(|doc| {
            let scope = self.scope();
            let mut failures = template::bind_subtree(doc, target, &scope);
            failures.extend(template::resolve_top_level(doc, target, &scope));
            failures
        });
        self.report_bind_failures(failures);
        Ok(())
    }

    /// Re-resolve every element bound to `key` and mount what the refresh exposed
    pub fn refresh_bindings(&self, key: &str) {
        let outcome = self.with_document_mut(|doc| template::refresh(doc, key, &self.scope()));
        self.report_bind_failures(outcome.failures);
        for element in outcome.updated {
            self.mount_components(element);
        }
    }

    fn report_bind_failures(&self, failures: Vec<BindFailure>) {
        for failure in failures {
            let fallback =
                self.inner
                    .boundary
                    .handle(&failure.error, Some(failure.element), ErrorKind::TemplateRender);
            self.with_document_mut(|doc| {
                if doc.set_inner_html(failure.element, &fallback).is_err() {
                    doc.set_text_content(failure.element, &fallback);
                }
            });
        }
    }

    // Components

    /// Register a component and mount instances already in the document
    pub fn register_component(
        &self,
        descriptor: ComponentDescriptor,
    ) -> Result<Registration, ComponentError> {
        let registration = self.inner.components.borrow_mut().register(descriptor)?;
        if registration == Registration::Added {
            let root = self.with_document(|doc| doc.root());
            self.mount_components(root);
        }
        Ok(registration)
    }

    pub fn component_tags(&self) -> Vec<String> {
        self.inner.components.borrow().tags()
    }

    pub fn inspect(&self, tag: &str) -> Option<ComponentInfo> {
        self.inner.components.borrow().get(tag).map(|c| c.info())
    }

    /// Mount every registered instance under `root`, including ones produced by mounting
    pub fn mount_components(&self, root: NodeId) {
        let mut mounted = 0;
        loop {
            let instance = {
                let doc = self.inner.document.borrow();
                let registry = self.inner.components.borrow();
                mount::next_instance(&doc, root, &registry)
            };
            let Some(instance) = instance else {
                break;
            };

            if mounted == MAX_MOUNTS_PER_PASS {
                let fallback = self.inner.boundary.handle(
                    &MountLimit(MAX_MOUNTS_PER_PASS),
                    Some(instance.element),
                    ErrorKind::ComponentLifecycle,
                );
                self.replace_with_fallback(instance.element, &fallback);
                break;
            }
            mounted += 1;
            self.mount_instance(instance);
        }
    }

    fn mount_instance(&self, instance: mount::Instance) {
        let started = Instant::now();
        let tag = instance.component.tag().to_string();

        // Attribute values are data for the render function, so they arrive resolved
        let attrs = self.resolve_template(&instance.attrs);
        let rendered = match instance.component.render(&attrs, &instance.inner) {
            Ok(markup) => markup,
            Err(error) => self.inner.boundary.handle(
                &error,
                Some(instance.element),
                ErrorKind::ComponentRender,
            ),
        };

        let spliced = self.with_document_mut(|doc| {
            mount::splice(doc, instance.element, &rendered, &self.scope())
        });
        match spliced {
            Ok(failures) => {
                instance.component.record_mount();
                self.report_bind_failures(failures);
                tracing::debug!(
                    component = %tag,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "component rendered"
                );
            }
            Err(error) => {
                let fallback = self.inner.boundary.handle(
                    &error,
                    Some(instance.element),
                    ErrorKind::ComponentLifecycle,
                );
                self.replace_with_fallback(instance.element, &fallback);
            }
        }
    }

    fn replace_with_fallback(&self, element: NodeId, fallback: &str) {
        self.with_document_mut(|doc| {
            if doc.parent(element).is_none() {
                return;
            }
            if doc.replace_with_html(element, fallback).is_err() {
                // Escaped text always parses
                let _ = doc.replace_with_html(element, &escape_text(fallback));
            }
        });
    }

    // Title and lifecycle

    pub fn set_title(&self, title: impl Into<String>) -> &Self {
        *self.inner.title.borrow_mut() = title.into();
        self
    }

    pub fn title(&self) -> String {
        self.inner.title.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    /// Run `callback` once the app is ready, or now if it already is
    pub fn on_ready<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() -> Result<(), BoxError> + 'static,
    {
        if self.is_ready() {
            self.run_ready(Box::new(callback));
        } else {
            self.inner.ready_callbacks.borrow_mut().push(Box::new(callback));
        }
        self
    }

    /// Mark the app ready and run queued callbacks in order
    pub fn ready(&self) {
        if self.inner.ready.replace(true) {
            return;
        }
        tracing::info!(title = %self.title(), "app ready");
        let callbacks = std::mem::take(&mut *self.inner.ready_callbacks.borrow_mut());
        for callback in callbacks {
            self.run_ready(callback);
        }
    }

    fn run_ready(&self, callback: ReadyCallback) {
        self.inner.boundary.guard(ErrorKind::ReadyCallback, callback);
    }

    // Exposed functions

    pub fn expose<F>(&self, name: impl Into<String>, function: F) -> &Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + 'static,
    {
        self.inner
            .functions
            .borrow_mut()
            .insert(name.into(), Rc::new(function));
        self
    }

    /// Call an exposed function
    ///
    /// `Ok(None)` means the function failed and the error went to the boundary.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, AppError> {
        let function = self
            .inner
            .functions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownFunction(name.to_string()))?;
        Ok(self
            .inner
            .boundary
            .guard(ErrorKind::FunctionCall, || function(args)))
    }

    pub fn exposed(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.functions.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    // Inspection

    pub fn debug(&self) -> DebugSnapshot {
        DebugSnapshot {
            title: self.title(),
            state: self.inner.state.snapshot(),
            components: self.component_tags(),
            contexts: self.inner.contexts.names(),
            errors: self.inner.boundary.reported().len(),
        }
    }
}

fn change_event(change: &Change) -> Event {
    match &change.scope {
        Scope::Primary => Event::StateChange {
            key: change.key.clone(),
            new_value: change.new_value.clone(),
            old_value: change.old_value.clone(),
        },
        Scope::Context(name) => Event::ContextChange {
            context_name: name.clone(),
            key: change.key.clone(),
            new_value: change.new_value.clone(),
            old_value: change.old_value.clone(),
        },
    }
}
