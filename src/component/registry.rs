//! Component descriptors and the tag registry

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

/// Failure raised by a component's render function
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for RenderError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for RenderError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Render function receiving `(attrs, inner_markup)`
pub type RenderFn = Rc<dyn Fn(&str, &str) -> Result<String, RenderError>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Component has no tag name")]
    MissingTag,

    #[error("Component '{0}' has no render function")]
    MissingRender(String),

    #[error("Invalid component tag '{0}': tags are lowercase and contain a hyphen")]
    InvalidTag(String),
}

/// A tag given directly or computed when the component is registered
#[derive(Clone)]
pub enum TagSource {
    Literal(String),
    Computed(Rc<dyn Fn() -> String>),
}

impl fmt::Debug for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSource::Literal(tag) => f.debug_tuple("Literal").field(tag).finish(),
            TagSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Everything needed to register a component
#[derive(Clone, Default)]
pub struct ComponentDescriptor {
    tag: Option<TagSource>,
    render: Option<RenderFn>,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("tag", &self.tag)
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl ComponentDescriptor {
    pub fn new(tag: impl Into<String>) -> Self {
        Self::default().with_tag(tag)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(TagSource::Literal(tag.into()));
        self
    }

    /// Compute the tag once, at registration
    pub fn with_computed_tag<F>(mut self, tag: F) -> Self
    where
        F: Fn() -> String + 'static,
    {
        self.tag = Some(TagSource::Computed(Rc::new(tag)));
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, RenderError> + 'static,
    {
        self.render = Some(Rc::new(render));
        self
    }

    /// Render the same markup for every instance
    pub fn with_template(self, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        self.with_render(move |_, _| Ok(markup.clone()))
    }

    pub fn tag(&self) -> Option<String> {
        match &self.tag {
            Some(TagSource::Literal(tag)) => Some(tag.clone()),
            Some(TagSource::Computed(tag)) => Some(tag()),
            None => None,
        }
    }
}

/// Custom element naming: starts with a lowercase letter and contains a hyphen
pub fn is_valid_tag(tag: &str) -> bool {
    tag.contains('-')
        && tag.starts_with(|c: char| c.is_ascii_lowercase())
        && !tag.ends_with('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// A registered component
#[derive(Clone)]
pub struct Component {
    tag: String,
    render: RenderFn,
    mounts: Rc<Cell<usize>>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("tag", &self.tag)
            .field("mounts", &self.mounts.get())
            .finish()
    }
}

impl Component {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn render(&self, attrs: &str, inner: &str) -> Result<String, RenderError> {
        (self.render)(attrs, inner)
    }

    pub(crate) fn record_mount(&self) {
        self.mounts.set(self.mounts.get() + 1);
    }

    pub fn info(&self) -> ComponentInfo {
        ComponentInfo {
            tag: self.tag.clone(),
            mounts: self.mounts.get(),
        }
    }
}

/// Inspection view of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub tag: String,
    pub mounts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// The tag was already registered; the earlier component stays
    Ignored,
}

/// Tag to component mapping, first registration wins
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<Component>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<Registration, ComponentError> {
        let tag = descriptor.tag().ok_or(ComponentError::MissingTag)?;
        if tag.is_empty() {
            return Err(ComponentError::MissingTag);
        }
        let render = descriptor
            .render
            .ok_or_else(|| ComponentError::MissingRender(tag.clone()))?;
        if !is_valid_tag(&tag) {
            return Err(ComponentError::InvalidTag(tag));
        }

        if self.contains(&tag) {
            tracing::debug!(component = %tag, "component already registered, keeping the first");
            return Ok(Registration::Ignored);
        }

        tracing::debug!(component = %tag, "component registered");
        self.components.push(Component {
            tag,
            render,
            mounts: Rc::new(Cell::new(0)),
        });
        Ok(Registration::Added)
    }

    pub fn get(&self, tag: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.tag == tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Registered tags in registration order
    pub fn tags(&self) -> Vec<String> {
        self.components.iter().map(|c| c.tag.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_validation() {
        assert!(is_valid_tag("user-card"));
        assert!(is_valid_tag("x-1"));
        assert!(!is_valid_tag("card"));
        assert!(!is_valid_tag("User-card"));
        assert!(!is_valid_tag("1-card"));
        assert!(!is_valid_tag("user_card-x"));
        assert!(!is_valid_tag("card-"));
    }

    #[test]
    fn test_missing_parts_fail_fast() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(
            registry.register(ComponentDescriptor::default().with_template("x")),
            Err(ComponentError::MissingTag)
        );
        assert_eq!(
            registry.register(ComponentDescriptor::new("my-card")),
            Err(ComponentError::MissingRender("my-card".to_string()))
        );
        assert_eq!(
            registry.register(ComponentDescriptor::new("card").with_template("x")),
            Err(ComponentError::InvalidTag("card".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = ComponentRegistry::new();
        let first = ComponentDescriptor::new("my-card").with_template("first");
        let second = ComponentDescriptor::new("my-card").with_template("second");
        assert_eq!(registry.register(first), Ok(Registration::Added));
        assert_eq!(registry.register(second), Ok(Registration::Ignored));

        let card = registry.get("my-card").expect("registered");
        assert_eq!(card.render("", ""), Ok("first".to_string()));
        assert_eq!(registry.tags(), vec!["my-card"]);
    }

    #[test]
    fn test_computed_tag() {
        let mut registry = ComponentRegistry::new();
        let descriptor = ComponentDescriptor::default()
            .with_computed_tag(|| format!("{}-{}", "app", "shell"))
            .with_render(|attrs, inner| Ok(format!("<div {}>{}</div>", attrs, inner)));
        registry.register(descriptor).expect("Should register");
        let shell = registry.get("app-shell").expect("registered");
        assert_eq!(
            shell.render(r#"id="a""#, "x"),
            Ok(r#"<div id="a">x</div>"#.to_string())
        );
    }

    #[test]
    fn test_render_error() {
        let failing = ComponentDescriptor::new("bad-one").with_render(|_, _| Err("boom".into()));
        let mut registry = ComponentRegistry::new();
        registry.register(failing).expect("Should register");
        assert_eq!(
            registry.get("bad-one").map(|c| c.render("", "")),
            Some(Err(RenderError::new("boom")))
        );
    }
}
