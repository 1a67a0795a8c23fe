//! Steps of the one-time mount of a component instance

use crate::dom::{Document, DomError, NodeId};
use crate::markup::{escape_attr, lexer::parse_attributes, Attribute};
use crate::template::{bind_subtree, resolve_top_level, BindFailure, Lookup};

use super::registry::{Component, ComponentRegistry};

/// Upper bound on mounts in one pass; a component that renders itself would never finish
pub const MAX_MOUNTS_PER_PASS: usize = 1000;

/// A component instance found in the document, captured before rendering
#[derive(Debug, Clone)]
pub struct Instance {
    pub element: NodeId,
    pub component: Component,
    /// `name="value"` pairs separated by spaces
    pub attrs: String,
    pub inner: String,
}

/// Serialize attributes the way render functions receive them
pub fn serialize_attributes(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .map(|a| format!("{}=\"{}\"", a.name, escape_attr(&a.value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an `attrs` string back into pairs
pub fn attributes(attrs: &str) -> Vec<Attribute> {
    parse_attributes(attrs)
}

/// Look up one attribute in an `attrs` string
pub fn attribute(attrs: &str, name: &str) -> Option<String> {
    parse_attributes(attrs)
        .into_iter()
        .find(|a| a.name == name)
        .map(|a| a.value)
}

/// First registered, not yet mounted instance under `root` in document order
pub fn next_instance(
    doc: &Document,
    root: NodeId,
    registry: &ComponentRegistry,
) -> Option<Instance> {
    doc.descendants(root).into_iter().find_map(|id| {
        let component = registry.get(doc.tag_name(id)?)?;
        Some(Instance {
            element: id,
            component: component.clone(),
            attrs: serialize_attributes(doc.attributes(id)),
            inner: doc.inner_html(id),
        })
    })
}

/// Replace an instance with rendered markup, bound against `lookup`
///
/// The markup is bound while still detached so the recorded templates are
/// the raw render output. Returns binding failures inside the new subtree.
pub fn splice(
    doc: &mut Document,
    element: NodeId,
    rendered: &str,
    lookup: &impl Lookup,
) -> Result<Vec<BindFailure>, DomError> {
    if doc.parent(element).is_none() {
        return Err(DomError::Detached(element));
    }
    let fragment = doc.parse_fragment(rendered)?;
    let mut failures = bind_subtree(doc, fragment, lookup);
    failures.extend(resolve_top_level(doc, fragment, lookup));
    if let Err(error) = doc.replace_with_children(element, fragment) {
        doc.remove(fragment);
        return Err(error);
    }
    Ok(failures)
}
