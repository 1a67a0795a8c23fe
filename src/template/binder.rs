//! Per-element binding records and incremental refresh
//!
//! [`bind_subtree`] scans each element under a root once. Elements whose
//! inner markup contains placeholders get a [`BindingRecord`] stored in two
//! attributes, and their content is replaced with the resolved markup.
//! [`refresh`] later re-resolves exactly the elements whose record mentions a
//! changed key. Content injected by a refresh is never scanned again.
//!
//! An element that already holds bound descendants (the output of a mounted
//! component, say) records them as [`SLOT_TAG`] stand-ins. Rendering puts the
//! original descendants back in their slots, so their own records survive.
//!
//! Values are inserted as markup. When the result does not parse, the values
//! are escaped and inserted as text instead.

use crate::dom::{Document, DomError, NodeData, NodeId};

use super::placeholder::dependencies;
use super::resolver::{resolve, resolve_escaped, Lookup};

/// Comma-separated dependent keys
pub const BINDING_ATTR: &str = "data-glint-binding";
/// Raw inner markup before resolution
pub const TEMPLATE_ATTR: &str = "data-glint-template";

/// Attributes left out when scanning markup for placeholders
pub const METADATA_ATTRS: &[&str] = &[BINDING_ATTR, TEMPLATE_ATTR];
/// Stand-in for a nested bound element inside a recorded template
pub const SLOT_TAG: &str = "glint-slot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub keys: Vec<String>,
    pub template: String,
}

impl BindingRecord {
    /// Build a record for markup that references at least one key
    pub fn for_template(template: &str) -> Option<Self> {
        let keys = dependencies(template);
        (!keys.is_empty()).then(|| Self {
            keys,
            template: template.to_string(),
        })
    }

    pub fn read(doc: &Document, id: NodeId) -> Option<Self> {
        let keys = doc.attr(id, BINDING_ATTR)?;
        let template = doc.attr(id, TEMPLATE_ATTR)?;
        Some(Self {
            keys: keys
                .split(',')
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            template: template.to_string(),
        })
    }

    pub fn write(&self, doc: &mut Document, id: NodeId) {
        doc.set_attr(id, BINDING_ATTR, &self.keys.join(","));
        doc.set_attr(id, TEMPLATE_ATTR, &self.template);
    }

    pub fn depends_on(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Resolved markup that could not be parsed back into the document
#[derive(Debug, Clone, PartialEq)]
pub struct BindFailure {
    pub element: NodeId,
    pub markup: String,
    pub error: DomError,
}

/// Record and resolve every element under `root` whose markup has placeholders
///
/// Elements that already carry a record keep it, and their subtree is not
/// scanned. Nested placeholder elements end up covered by the outermost
/// bound ancestor.
pub fn bind_subtree(doc: &mut Document, root: NodeId, lookup: &impl Lookup) -> Vec<BindFailure> {
    let mut failures = Vec::new();

    for id in doc.descendants(root) {
        if !doc.contains(root, id) || inside_bound(doc, root, id) {
            continue;
        }

        let markup = doc.inner_html_masking(id, METADATA_ATTRS, BINDING_ATTR, SLOT_TAG);
        let Some(record) = BindingRecord::for_template(&markup) else {
            continue;
        };
        record.write(doc, id);

        if let Err(failure) = render(doc, id, &record.template, lookup) {
            failures.push(failure);
        }
    }

    failures
}

/// Replace the content of a bound element with its resolved template
///
/// Nested bound elements are moved into the slots of the new content in
/// document order. Leftover slots are dropped.
fn render(
    doc: &mut Document,
    id: NodeId,
    template: &str,
    lookup: &impl Lookup,
) -> Result<(), BindFailure> {
    let fragment = parse_resolved(doc, template, lookup).map_err(|(markup, error)| BindFailure {
        element: id,
        markup,
        error,
    })?;

    let kept = nested_bound(doc, id);
    let slots: Vec<NodeId> = doc
        .descendants(fragment)
        .into_iter()
        .filter(|slot| doc.tag_name(*slot) == Some(SLOT_TAG))
        .collect();
    let mut filled = Ok(());
    for (index, slot) in slots.into_iter().enumerate() {
        match kept.get(index) {
            Some(element) => filled = filled.and_then(|()| doc.replace_node(slot, *element)),
            None => doc.remove(slot),
        }
    }

    filled
        .and_then(|()| doc.replace_children(id, fragment))
        .map_err(|error| {
            doc.remove(fragment);
            BindFailure {
                element: id,
                markup: template.to_string(),
                error,
            }
        })
}

/// Resolve a template and parse it into a detached fragment
///
/// Falls back to escaped values when the raw substitution is not valid
/// markup. The error carries the raw substitution.
fn parse_resolved(
    doc: &mut Document,
    template: &str,
    lookup: &impl Lookup,
) -> Result<NodeId, (String, DomError)> {
    let resolved = resolve(template, lookup);
    let error = match doc.parse_fragment(&resolved) {
        Ok(fragment) => return Ok(fragment),
        Err(error) => error,
    };

    let escaped = resolve_escaped(template, lookup);
    if escaped != resolved {
        if let Ok(fragment) = doc.parse_fragment(&escaped) {
            tracing::debug!(template, "values inserted as text");
            return Ok(fragment);
        }
    }
    Err((resolved, error))
}

/// Outermost bound elements strictly inside `id`, in document order
fn nested_bound(doc: &Document, id: NodeId) -> Vec<NodeId> {
    doc.descendants(id)
        .into_iter()
        .filter(|element| doc.has_attr(*element, BINDING_ATTR))
        .filter(|element| {
            doc.parent(*element)
                .is_some_and(|parent| !inside_bound(doc, id, parent))
        })
        .collect()
}

/// True when `id` or an ancestor below `root` already carries a record
fn inside_bound(doc: &Document, root: NodeId, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        if node == root {
            return false;
        }
        if doc.has_attr(node, BINDING_ATTR) {
            return true;
        }
        current = doc.parent(node);
    }
    false
}

/// Resolve placeholders in the nodes directly under `root`
///
/// Text children and the attributes of element children have no element of
/// their own to hold a record, so they are resolved once and stay static.
pub fn resolve_top_level(
    doc: &mut Document,
    root: NodeId,
    lookup: &impl Lookup,
) -> Vec<BindFailure> {
    let mut failures = Vec::new();

    for id in doc.children(root).to_vec() {
        if doc.is_element(id) {
            let attrs: Vec<(String, String)> = doc
                .attributes(id)
                .iter()
                .filter(|a| !METADATA_ATTRS.contains(&a.name.as_str()))
                .filter(|a| !dependencies(&a.value).is_empty())
                .map(|a| (a.name.clone(), resolve(&a.value, lookup)))
                .collect();
            for (name, value) in attrs {
                doc.set_attr(id, &name, &value);
            }
            continue;
        }
        if !matches!(doc.node(id).map(|n| &n.data), Some(NodeData::Text(_))) {
            continue;
        }

        let markup = doc.outer_html(id);
        if dependencies(&markup).is_empty() {
            continue;
        }
        let spliced = parse_resolved(doc, &markup, lookup).and_then(|fragment| {
            doc.replace_with_children(id, fragment).map(drop).map_err(|error| {
                doc.remove(fragment);
                (markup.clone(), error)
            })
        });
        if let Err((markup, error)) = spliced {
            failures.push(BindFailure {
                element: root,
                markup,
                error,
            });
        }
    }

    failures
}

/// Connected elements whose record depends on `key`
pub fn bound_elements(doc: &Document, key: &str) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|id| {
            BindingRecord::read(doc, *id)
                .map(|record| record.depends_on(key))
                .unwrap_or(false)
        })
        .collect()
}

/// Outcome of one refresh pass
#[derive(Debug, Default)]
pub struct Refresh {
    pub updated: Vec<NodeId>,
    pub failures: Vec<BindFailure>,
}

/// Re-resolve every connected element bound to `key`; nothing else is touched
pub fn refresh(doc: &mut Document, key: &str, lookup: &impl Lookup) -> Refresh {
    let mut outcome = Refresh::default();

    for id in bound_elements(doc, key) {
        // A refresh of an outer element may have replaced this one
        if !doc.is_connected(id) {
            continue;
        }
        let Some(record) = BindingRecord::read(doc, id) else {
            continue;
        };
        match render(doc, id, &record.template, lookup) {
            Ok(()) => outcome.updated.push(id),
            Err(failure) => outcome.failures.push(failure),
        }
    }

    if !outcome.updated.is_empty() {
        tracing::debug!(key, elements = outcome.updated.len(), "bindings refreshed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use pretty_assertions::assert_eq;

    fn doc_with(markup: &str) -> Document {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, markup).expect("Should parse");
        doc
    }

    #[test]
    fn test_bind_leaves_missing_placeholder() {
        let store = Store::default();
        let mut doc = doc_with("<div>count={count}</div>");
        let body = doc.body();
        assert!(bind_subtree(&mut doc, body, &store).is_empty());

        let div = doc.children(body)[0];
        assert_eq!(doc.inner_html(div), "count={count}");
        assert_eq!(
            BindingRecord::read(&doc, div),
            Some(BindingRecord {
                keys: vec!["count".to_string()],
                template: "count={count}".to_string()
            })
        );

        store.set("count", 5);
        let outcome = refresh(&mut doc, "count", &store);
        assert_eq!(outcome.updated, vec![div]);
        assert_eq!(doc.inner_html(div), "count=5");
    }

    #[test]
    fn test_refresh_is_scoped_to_key() {
        let store = Store::default();
        store.set("x", 1);
        store.set("y", 2);
        let mut doc = doc_with("<p>{x}</p><p>{y}</p>");
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);
        let b = doc.children(body)[1];
        let b_child = doc.children(b)[0];

        store.set("x", 10);
        refresh(&mut doc, "x", &store);
        assert_eq!(doc.inner_html(body), r#"<p data-glint-binding="x" data-glint-template="{x}">10</p><p data-glint-binding="y" data-glint-template="{y}">2</p>"#);
        // B was not re-rendered at all
        assert_eq!(doc.children(b), &[b_child]);
    }

    #[test]
    fn test_outermost_element_holds_record() {
        let store = Store::default();
        store.set("name", "Bob");
        let mut doc = doc_with("<section><h1>Hello {name}</h1></section>");
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);

        let section = doc.children(body)[0];
        let record = BindingRecord::read(&doc, section).expect("section bound");
        assert_eq!(record.template, "<h1>Hello {name}</h1>");
        let h1 = doc.children(section)[0];
        assert_eq!(BindingRecord::read(&doc, h1), None);
        assert_eq!(doc.text_content(section), "Hello Bob");
    }

    #[test]
    fn test_existing_records_are_kept() {
        let store = Store::default();
        let mut doc = doc_with(
            r#"<div><p data-glint-binding="n" data-glint-template="n={n}">n=1</p></div>"#,
        );
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);

        let div = doc.children(body)[0];
        assert_eq!(BindingRecord::read(&doc, div), None);
        let p = doc.children(div)[0];
        assert_eq!(
            BindingRecord::read(&doc, p).map(|r| r.template),
            Some("n={n}".to_string())
        );
    }

    #[test]
    fn test_injected_placeholders_not_rescanned() {
        let store = Store::default();
        store.set("a", "{b}");
        let mut doc = doc_with("<span>{a}</span>");
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);
        assert!(bound_elements(&doc, "b").is_empty());

        store.set("b", "B");
        let outcome = refresh(&mut doc, "b", &store);
        assert!(outcome.updated.is_empty());
        let span = doc.children(body)[0];
        assert_eq!(doc.inner_html(span), "{b}");
    }

    #[test]
    fn test_disconnected_elements_skipped() {
        let store = Store::default();
        let mut doc = doc_with("<p>{k}</p>");
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);
        let p = doc.children(body)[0];
        doc.detach(p);

        store.set("k", 1);
        assert!(refresh(&mut doc, "k", &store).updated.is_empty());
    }

    #[test]
    fn test_unbalanced_value_inserted_as_text() {
        let store = Store::default();
        store.set("html", "<b>");
        store.set("note", "see </p> tag");
        let mut doc = doc_with("<p>{html}</p><div><p>{note}</p></div>");
        let body = doc.body();
        assert!(bind_subtree(&mut doc, body, &store).is_empty());

        let p = doc.children(body)[0];
        assert_eq!(doc.text_content(p), "<b>");
        let div = doc.children(body)[1];
        assert_eq!(doc.inner_html(div), "<p>see &lt;/p&gt; tag</p>");

        store.set("note", "<em>fine</em>");
        refresh(&mut doc, "note", &store);
        assert_eq!(doc.inner_html(div), "<p><em>fine</em></p>");
    }

    #[test]
    fn test_broken_template_reported() {
        let store = Store::default();
        let mut doc = doc_with("<p>x</p>");
        let body = doc.body();
        let p = doc.children(body)[0];
        BindingRecord::for_template("<i>{x}")
            .expect("has a key")
            .write(&mut doc, p);

        store.set("x", 1);
        let outcome = refresh(&mut doc, "x", &store);
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].markup, "<i>1");
        assert_eq!(doc.inner_html(p), "x");
    }

    #[test]
    fn test_nested_records_survive_outer_binding() {
        let store = Store::default();
        store.set("title", "T1");
        store.set("name", "N1");
        let mut doc = doc_with(
            r#"<div><p data-glint-binding="title" data-glint-template="{title}">T1</p> {name}</div>"#,
        );
        let body = doc.body();
        assert!(bind_subtree(&mut doc, body, &store).is_empty());

        let div = doc.children(body)[0];
        let p = doc.children(div)[0];
        assert_eq!(
            BindingRecord::read(&doc, div),
            Some(BindingRecord {
                keys: vec!["name".to_string()],
                template: "<glint-slot></glint-slot> {name}".to_string()
            })
        );
        assert_eq!(doc.text_content(div), "T1 N1");

        store.set("title", "T2");
        assert_eq!(refresh(&mut doc, "title", &store).updated, vec![p]);
        assert_eq!(doc.text_content(div), "T2 N1");

        store.set("name", "N2");
        assert_eq!(refresh(&mut doc, "name", &store).updated, vec![div]);
        assert_eq!(doc.children(div)[0], p);
        assert_eq!(doc.text_content(div), "T2 N2");
    }

    #[test]
    fn test_repeated_refresh_reuses_nodes() {
        let store = Store::default();
        let mut doc = doc_with("<p>{n}</p>");
        let body = doc.body();
        bind_subtree(&mut doc, body, &store);
        store.set("n", 0);
        refresh(&mut doc, "n", &store);
        let slots = doc.slot_count();

        for i in 1..2000 {
            store.set("n", i);
            refresh(&mut doc, "n", &store);
        }
        assert_eq!(doc.slot_count(), slots);
        assert_eq!(doc.text_content(body), "1999");
    }

    #[test]
    fn test_resolve_top_level() {
        let store = Store::default();
        store.set("u", "<em>Bob</em>");
        store.set("cls", "wide");
        let mut doc = doc_with(r#"Home-{u}<p class="{cls}">static</p>"#);
        let body = doc.body();
        assert!(resolve_top_level(&mut doc, body, &store).is_empty());
        assert_eq!(
            doc.inner_html(body),
            r#"Home-<em>Bob</em><p class="wide">static</p>"#
        );
    }
}
