//! In-memory document tree
//!
//! The page is an arena of nodes addressed by [`NodeId`]. Markup is parsed
//! into the arena with [`Document::set_inner_html`] and friends, and read
//! back with [`Document::inner_html`] / [`Document::outer_html`].
//!
//! Nodes dropped by a content replacement are released and their slots
//! reused, so repeated refreshes do not grow the arena.

mod selector;

pub use selector::Selector;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error::MarkupError;
use crate::markup::{self, escape_attr, escape_text, is_void, Attribute, MarkupNode};

/// Handle to a node in a [`Document`]
///
/// A handle to a released node stays stale even after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    /// Detached container used to stage parsed markup before splicing
    Fragment,
    Element {
        name: String,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Invalid markup: {}", format_markup_errors(.0))]
    Markup(Vec<MarkupError>),

    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Node {0} is not attached to a parent")]
    Detached(NodeId),
}

fn format_markup_errors(errors: &[MarkupError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What to leave out while writing markup
#[derive(Debug, Clone, Copy)]
struct Serialization<'a> {
    excluded: &'a [&'a str],
    /// Elements with this attribute are written as an empty element of this tag
    mask: Option<(&'a str, &'a str)>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing an empty `body`
    pub fn new() -> Self {
        let first = NodeId {
            index: 0,
            generation: 0,
        };
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: first,
            body: first,
        };
        doc.root = doc.push(NodeData::Document);
        doc.body = doc.create_element("body");
        doc.append_child(doc.root, doc.body);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Nodes currently allocated, attached or not
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Arena size, free slots included
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
        };
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.node = Some(node);
                return NodeId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let id = NodeId {
            index: self.slots.len() as u32,
            generation: 0,
        };
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        id
    }

    /// Free a node and its subtree; the caller has already unlinked it
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(id.index())
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            stack.extend(node.children);
        }
    }

    /// Detach a node and free it with its subtree
    ///
    /// Handles into the removed subtree stop resolving. The root is never removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        self.release(id);
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::Fragment)
    }

    /// Append `child` to `parent`, detaching it from any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Remove a node from its parent; the node and its subtree stay allocated
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Tag name of an element, `None` for other node kinds
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.data) {
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(existing) => existing.value = value.to_string(),
                None => attrs.push(Attribute::new(name, value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let Some(NodeData::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.data) else {
            return None;
        };
        let pos = attrs.iter().position(|a| a.name == name)?;
        Some(attrs.remove(pos).value)
    }

    /// Element descendants of `root` in document order, `root` excluded
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// True when `id` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// True when the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Comment(_)) | None => {}
            Some(_) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        self.inner_html_excluding(id, &[])
    }

    /// Serialize the children of `id`, leaving out the named attributes everywhere
    pub fn inner_html_excluding(&self, id: NodeId, excluded: &[&str]) -> String {
        self.serialize_children(
            id,
            Serialization {
                excluded,
                mask: None,
            },
        )
    }

    /// Like [`Document::inner_html_excluding`], but every descendant element
    /// carrying `mask_attr` is written as an empty `<mask_tag>` element
    pub fn inner_html_masking(
        &self,
        id: NodeId,
        excluded: &[&str],
        mask_attr: &str,
        mask_tag: &str,
    ) -> String {
        self.serialize_children(
            id,
            Serialization {
                excluded,
                mask: Some((mask_attr, mask_tag)),
            },
        )
    }

    fn serialize_children(&self, id: NodeId, options: Serialization<'_>) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, options, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(
            id,
            Serialization {
                excluded: &[],
                mask: None,
            },
            &mut out,
        );
        out
    }

    fn write_node(&self, id: NodeId, options: Serialization<'_>, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Element { name, attrs } => {
                if let Some((mask_attr, mask_tag)) = options.mask {
                    if attrs.iter().any(|a| a.name == mask_attr) {
                        out.push('<');
                        out.push_str(mask_tag);
                        out.push_str("></");
                        out.push_str(mask_tag);
                        out.push('>');
                        return;
                    }
                }
                out.push('<');
                out.push_str(name);
                for attr in attrs
                    .iter()
                    .filter(|a| !options.excluded.contains(&a.name.as_str()))
                {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
                out.push('>');
                if is_void(name) {
                    return;
                }
                for child in &node.children {
                    self.write_node(*child, options, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Document | NodeData::Fragment => {
                for child in &node.children {
                    self.write_node(*child, options, out);
                }
            }
        }
    }

    /// Replace the children of `id` with parsed markup
    ///
    /// On a parse error the node is left untouched.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<(), DomError> {
        if self.node(id).is_none() {
            return Err(DomError::UnknownNode(id));
        }
        let nodes = markup::parse_fragment(markup).map_err(DomError::Markup)?;
        self.clear_children(id);
        self.materialize(id, nodes);
        Ok(())
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if self.node(id).is_none() {
            return;
        }
        self.clear_children(id);
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    /// Unlink and free every child of `id`
    fn clear_children(&mut self, id: NodeId) {
        let old = self
            .node_mut(id)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in old {
            self.release(child);
        }
    }

    /// Move the children of `fragment` into `id`, freeing the previous children
    /// and the emptied fragment
    pub fn replace_children(&mut self, id: NodeId, fragment: NodeId) -> Result<(), DomError> {
        if self.node(id).is_none() {
            return Err(DomError::UnknownNode(id));
        }
        let moved = self
            .node_mut(fragment)
            .map(|n| std::mem::take(&mut n.children))
            .ok_or(DomError::UnknownNode(fragment))?;
        self.clear_children(id);
        for child in &moved {
            if let Some(node) = self.node_mut(*child) {
                node.parent = Some(id);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.children = moved;
        }
        self.release(fragment);
        Ok(())
    }

    /// Parse markup into a new detached fragment
    pub fn parse_fragment(&mut self, markup: &str) -> Result<NodeId, DomError> {
        let nodes = markup::parse_fragment(markup).map_err(DomError::Markup)?;
        let fragment = self.create_fragment();
        self.materialize(fragment, nodes);
        Ok(fragment)
    }

    fn materialize(&mut self, parent: NodeId, nodes: Vec<MarkupNode>) {
        for node in nodes {
            let id = match node {
                MarkupNode::Element(element) => {
                    let id = self.push(NodeData::Element {
                        name: element.name,
                        attrs: element.attrs,
                    });
                    self.materialize(id, element.children);
                    id
                }
                MarkupNode::Text(text) => self.push(NodeData::Text(text)),
                MarkupNode::Comment(text) => self.push(NodeData::Comment(text)),
            };
            self.append_child(parent, id);
        }
    }

    /// Replace `id` in its parent with parsed markup (outer HTML assignment)
    pub fn replace_with_html(&mut self, id: NodeId, markup: &str) -> Result<Vec<NodeId>, DomError> {
        if self.parent(id).is_none() {
            return Err(DomError::Detached(id));
        }
        let fragment = self.parse_fragment(markup)?;
        self.replace_with_children(id, fragment)
    }

    /// Splice the children of `fragment` into the place of `target`
    ///
    /// Returns the inserted nodes. `target` and the emptied fragment are freed.
    pub fn replace_with_children(
        &mut self,
        target: NodeId,
        fragment: NodeId,
    ) -> Result<Vec<NodeId>, DomError> {
        if self.node(fragment).is_none() {
            return Err(DomError::UnknownNode(fragment));
        }
        let parent = self.parent(target).ok_or(DomError::Detached(target))?;
        let position = self
            .children(parent)
            .iter()
            .position(|c| *c == target)
            .ok_or(DomError::Detached(target))?;

        let inserted = self
            .node_mut(fragment)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in &inserted {
            if let Some(node) = self.node_mut(*child) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.node_mut(parent) {
            node.children
                .splice(position..=position, inserted.iter().copied());
        }
        self.release(target);
        self.release(fragment);
        Ok(inserted)
    }

    /// Put `replacement` in the place of `target`, which is freed
    ///
    /// `replacement` is detached from its previous parent first.
    pub fn replace_node(&mut self, target: NodeId, replacement: NodeId) -> Result<(), DomError> {
        if self.node(replacement).is_none() {
            return Err(DomError::UnknownNode(replacement));
        }
        let parent = self.parent(target).ok_or(DomError::Detached(target))?;
        self.detach(replacement);
        let slot = self
            .node_mut(parent)
            .and_then(|n| n.children.iter_mut().find(|c| **c == target))
            .ok_or(DomError::Detached(target))?;
        *slot = replacement;
        if let Some(node) = self.node_mut(replacement) {
            node.parent = Some(parent);
        }
        self.release(target);
        Ok(())
    }

    /// First element under `root` (exclusive) matching `selector`
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        self.descendants(root)
            .into_iter()
            .find(|id| selector.matches(self, *id))
    }

    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, id: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        let mut current = Some(id);
        while let Some(node) = current {
            if selector.matches(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Locate an element anywhere in the document, `body` itself included
    pub fn select(&self, selector: &str) -> Option<NodeId> {
        match Selector::parse(selector) {
            Some(parsed) if parsed.matches(self, self.body) => Some(self.body),
            _ => self.query_selector(self.body, selector),
        }
    }
}
