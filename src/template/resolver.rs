//! Placeholder resolution against stores

use std::collections::HashMap;

use serde_json::Value;

use super::placeholder::{segments, Placeholder, Segment};
use crate::markup::escape_text;
use crate::store::value::display;
use crate::store::{ContextRegistry, Scope, Store};

/// Source of placeholder values
pub trait Lookup {
    fn lookup(&self, placeholder: &Placeholder) -> Option<Value>;
}

/// A single store answers the placeholders addressed to it
impl Lookup for Store {
    fn lookup(&self, placeholder: &Placeholder) -> Option<Value> {
        match (placeholder, self.scope()) {
            (Placeholder::Key(key), Scope::Primary) => self.get(key),
            (Placeholder::Scoped { namespace, key }, Scope::Context(name)) if namespace == name => {
                self.get(key)
            }
            _ => None,
        }
    }
}

/// Fixed values, keyed by binding key (`key` or `ns.key`)
impl Lookup for HashMap<String, Value> {
    fn lookup(&self, placeholder: &Placeholder) -> Option<Value> {
        self.get(&placeholder.binding_key()).cloned()
    }
}

/// The primary store together with every registered context
#[derive(Debug, Clone, Copy)]
pub struct StateScope<'a> {
    pub state: &'a Store,
    pub contexts: &'a ContextRegistry,
}

impl<'a> StateScope<'a> {
    pub fn new(state: &'a Store, contexts: &'a ContextRegistry) -> Self {
        Self { state, contexts }
    }
}

impl Lookup for StateScope<'_> {
    fn lookup(&self, placeholder: &Placeholder) -> Option<Value> {
        match placeholder {
            Placeholder::Key(key) => self.state.get(key),
            Placeholder::Scoped { namespace, key } => self.contexts.find(namespace)?.get(key),
        }
    }
}

/// Replace every placeholder that has a value; leave the rest verbatim
///
/// Values are inserted as markup.
pub fn resolve(template: &str, lookup: &impl Lookup) -> String {
    substitute(template, lookup, false)
}

/// Like [`resolve`], but values are escaped so they read back as literal text
pub fn resolve_escaped(template: &str, lookup: &impl Lookup) -> String {
    substitute(template, lookup, true)
}

fn substitute(template: &str, lookup: &impl Lookup, escape: bool) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder { placeholder, raw } => match lookup.lookup(&placeholder) {
                // Quotes too, the placeholder may sit in an attribute value
                Some(value) if escape => {
                    out.push_str(&escape_text(&display(&value)).replace('"', "&quot;"))
                }
                Some(value) => out.push_str(&display(&value)),
                None => out.push_str(raw),
            },
        }
    }
    out
}
