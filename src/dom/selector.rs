//! Simple selectors for locating elements

use super::{Document, NodeId};

/// A single simple selector: `*`, `tag`, `#id`, `.class`, `[attr]` or `[attr=value]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl Selector {
    /// Parse a simple selector string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if s == "*" {
            Some(Self::Universal)
        } else if let Some(id) = s.strip_prefix('#') {
            (!id.is_empty()).then(|| Self::Id(id.to_string()))
        } else if let Some(class) = s.strip_prefix('.') {
            (!class.is_empty()).then(|| Self::Class(class.to_string()))
        } else if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let (name, value) = match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                    (name.trim(), Some(value.to_string()))
                }
                None => (inner.trim(), None),
            };
            (!name.is_empty()).then(|| Self::Attribute {
                name: name.to_ascii_lowercase(),
                value,
            })
        } else if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            Some(Self::Tag(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Check whether an element matches this selector
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(tag) = doc.tag_name(id) else {
            return false;
        };
        match self {
            Self::Universal => true,
            Self::Tag(name) => tag == name,
            Self::Id(wanted) => doc.attr(id, "id") == Some(wanted.as_str()),
            Self::Class(class) => doc
                .attr(id, "class")
                .map(|list| list.split_whitespace().any(|c| c == class))
                .unwrap_or(false),
            Self::Attribute { name, value } => match (doc.attr(id, name), value) {
                (Some(actual), Some(wanted)) => actual == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}
