//! Markup tree produced by the fragment parser

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Elements that never take children and have no closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Check whether a tag name is a void element
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

/// A name/value attribute pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An opening tag as seen by the lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Written as `<tag ... />`
    pub self_closing: bool,
}

impl OpenTag {
    /// True when this tag cannot have a matching close tag
    pub fn is_leaf(&self) -> bool {
        self.self_closing || is_void(&self.name)
    }
}

/// Element with its attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
}

impl ElementNode {
    /// Build an element without children from an opening tag
    pub fn leaf(tag: OpenTag) -> Self {
        Self {
            name: tag.name,
            attrs: tag.attrs,
            children: Vec::new(),
        }
    }
}

/// A node in a parsed markup fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(ElementNode),
    Text(String),
    Comment(String),
}

/// Escape text content for serialization
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for a double-quoted serialization
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the character references produced by [`escape_text`] and [`escape_attr`]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
            ("&apos;", '\''),
            ("&nbsp;", '\u{a0}'),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));

        match decoded {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
