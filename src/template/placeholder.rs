//! Placeholder scanning for `{key}` and `{namespace.key}`

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
enum Piece {
    #[regex(r"\{[A-Za-z0-9_]+\.[A-Za-z0-9_]+\}", |lex| {
        let s = lex.slice();
        let inner = &s[1..s.len() - 1];
        inner
            .split_once('.')
            .map(|(ns, key)| (ns.to_string(), key.to_string()))
    })]
    Scoped((String, String)),

    #[regex(r"\{[A-Za-z0-9_]+\}", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Key(String),

    #[regex(r"[^{]+")]
    Text,

    // A brace that does not open a placeholder
    #[token("{")]
    Brace,
}

/// A placeholder found in a template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `{key}`, resolved against the primary store
    Key(String),
    /// `{namespace.key}`, resolved against a named context
    Scoped { namespace: String, key: String },
}

impl Placeholder {
    /// The key recorded in a binding: `key` or `namespace.key`
    pub fn binding_key(&self) -> String {
        match self {
            Placeholder::Key(key) => key.clone(),
            Placeholder::Scoped { namespace, key } => format!("{}.{}", namespace, key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Placeholder {
        placeholder: Placeholder,
        /// The placeholder exactly as written, braces included
        raw: &'a str,
    },
}

/// Split a template into literal text and placeholders
///
/// Adjacent literal pieces are merged so the output alternates where it can.
pub fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out: Vec<Segment<'_>> = Vec::new();
    let mut text_start: Option<usize> = None;

    for (piece, span) in Piece::lexer(template).spanned() {
        let placeholder = match piece {
            Ok(Piece::Key(key)) => Placeholder::Key(key),
            Ok(Piece::Scoped((namespace, key))) => Placeholder::Scoped { namespace, key },
            // Anything else, lexer errors included, is literal text
            _ => {
                text_start.get_or_insert(span.start);
                continue;
            }
        };
        if let Some(start) = text_start.take() {
            out.push(Segment::Text(&template[start..span.start]));
        }
        out.push(Segment::Placeholder {
            placeholder,
            raw: &template[span],
        });
    }

    if let Some(start) = text_start {
        out.push(Segment::Text(&template[start..]));
    }
    out
}

/// Binding keys referenced by a template, deduplicated, in order of first use
pub fn dependencies(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for segment in segments(template) {
        if let Segment::Placeholder { placeholder, .. } = segment {
            let key = placeholder.binding_key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

pub fn has_placeholders(template: &str) -> bool {
    segments(template)
        .iter()
        .any(|s| matches!(s, Segment::Placeholder { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let segs = segments("Hi {name}, cart={cart.count}!");
        assert_eq!(
            segs,
            vec![
                Segment::Text("Hi "),
                Segment::Placeholder {
                    placeholder: Placeholder::Key("name".to_string()),
                    raw: "{name}"
                },
                Segment::Text(", cart="),
                Segment::Placeholder {
                    placeholder: Placeholder::Scoped {
                        namespace: "cart".to_string(),
                        key: "count".to_string()
                    },
                    raw: "{cart.count}"
                },
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_non_placeholder_braces_are_text() {
        assert_eq!(
            segments("a { b } {}{x-y}"),
            vec![Segment::Text("a { b } {}{x-y}")]
        );
        assert!(!has_placeholders("function() { return 1; }"));
    }

    #[test]
    fn test_dependencies_dedup() {
        assert_eq!(
            dependencies("{a}{b}{a}{user.a}"),
            vec!["a".to_string(), "b".to_string(), "user.a".to_string()]
        );
        assert!(dependencies("plain").is_empty());
    }

    #[test]
    fn test_placeholder_inside_markup() {
        assert_eq!(
            dependencies(r#"<p class="x">count={count}</p>"#),
            vec!["count".to_string()]
        );
    }
}
