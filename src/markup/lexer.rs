//! Lexer for markup fragments using logos

use logos::Logos;

use super::ast::{decode_entities, Attribute, OpenTag};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Tags are lexed whole; attributes are split out by a second lexer
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| parse_open_tag(lex.slice()))]
    OpenTag(OpenTag),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim().to_ascii_lowercase()
    })]
    CloseTag(String),

    #[regex(r"<!--([^-]|-[^-])*-->", |lex| {
        let s = lex.slice();
        s[4..s.len() - 3].to_string()
    })]
    Comment(String),

    #[regex(r"[^<]+", |lex| decode_entities(lex.slice()))]
    Text(String),

    // A `<` that does not start a tag is plain text
    #[token("<")]
    Lt,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum AttrToken {
    #[regex(r#"[^ \t\r\n"'<>=]+"#, |lex| lex.slice().to_string())]
    Word(String),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Quoted(String),
}

/// Split a whole opening tag (`<name attr="v" ...>`) into its parts
fn parse_open_tag(slice: &str) -> OpenTag {
    let body = &slice[1..slice.len() - 1];
    let name_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(body.len());
    let name = body[..name_end].to_ascii_lowercase();

    let mut rest = body[name_end..].trim_end();
    let self_closing = rest.ends_with('/');
    if self_closing {
        rest = &rest[..rest.len() - 1];
    }

    OpenTag {
        name,
        attrs: parse_attributes(rest),
        self_closing,
    }
}

/// Split the attribute part of a tag into name/value pairs
pub fn parse_attributes(source: &str) -> Vec<Attribute> {
    let mut attrs: Vec<Attribute> = Vec::new();
    let mut pending: Option<String> = None;
    let mut expecting_value = false;

    for tok in AttrToken::lexer(source).filter_map(|tok| tok.ok()) {
        match tok {
            AttrToken::Word(value) | AttrToken::Quoted(value) if expecting_value => {
                if let Some(name) = pending.take() {
                    push(&mut attrs, name, decode_entities(&value));
                }
                expecting_value = false;
            }
            AttrToken::Equals if pending.is_some() => expecting_value = true,
            AttrToken::Word(word) => {
                if let Some(previous) = pending.replace(word.to_ascii_lowercase()) {
                    push(&mut attrs, previous, String::new());
                }
            }
            AttrToken::Quoted(_) | AttrToken::Equals => {}
        }
    }

    if let Some(name) = pending {
        push(&mut attrs, name, String::new());
    }
    attrs
}

fn push(attrs: &mut Vec<Attribute>, name: String, value: String) {
    // First occurrence wins, as in HTML
    if !attrs.iter().any(|a| a.name == name) {
        attrs.push(Attribute { name, value });
    }
}

/// Lex markup into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
