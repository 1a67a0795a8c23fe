//! Fragment parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::MarkupError;
use crate::markup::ast::{ElementNode, MarkupNode};
use crate::markup::lexer::Token;

/// Parse a markup fragment into a list of sibling nodes
pub fn parse_fragment(input: &str) -> Result<Vec<MarkupNode>, Vec<MarkupError>> {
    let len = input.len();

    let token_iter = crate::markup::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    fragment_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn fragment_parser<'a, I>() -> impl Parser<'a, I, Vec<MarkupNode>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let node = recursive(|node| {
        let text = select! {
            Token::Text(s) => MarkupNode::Text(s),
            Token::Lt => MarkupNode::Text("<".to_string()),
        };

        let comment = select! {
            Token::Comment(c) => MarkupNode::Comment(c),
        };

        // <br>, <img ...>, <my-tag />
        let leaf_element = select! {
            Token::OpenTag(tag) if tag.is_leaf() => MarkupNode::Element(ElementNode::leaf(tag)),
        };

        let open_tag = select! {
            Token::OpenTag(tag) if !tag.is_leaf() => tag,
        };

        let close_tag = select! {
            Token::CloseTag(name) => name,
        };

        let element = open_tag
            .then(node.clone().repeated().collect::<Vec<_>>())
            .then(close_tag)
            .try_map(|((tag, children), close), span: SimpleSpan| {
                if tag.name != close {
                    return Err(Rich::custom(
                        span,
                        format!("closing tag </{}> does not match <{}>", close, tag.name),
                    ));
                }
                Ok(MarkupNode::Element(ElementNode {
                    name: tag.name,
                    attrs: tag.attrs,
                    children,
                }))
            });

        choice((text, comment, leaf_element, element)).boxed()
    });

    node.repeated().collect::<Vec<_>>().then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::ast::Attribute;

    #[test]
    fn test_parse_text_only() {
        let nodes = parse_fragment("count={count}").expect("Should parse");
        assert_eq!(nodes, vec![MarkupNode::Text("count={count}".to_string())]);
    }

    #[test]
    fn test_parse_empty() {
        let nodes = parse_fragment("").expect("Should parse");
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse_fragment(r#"<div id="a"><p>one</p><br><p>two</p></div>"#)
            .expect("Should parse");
        assert_eq!(nodes.len(), 1);
        let MarkupNode::Element(div) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(div.name, "div");
        assert_eq!(div.attrs, vec![Attribute::new("id", "a")]);
        assert_eq!(div.children.len(), 3);
        assert!(matches!(&div.children[1], MarkupNode::Element(br) if br.name == "br"));
    }

    #[test]
    fn test_parse_custom_element() {
        let nodes = parse_fragment(r#"<user-card name="Bob">hi</user-card>"#).expect("Should parse");
        let MarkupNode::Element(card) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(card.name, "user-card");
        assert_eq!(card.children, vec![MarkupNode::Text("hi".to_string())]);
    }

    #[test]
    fn test_mismatched_close_is_error() {
        let result = parse_fragment("<div><span>x</div></span>");
        assert!(result.is_err());
    }

    #[test]
    fn test_unclosed_is_error() {
        let result = parse_fragment("<div><p>text");
        assert!(result.is_err());
    }

    #[test]
    fn test_stray_close_is_error() {
        let result = parse_fragment("</div>");
        assert!(result.is_err());
    }
}
