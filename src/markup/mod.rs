//! Markup fragments: lexing, parsing and serialization

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::parse_fragment;
