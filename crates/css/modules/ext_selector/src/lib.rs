//! Extended selector syntax: standard CSS plus pseudo-classes that match on text, computed
//! style, attributes, script properties, ancestors and XPath.
//!
//! Parsing produces a [`SelectorList`] tree that the matcher evaluates against a host document.
//! Supported extended pseudo-classes (aliases in parentheses):
//! - `:contains()` (`:has-text()`, `:-abp-contains()`)
//! - `:matches-css()`, `:matches-css-before()`, `:matches-css-after()`
//! - `:matches-attr()`, `:matches-property()`
//! - `:xpath()`, `:nth-ancestor()`, `:upward()`
//! - `:has()` (`:-abp-has()`, `:if()`), `:is()`, `:not()`
//! - `:remove()`

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod ast;
mod cache;
mod error;
mod legacy;
mod parser;
mod pseudo;
mod tokenizer;

pub use ast::{
    AbsoluteExtendedSelector, AbsolutePseudoClass, ChainSegment, Combinator, CssPseudoElement,
    MatchesAttr, MatchesCss, MatchesProperty, RegularSelector, RelativeExtendedSelector,
    RelativeKind, Selector, SelectorList, SelectorStep, SimpleSelectorNode, TextMatcher, Upward,
    ValuePattern,
};
pub use cache::SelectorCache;
pub use error::{SelectorParseError, SelectorParseErrorKind};
pub use legacy::convert_legacy_syntax;
pub use parser::parse_selector_list;
pub use pseudo::{
    EXTENDED_PSEUDO_CLASSES, MAX_ANCESTOR_DEPTH, is_extended_pseudo_class, normalize_url_quotes,
    parse_regex_literal, strip_quotes,
};
pub use tokenizer::{
    SELECTOR_MARKS, Token, TokenKind, is_selector_whitespace, tokenize, tokenize_selector,
};
