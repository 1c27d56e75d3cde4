//! Extended CSS stylesheets: `selector { declarations }` rules whose selectors use the
//! extended syntax, with `debug` and `remove` pseudo-properties.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod error;
mod rule;
mod style_block;
mod stylesheet;

pub use error::{StyleBlockError, StyleBlockErrorKind, StylesheetError, StylesheetErrorKind};
pub use rule::ExtCssRuleData;
pub use style_block::{DebugMode, StyleBlock, parse_style_block};
pub use stylesheet::{ParsedRules, parse_rules, parse_stylesheet};
