//! Evaluation of extended selector trees against a live document.
//!
//! The matcher reads the document only through [`dom::DomAccess`]. Host failures (a selector
//! or XPath expression the host rejects) are logged per element and count as non-matches.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod engine;
mod predicates;
mod traversal;

pub use engine::{ExtendedMatcher, select};
