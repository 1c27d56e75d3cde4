//! Selectors Level 3 — standard selector parsing and element matching.
//! Spec: <https://www.w3.org/TR/selectors-3/>
//!
//! This is the "native" selector engine hosts expose to the extended matcher:
//! - Type, universal, class, id and attribute selectors (all Level 3 operators, `i` flag)
//! - Structural, form-state and user-action pseudo-classes
//! - Combinators: descendant, child, adjacent sibling, general sibling
//! - Specificity calculation
//!
//! Parsing is strict: anything outside the supported grammar is a [`SelectorError`], so callers
//! can use [`parse_selector_list`] to validate that a fragment is plain standard CSS.

mod matcher;
mod parser;
mod specificity;

use core::error::Error;
use core::fmt;

// Re-export public API
pub use matcher::{matches_complex, matches_compound, matches_selector_list};
pub use parser::{parse_complex_selector, parse_selector_list, split_top_level};
pub use specificity::{
    Specificity, specificity_of_complex, specificity_of_compound, specificity_of_list,
};

/// An adapter that abstracts DOM access for selector matching.
/// Implement this for your DOM layer.
///
/// Spec references:
/// - Section 3: Selectors overview and element matching
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element if any. The document node is not an element and must not be returned.
    /// Spec: Section 11 — Combinators (for tree relationships)
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Previous sibling element (skip non-elements if your DOM has mixed nodes).
    /// Spec: Section 11 — Sibling combinators
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Next sibling element, used by `:last-child` and the `nth-last-*` family.
    /// Spec: Section 6.6.5 — Structural pseudo-classes
    fn next_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase (per HTML parsing conventions).
    /// Spec: Section 5 — Type selectors
    fn tag_name(&self, element: Self::Handle) -> &str;

    /// Returns the attribute value if present.
    /// Spec: Section 8 — Attribute selectors
    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;

    /// True if the element has element children or non-empty text.
    /// Spec: Section 6.6.5.10 — `:empty`
    fn has_child_nodes(&self, element: Self::Handle) -> bool;

    /// Returns Some(id) if the element has an id attribute, else None.
    /// Spec: Section 7 — ID selectors
    fn element_id(&self, element: Self::Handle) -> Option<&str> {
        self.attr(element, "id")
    }

    /// True if the element has the given class token.
    /// Spec: Section 6 — Class selectors
    fn has_class(&self, element: Self::Handle, class: &str) -> bool {
        self.attr(element, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|token| token == class))
    }
}

/// Attribute selector operators.
/// Spec: Section 6.3 — Attribute presence and value selectors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrOperator {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals,
    /// `[name~=value]`
    Includes,
    /// `[name|=value]`
    DashMatch,
    /// `[name^=value]`
    Prefix,
    /// `[name$=value]`
    Suffix,
    /// `[name*=value]`
    Substring,
}

/// A parsed attribute selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrSelector {
    /// Attribute name, lowercased.
    pub name: String,
    pub operator: AttrOperator,
    /// Comparison value; empty for [`AttrOperator::Exists`].
    pub value: String,
    /// `[name=value i]`
    pub case_insensitive: bool,
}

/// `An+B` microsyntax.
/// Spec: Section 6.6.5.2 — `:nth-child()`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nth {
    pub step: i32,
    pub offset: i32,
}

impl Nth {
    /// True if the 1-based `position` is selected by this formula.
    pub fn matches(self, position: i32) -> bool {
        if self.step == 0 {
            return position == self.offset;
        }
        let distance = position - self.offset;
        distance % self.step == 0 && distance / self.step >= 0
    }
}

/// Supported standard pseudo-classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Empty,
    Root,
    Checked,
    Disabled,
    Enabled,
    /// `:link` / `:any-link` — an `a` or `area` element with `href`.
    Link,
    /// Dynamic user-action state (`:hover`, `:focus` ...). A static document never matches it.
    State(String),
    /// `:not(list)`
    Not(Box<SelectorList>),
    /// `:is(list)`
    Is(Box<SelectorList>),
}

/// Simple selectors.
/// Spec: Section 5, 6, 7, 8
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Spec: Section 5 — Type selectors
    Type(String),
    /// Spec: Section 6 — Class selectors
    Class(String),
    /// Spec: Section 7 — ID selectors
    IdSelector(String),
    /// Spec: Section 8 — Attribute selectors
    Attribute(AttrSelector),
    /// Spec: Section 6.6 — Pseudo-classes
    Pseudo(PseudoClass),
    /// Universal selector '*'.
    /// Spec: Section 5 — Universal selector
    Universal,
}

/// A compound selector is a sequence of simple selectors (no combinators).
/// Spec: Section 5 — Simple selector sequences
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// Combinators between compounds.
/// Spec: Section 11 — Combinators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A complex selector is one or more compounds separated by combinators.
/// Spec: Section 3, 11
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// A selector list separated by commas.
/// Spec: Section 4 — Groups of selectors
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

/// Why a selector failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorErrorKind {
    /// Nothing to parse.
    Empty,
    /// A character that cannot start a simple selector or combinator.
    UnexpectedCharacter(char),
    /// `.`, `#` or an attribute without a name.
    MissingIdentifier,
    /// `[` without `]` or a malformed attribute body.
    InvalidAttribute,
    /// A string that never closes.
    UnterminatedString,
    /// A `(` without its `)`.
    UnbalancedParenthesis,
    /// A combinator with no compound on one side.
    DanglingCombinator,
    /// A pseudo-class that is not supported.
    UnknownPseudoClass(String),
    /// A pseudo-class argument that is missing or malformed.
    InvalidPseudoArgument(String),
    /// `::name` pseudo-elements cannot be matched against elements.
    PseudoElement(String),
}

/// A selector parse failure with the byte position it was detected at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorError {
    pub kind: SelectorErrorKind,
    pub position: usize,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SelectorErrorKind::Empty => write!(formatter, "empty selector"),
            SelectorErrorKind::UnexpectedCharacter(character) => {
                write!(formatter, "unexpected character '{character}'")
            }
            SelectorErrorKind::MissingIdentifier => write!(formatter, "missing identifier"),
            SelectorErrorKind::InvalidAttribute => write!(formatter, "invalid attribute selector"),
            SelectorErrorKind::UnterminatedString => write!(formatter, "unterminated string"),
            SelectorErrorKind::UnbalancedParenthesis => write!(formatter, "unbalanced parenthesis"),
            SelectorErrorKind::DanglingCombinator => write!(formatter, "dangling combinator"),
            SelectorErrorKind::UnknownPseudoClass(name) => {
                write!(formatter, "unknown pseudo-class ':{name}'")
            }
            SelectorErrorKind::InvalidPseudoArgument(name) => {
                write!(formatter, "invalid argument for ':{name}'")
            }
            SelectorErrorKind::PseudoElement(name) => {
                write!(formatter, "pseudo-element '::{name}' is not supported here")
            }
        }?;
        write!(formatter, " at position {}", self.position)
    }
}

impl Error for SelectorError {}

/// Standard pseudo-classes without an argument.
pub const STANDARD_PSEUDO_CLASSES: &[&str] = &[
    "first-child",
    "last-child",
    "only-child",
    "first-of-type",
    "last-of-type",
    "only-of-type",
    "empty",
    "root",
    "checked",
    "disabled",
    "enabled",
    "link",
    "any-link",
    "visited",
    "hover",
    "active",
    "focus",
    "focus-within",
    "focus-visible",
    "target",
];

/// Standard functional pseudo-classes (`:not` and `:is` are listed separately because extended
/// syntax reuses their names).
pub const STANDARD_FUNCTIONAL_PSEUDO_CLASSES: &[&str] = &[
    "nth-child",
    "nth-last-child",
    "nth-of-type",
    "nth-last-of-type",
];

/// True if `name` is a supported standard pseudo-class (functional or not).
pub fn is_standard_pseudo_class(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    STANDARD_PSEUDO_CLASSES.contains(&lowered.as_str())
        || STANDARD_FUNCTIONAL_PSEUDO_CLASSES.contains(&lowered.as_str())
}
