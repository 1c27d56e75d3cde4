//! Extended selector syntax tree.
//!
//! A [`SelectorList`] owns its [`Selector`]s; each selector is a sequence of compound steps
//! joined by combinators. Relative pseudo-classes own a boxed nested list, so the tree is
//! acyclic and its depth is bounded by the input length.

use core::fmt;
use regex::Regex;

/// Relationship between a step and the one before it (or the scope, for the first step).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Combinator {
    #[default]
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

impl Combinator {
    /// Spelling used when joining steps back into text.
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Descendant => " ",
            Self::Child => " > ",
            Self::NextSibling => " + ",
            Self::SubsequentSibling => " ~ ",
        }
    }
}

/// Comma-separated selectors.
#[derive(Clone, Debug, Default)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl SelectorList {
    /// True if every selector is plain standard CSS.
    pub fn is_regular(&self) -> bool {
        self.selectors.iter().all(Selector::is_regular)
    }

    /// True if the list carries `:remove()`. The parser guarantees it is on every selector or
    /// on none.
    pub fn should_remove(&self) -> bool {
        !self.selectors.is_empty() && self.selectors.iter().all(|selector| selector.remove)
    }
}

/// One selector sequence.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    /// The first step's combinator relates it to the scope element; it is only meaningful for
    /// relative arguments such as `:has(> .a)`.
    pub steps: Vec<SelectorStep>,
    /// Ended with `:remove()`.
    pub remove: bool,
}

impl Selector {
    pub fn is_regular(&self) -> bool {
        self.steps.iter().all(SelectorStep::is_regular)
    }

    /// Number of leading steps that are plain standard CSS, and their joined text (the first
    /// step's combinator is not included).
    pub fn regular_prefix(&self) -> (usize, String) {
        let mut text = String::new();
        let mut count = 0usize;
        for step in &self.steps {
            let Some(fragment) = step.regular_text() else {
                break;
            };
            if count > 0 {
                text.push_str(step.combinator.as_css());
            }
            text.push_str(fragment);
            count = count.saturating_add(1);
        }
        (count, text)
    }
}

/// A compound: simple selector nodes that all apply to the same element.
#[derive(Clone, Debug, Default)]
pub struct SelectorStep {
    pub combinator: Combinator,
    pub nodes: Vec<SimpleSelectorNode>,
}

impl SelectorStep {
    pub fn is_regular(&self) -> bool {
        self.nodes
            .iter()
            .all(|node| matches!(node, SimpleSelectorNode::Regular(_)))
    }

    /// The text of a step made of a single non-empty regular fragment.
    pub fn regular_text(&self) -> Option<&str> {
        match self.nodes.as_slice() {
            [SimpleSelectorNode::Regular(regular)] if !regular.text.is_empty() => {
                Some(regular.text.as_str())
            }
            _ => None,
        }
    }
}

/// Simple selector node variants.
#[derive(Clone, Debug)]
pub enum SimpleSelectorNode {
    Regular(RegularSelector),
    AbsoluteExtended(AbsoluteExtendedSelector),
    RelativeExtended(RelativeExtendedSelector),
}

/// Standard CSS kept verbatim. Empty text means any element.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RegularSelector {
    pub text: String,
}

impl RegularSelector {
    /// Text usable with a native query engine.
    pub fn as_query(&self) -> &str {
        if self.text.is_empty() { "*" } else { &self.text }
    }
}

/// An extended pseudo-class whose argument is not a selector.
#[derive(Clone, Debug)]
pub struct AbsoluteExtendedSelector {
    /// Name as written (aliases are kept).
    pub name: String,
    pub raw_arg: String,
    pub pseudo: AbsolutePseudoClass,
}

/// Which relative test a nested list performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelativeKind {
    /// Some element relative to the candidate matches.
    Has,
    /// The candidate is in the list's result set.
    Is,
    /// The candidate is not in the list's result set.
    Not,
}

/// An extended pseudo-class with a nested selector list argument.
#[derive(Clone, Debug)]
pub struct RelativeExtendedSelector {
    pub name: String,
    pub kind: RelativeKind,
    pub list: Box<SelectorList>,
}

/// Generated-content pseudo-element read by `:matches-css-before/after`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CssPseudoElement {
    Before,
    After,
}

/// `:contains` argument: a substring or a regex.
#[derive(Clone, Debug)]
pub enum TextMatcher {
    Literal(String),
    Regex(Regex),
}

impl TextMatcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(text),
        }
    }
}

/// A value compared as a whole: literal, `*` wildcard pattern or regex.
#[derive(Clone, Debug)]
pub enum ValuePattern {
    Exact(String),
    Wildcard(Regex),
    Regex(Regex),
}

impl ValuePattern {
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => value == expected,
            Self::Wildcard(regex) | Self::Regex(regex) => regex.is_match(value),
        }
    }
}

/// One segment of a `:matches-property` chain.
#[derive(Clone, Debug)]
pub enum ChainSegment {
    Literal(String),
    Regex(Regex),
}

impl ChainSegment {
    pub fn is_match(&self, key: &str) -> bool {
        match self {
            Self::Literal(expected) => key == expected,
            Self::Regex(regex) => regex.is_match(key),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatchesCss {
    pub pseudo_element: Option<CssPseudoElement>,
    /// Lowercase property name.
    pub property: String,
    pub value: ValuePattern,
}

#[derive(Clone, Debug)]
pub struct MatchesAttr {
    pub name: ValuePattern,
    /// `None` tests presence only.
    pub value: Option<ValuePattern>,
}

#[derive(Clone, Debug)]
pub struct MatchesProperty {
    pub chain: Vec<ChainSegment>,
    /// `None` tests presence only.
    pub value: Option<ValuePattern>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Upward {
    /// Same as `:nth-ancestor(n)`.
    Depth(usize),
    /// Nearest ancestor matching a standard selector.
    Selector(String),
}

/// Absolute extended pseudo-classes with validated arguments.
#[derive(Clone, Debug)]
pub enum AbsolutePseudoClass {
    Contains(TextMatcher),
    MatchesCss(MatchesCss),
    MatchesAttr(MatchesAttr),
    MatchesProperty(MatchesProperty),
    Xpath(String),
    NthAncestor(usize),
    Upward(Upward),
}

impl AbsolutePseudoClass {
    /// True for pseudo-classes that map each candidate to other elements instead of filtering.
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Xpath(_) | Self::NthAncestor(_) | Self::Upward(_))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, selector) in self.selectors.iter().enumerate() {
            if index > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{selector}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                formatter.write_str(step.combinator.as_css())?;
            } else if step.combinator != Combinator::Descendant {
                formatter.write_str(step.combinator.as_css().trim_start())?;
            }
            for node in &step.nodes {
                write!(formatter, "{node}")?;
            }
        }
        if self.remove {
            formatter.write_str(":remove()")?;
        }
        Ok(())
    }
}

impl fmt::Display for SimpleSelectorNode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular(regular) => formatter.write_str(&regular.text),
            Self::AbsoluteExtended(absolute) => {
                write!(formatter, ":{}({})", absolute.name, absolute.raw_arg)
            }
            Self::RelativeExtended(relative) => {
                write!(formatter, ":{}({})", relative.name, relative.list)
            }
        }
    }
}
