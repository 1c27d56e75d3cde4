//! Host capabilities the extended CSS engine needs from a live document, plus an in-memory
//! reference document that implements all of them.
//!
//! The engine never touches a concrete tree. It reads through [`DomAccess`], writes through
//! [`DomMutation`] and learns about changes through [`MutationSource`]. [`Document`] is the
//! host used by tests and tools.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod computed;
mod document;
mod markup;
mod mutation;
mod snapshot;
mod xpath;

use core::error::Error;
use core::fmt;
use indexmap::IndexMap;
use std::collections::HashMap;

pub use document::Document;

/// A stable key for DOM nodes. Keys are never reused within one document.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Generated-content pseudo-elements readable through computed style.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
}

impl PseudoElement {
    /// The `::name` spelling.
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Before => "::before",
            Self::After => "::after",
        }
    }
}

/// A script-visible value stored on an element object.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(IndexMap<String, PropertyValue>),
}

impl fmt::Display for PropertyValue {
    /// String conversion as a script engine would perform it.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => formatter.write_str("undefined"),
            Self::Null => formatter.write_str("null"),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Number(number) if number.is_nan() => formatter.write_str("NaN"),
            Self::Number(number) if number.is_infinite() => {
                formatter.write_str(if *number > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Number(number) if *number == 0.0 => formatter.write_str("0"),
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e21 => {
                write!(formatter, "{number:.0}")
            }
            Self::Number(number) => write!(formatter, "{number}"),
            Self::String(text) => formatter.write_str(text),
            Self::Object(_) => formatter.write_str("[object Object]"),
        }
    }
}

/// Failures reported by a host while evaluating on behalf of the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host rejected a selector.
    InvalidSelector(String),
    /// The host rejected an XPath expression.
    InvalidXPath(String),
    /// The node does not exist in this document.
    UnknownNode(NodeKey),
    /// The operation needs an element but got another node type.
    NotAnElement(NodeKey),
}

impl fmt::Display for HostError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSelector(message) => write!(formatter, "InvalidSelector: {message}"),
            Self::InvalidXPath(message) => write!(formatter, "InvalidXPath: {message}"),
            Self::UnknownNode(node) => write!(formatter, "UnknownNode: {node}"),
            Self::NotAnElement(node) => write!(formatter, "NotAnElement: {node}"),
        }
    }
}

impl Error for HostError {}

/// Which changes an observer wants to hear about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    /// Only these attribute names, when set.
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: bool,
    pub character_data: bool,
}

/// Handle for one observation registered with a [`MutationSource`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// What changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeKey>,
        removed: Vec<NodeKey>,
    },
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    CharacterData {
        old_value: Option<String>,
    },
}

/// One change delivered to an observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeKey,
    pub kind: MutationKind,
}

impl MutationRecord {
    /// True for attribute changes.
    pub const fn is_attribute(&self) -> bool {
        matches!(self.kind, MutationKind::Attributes { .. })
    }
}

/// Read access to a live document.
pub trait DomAccess {
    /// The document node.
    fn document(&self) -> NodeKey;

    /// True if `node` is an element.
    fn is_element(&self, node: NodeKey) -> bool;

    /// Parent node, including the document node.
    fn parent_node(&self, node: NodeKey) -> Option<NodeKey>;

    /// Parent if it is an element.
    fn parent_element(&self, node: NodeKey) -> Option<NodeKey> {
        self.parent_node(node)
            .filter(|&parent| self.is_element(parent))
    }

    /// True if `node` is reachable from the document node.
    fn is_connected(&self, node: NodeKey) -> bool {
        let document = self.document();
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == document {
                return true;
            }
            current = self.parent_node(candidate);
        }
        false
    }

    /// Element children in order.
    fn element_children(&self, node: NodeKey) -> Vec<NodeKey>;

    fn next_element_sibling(&self, element: NodeKey) -> Option<NodeKey>;

    fn previous_element_sibling(&self, element: NodeKey) -> Option<NodeKey>;

    /// All element descendants of `node` in document order, excluding `node`.
    fn descendant_elements(&self, node: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.element_children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.element_children(current).into_iter().rev());
        }
        out
    }

    /// Sort and deduplicate `nodes` into document order. Detached nodes go last.
    fn sort_by_document_order(&self, nodes: &mut Vec<NodeKey>) {
        let order: HashMap<NodeKey, usize> = self
            .descendant_elements(self.document())
            .into_iter()
            .enumerate()
            .map(|(index, key)| (key, index))
            .collect();
        nodes.sort_by_key(|node| (order.get(node).copied().unwrap_or(usize::MAX), *node));
        nodes.dedup();
    }

    /// Lowercase tag name of an element.
    fn tag_name(&self, element: NodeKey) -> Option<String>;

    fn attribute(&self, element: NodeKey, name: &str) -> Option<String>;

    /// All attributes in source order.
    fn attributes(&self, element: NodeKey) -> Vec<(String, String)>;

    /// Accumulated text of the node and its descendants, read from the tree itself so page
    /// scripts cannot override it.
    fn text_content(&self, node: NodeKey) -> String;

    /// Computed value of `property` for the element or one of its pseudo-elements.
    fn computed_style_value(
        &self,
        element: NodeKey,
        pseudo: Option<PseudoElement>,
        property: &str,
    ) -> Option<String>;

    /// Own properties of the element object.
    fn element_properties(&self, element: NodeKey) -> IndexMap<String, PropertyValue>;

    /// Evaluate an XPath expression with `context` as the context node.
    ///
    /// # Errors
    /// Returns [`HostError::InvalidXPath`] for expressions the host cannot evaluate.
    fn evaluate_xpath(&self, context: NodeKey, expression: &str)
    -> Result<Vec<NodeKey>, HostError>;

    /// Elements below `scope` matching a standard selector, in document order.
    ///
    /// # Errors
    /// Returns [`HostError::InvalidSelector`] if the host rejects the selector.
    fn query_selector_all(&self, scope: NodeKey, selector: &str)
    -> Result<Vec<NodeKey>, HostError>;

    /// Whether `element` matches a standard selector.
    ///
    /// # Errors
    /// Returns [`HostError::InvalidSelector`] if the host rejects the selector.
    fn matches_selector(&self, element: NodeKey, selector: &str) -> Result<bool, HostError>;

    /// A readable path such as `html > body > div:nth-child(2)`, stable while the tree shape
    /// is stable.
    fn element_path(&self, element: NodeKey) -> String {
        let mut segments = Vec::new();
        let mut current = Some(element);
        while let Some(node) = current
            && self.is_element(node)
        {
            let tag = self.tag_name(node).unwrap_or_default();
            let mut position = 1usize;
            let mut sibling = self.previous_element_sibling(node);
            while let Some(previous) = sibling {
                position = position.saturating_add(1);
                sibling = self.previous_element_sibling(previous);
            }
            if position == 1 && self.next_element_sibling(node).is_none() {
                segments.push(tag);
            } else {
                segments.push(format!("{tag}:nth-child({position})"));
            }
            current = self.parent_node(node);
        }
        segments.reverse();
        segments.join(" > ")
    }
}

/// Write access to a live document.
pub trait DomMutation {
    /// # Errors
    /// Returns an error if `element` is not an element of this document.
    fn set_attribute(&mut self, element: NodeKey, name: &str, value: &str)
    -> Result<(), HostError>;

    /// # Errors
    /// Returns an error if `element` is not an element of this document.
    fn remove_attribute(&mut self, element: NodeKey, name: &str) -> Result<(), HostError>;

    /// Detach `node` from its parent. The node stays valid and may be re-inserted.
    ///
    /// # Errors
    /// Returns an error if `node` is unknown.
    fn remove_node(&mut self, node: NodeKey) -> Result<(), HostError>;
}

/// Mutation observation.
pub trait MutationSource {
    /// Start observing `target`.
    fn observe(&mut self, target: NodeKey, options: ObserveOptions) -> ObserverId;

    /// Stop an observation and drop its queued records.
    fn disconnect(&mut self, observer: ObserverId);

    /// Drain the records queued for `observer`.
    fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord>;
}

/// Everything the engine needs from a host.
pub trait DomHost: DomAccess + DomMutation + MutationSource {}

impl<T: DomAccess + DomMutation + MutationSource> DomHost for T {}
