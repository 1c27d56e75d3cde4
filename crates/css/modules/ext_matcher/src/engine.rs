//! Set-at-a-time evaluation of extended selectors.
//!
//! Each selector is evaluated left to right: a candidate set is seeded from the first step,
//! narrowed or remapped by every node of the step, and expanded across each combinator by
//! explicit traversal. Regular fragments go to the host's native selector engine.

use core::ptr;

use crate::predicates;
use crate::traversal::{expand, nth_ancestor};
use css_ext_selector::{
    AbsoluteExtendedSelector, AbsolutePseudoClass, RelativeExtendedSelector, RelativeKind,
    Selector, SelectorList, SelectorStep, SimpleSelectorNode, Upward,
};
use dom::{DomAccess, HostError, NodeKey};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

/// Where a selector list is anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Document,
    /// The implicit `:scope` of a relative argument.
    Element(NodeKey),
}

/// Evaluates selector trees against one host. `:is()`/`:not()` results are memoized for the
/// lifetime of the matcher, so use one matcher per query while the document is unchanged.
pub struct ExtendedMatcher<'host, H: DomAccess + ?Sized> {
    host: &'host H,
    memo: FxHashMap<usize, FxHashSet<NodeKey>>,
}

impl<'host, H: DomAccess + ?Sized> ExtendedMatcher<'host, H> {
    pub fn new(host: &'host H) -> Self {
        Self {
            host,
            memo: FxHashMap::default(),
        }
    }

    /// All elements of the document matching `list`, deduplicated, in document order.
    pub fn select(&mut self, list: &SelectorList) -> Vec<NodeKey> {
        let mut found = self.evaluate_list(list, Scope::Document);
        self.host.sort_by_document_order(&mut found);
        found
    }

    /// Elements matching `list` relative to `scope`, as a `:has()` argument would see them.
    /// Results are deduplicated and kept in traversal order.
    pub fn select_relative(&mut self, list: &SelectorList, scope: NodeKey) -> Vec<NodeKey> {
        self.evaluate_list(list, Scope::Element(scope))
    }

    fn evaluate_list(&mut self, list: &SelectorList, scope: Scope) -> Vec<NodeKey> {
        let mut found = Vec::new();
        for selector in &list.selectors {
            found.extend(self.evaluate_selector(selector, scope));
        }
        dedup_in_order(found)
    }

    /// Whether any selector of `list` matches relative to `scope`.
    fn matches_relative(&mut self, list: &SelectorList, scope: NodeKey) -> bool {
        list.selectors
            .iter()
            .any(|selector| !self.evaluate_selector(selector, Scope::Element(scope)).is_empty())
    }

    fn evaluate_selector(&mut self, selector: &Selector, scope: Scope) -> Vec<NodeKey> {
        let (mut current, consumed) = match scope {
            Scope::Document => self.seed_document(selector),
            Scope::Element(root) => {
                let Some(first) = selector.steps.first() else {
                    return Vec::new();
                };
                let candidates = expand(self.host, &[root], first.combinator);
                (self.apply_nodes(candidates, &first.nodes), 1)
            }
        };
        for step in selector.steps.iter().skip(consumed) {
            if current.is_empty() {
                break;
            }
            current = self.apply_step(&current, step);
        }
        current
    }

    /// Candidates for a document-anchored selector and how many steps they already cover.
    fn seed_document(&mut self, selector: &Selector) -> (Vec<NodeKey>, usize) {
        let document = self.host.document();
        let (count, prefix) = selector.regular_prefix();
        if count > 0 {
            return (self.query_all(document, &prefix), count);
        }
        let Some(first) = selector.steps.first() else {
            return (Vec::new(), 0);
        };
        let seeded = match first.nodes.as_slice() {
            [
                SimpleSelectorNode::Regular(regular),
                SimpleSelectorNode::AbsoluteExtended(AbsoluteExtendedSelector {
                    pseudo: AbsolutePseudoClass::Xpath(expression),
                    ..
                }),
                rest @ ..,
            ] if regular.text.is_empty() => {
                let seed = self.xpath(document, expression);
                self.apply_nodes(seed, rest)
            }
            [SimpleSelectorNode::Regular(regular), rest @ ..] => {
                let seed = self.query_all(document, regular.as_query());
                self.apply_nodes(seed, rest)
            }
            nodes => {
                let seed = self.host.descendant_elements(document);
                self.apply_nodes(seed, nodes)
            }
        };
        (seeded, 1)
    }

    fn apply_step(&mut self, from: &[NodeKey], step: &SelectorStep) -> Vec<NodeKey> {
        let candidates = expand(self.host, from, step.combinator);
        self.apply_nodes(candidates, &step.nodes)
    }

    fn apply_nodes(
        &mut self,
        mut candidates: Vec<NodeKey>,
        nodes: &[SimpleSelectorNode],
    ) -> Vec<NodeKey> {
        for node in nodes {
            if candidates.is_empty() {
                break;
            }
            candidates = match node {
                SimpleSelectorNode::Regular(regular) if regular.text.is_empty() => candidates,
                SimpleSelectorNode::Regular(regular) => candidates
                    .into_iter()
                    .filter(|&element| self.matches_regular(element, &regular.text))
                    .collect(),
                SimpleSelectorNode::AbsoluteExtended(absolute) => {
                    self.apply_absolute(candidates, &absolute.pseudo)
                }
                SimpleSelectorNode::RelativeExtended(relative) => {
                    self.apply_relative(candidates, relative)
                }
            };
        }
        candidates
    }

    fn apply_absolute(
        &self,
        candidates: Vec<NodeKey>,
        pseudo: &AbsolutePseudoClass,
    ) -> Vec<NodeKey> {
        let host = self.host;
        match pseudo {
            AbsolutePseudoClass::Contains(matcher) => candidates
                .into_iter()
                .filter(|&element| predicates::contains(host, element, matcher))
                .collect(),
            AbsolutePseudoClass::MatchesCss(matches) => candidates
                .into_iter()
                .filter(|&element| predicates::matches_css(host, element, matches))
                .collect(),
            AbsolutePseudoClass::MatchesAttr(matches) => candidates
                .into_iter()
                .filter(|&element| predicates::matches_attr(host, element, matches))
                .collect(),
            AbsolutePseudoClass::MatchesProperty(matches) => candidates
                .into_iter()
                .filter(|&element| predicates::matches_property(host, element, matches))
                .collect(),
            AbsolutePseudoClass::Xpath(expression) => {
                let mut mapped = Vec::new();
                for element in candidates {
                    mapped.extend(self.xpath(element, expression));
                }
                dedup_in_order(mapped)
            }
            AbsolutePseudoClass::NthAncestor(depth)
            | AbsolutePseudoClass::Upward(Upward::Depth(depth)) => dedup_in_order(
                candidates
                    .into_iter()
                    .filter_map(|element| nth_ancestor(host, element, *depth))
                    .collect(),
            ),
            AbsolutePseudoClass::Upward(Upward::Selector(selector)) => dedup_in_order(
                candidates
                    .into_iter()
                    .filter_map(|element| self.closest_ancestor(element, selector))
                    .collect(),
            ),
        }
    }

    fn apply_relative(
        &mut self,
        candidates: Vec<NodeKey>,
        relative: &RelativeExtendedSelector,
    ) -> Vec<NodeKey> {
        match relative.kind {
            RelativeKind::Has => candidates
                .into_iter()
                .filter(|&element| self.matches_relative(&relative.list, element))
                .collect(),
            RelativeKind::Is | RelativeKind::Not => {
                let keep = relative.kind == RelativeKind::Is;
                let members = self.document_members(&relative.list);
                candidates
                    .into_iter()
                    .filter(|element| members.contains(element) == keep)
                    .collect()
            }
        }
    }

    /// Everything `list` selects in the document, computed once per matcher.
    fn document_members(&mut self, list: &SelectorList) -> &FxHashSet<NodeKey> {
        let key = ptr::from_ref(list).addr();
        if !self.memo.contains_key(&key) {
            let members = self
                .evaluate_list(list, Scope::Document)
                .into_iter()
                .collect();
            self.memo.insert(key, members);
        }
        self.memo.entry(key).or_default()
    }

    fn closest_ancestor(&self, element: NodeKey, selector: &str) -> Option<NodeKey> {
        let mut current = self.host.parent_element(element);
        while let Some(ancestor) = current {
            match self.host.matches_selector(ancestor, selector) {
                Ok(true) => return Some(ancestor),
                Ok(false) => current = self.host.parent_element(ancestor),
                Err(err) => {
                    report(element, &err);
                    return None;
                }
            }
        }
        None
    }

    fn matches_regular(&self, element: NodeKey, selector: &str) -> bool {
        self.host
            .matches_selector(element, selector)
            .unwrap_or_else(|err| {
                report(element, &err);
                false
            })
    }

    fn query_all(&self, scope: NodeKey, selector: &str) -> Vec<NodeKey> {
        self.host
            .query_selector_all(scope, selector)
            .unwrap_or_else(|err| {
                report(scope, &err);
                Vec::new()
            })
    }

    /// Element results of `expression` evaluated at `context`.
    fn xpath(&self, context: NodeKey, expression: &str) -> Vec<NodeKey> {
        match self.host.evaluate_xpath(context, expression) {
            Ok(nodes) => nodes
                .into_iter()
                .filter(|&node| self.host.is_element(node))
                .collect(),
            Err(err) => {
                report(context, &err);
                Vec::new()
            }
        }
    }
}

fn report(node: NodeKey, err: &HostError) {
    warn!("extended selector evaluation failed at {node}: {err}");
}

fn dedup_in_order(nodes: Vec<NodeKey>) -> Vec<NodeKey> {
    let mut seen = FxHashSet::default();
    nodes.into_iter().filter(|&node| seen.insert(node)).collect()
}

/// All elements of `host` matching `list`, in document order.
pub fn select<H: DomAccess + ?Sized>(host: &H, list: &SelectorList) -> Vec<NodeKey> {
    ExtendedMatcher::new(host).select(list)
}
