use css_ext_selector::Combinator;
use dom::{DomAccess, NodeKey};
use rustc_hash::FxHashSet;

/// Elements related to any of `from` by `combinator`, without duplicates.
pub(crate) fn expand<H: DomAccess + ?Sized>(
    host: &H,
    from: &[NodeKey],
    combinator: Combinator,
) -> Vec<NodeKey> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for &node in from {
        let related = match combinator {
            Combinator::Descendant => host.descendant_elements(node),
            Combinator::Child => host.element_children(node),
            Combinator::NextSibling => host.next_element_sibling(node).into_iter().collect(),
            Combinator::SubsequentSibling => following_siblings(host, node),
        };
        out.extend(related.into_iter().filter(|&element| seen.insert(element)));
    }
    out
}

fn following_siblings<H: DomAccess + ?Sized>(host: &H, element: NodeKey) -> Vec<NodeKey> {
    let mut siblings = Vec::new();
    let mut current = host.next_element_sibling(element);
    while let Some(sibling) = current {
        siblings.push(sibling);
        current = host.next_element_sibling(sibling);
    }
    siblings
}

/// The element ancestor exactly `depth` levels up.
pub(crate) fn nth_ancestor<H: DomAccess + ?Sized>(
    host: &H,
    element: NodeKey,
    depth: usize,
) -> Option<NodeKey> {
    let mut current = element;
    for _ in 0..depth {
        current = host.parent_element(current)?;
    }
    Some(current)
}
