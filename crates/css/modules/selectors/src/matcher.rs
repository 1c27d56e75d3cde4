//! CSS selector matching engine.
//! Spec: <https://www.w3.org/TR/selectors-3/>

use crate::{
    AttrOperator, AttrSelector, Combinator, ComplexSelector, CompoundSelector, ElementAdapter,
    Nth, PseudoClass, SelectorList, SimpleSelector,
};

/// Elements that take part in `:disabled` / `:enabled`.
const FORM_ELEMENTS: &[&str] = &[
    "button", "input", "select", "textarea", "option", "optgroup", "fieldset",
];

/// Match a selector list against an element.
/// Spec: Section 3, 4
pub fn matches_selector_list<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    list: &SelectorList,
) -> bool {
    list.selectors
        .iter()
        .any(|selector_item| matches_complex(adapter, element, selector_item))
}

/// Match a complex selector against an element.
/// Spec: Section 3, 11 — Right-to-left matching strategy
///
/// Every combinator step backtracks over all candidates (ancestors or previous siblings), so
/// `div > p span` finds a `p` under a `div` even when a closer `p` is not.
pub fn matches_complex<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
) -> bool {
    matches_from(adapter, element, sel, sel.rest.len())
}

/// Compound `index` of a complex selector: 0 is `first`, `i` is `rest[i - 1]`.
fn compound_at(sel: &ComplexSelector, index: usize) -> Option<&CompoundSelector> {
    if index == 0 {
        return Some(&sel.first);
    }
    sel.rest.get(index.saturating_sub(1)).map(|pair| &pair.1)
}

/// Match compound `index` against `element` and everything left of it against its relatives.
fn matches_from<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    sel: &ComplexSelector,
    index: usize,
) -> bool {
    let Some(compound) = compound_at(sel, index) else {
        return false;
    };
    if !matches_compound(adapter, element, compound) {
        return false;
    }
    if index == 0 {
        return true;
    }
    let Some(&(combinator, _)) = sel.rest.get(index.saturating_sub(1)) else {
        return false;
    };
    let left = index.saturating_sub(1);
    match combinator {
        Combinator::Child => adapter
            .parent(element)
            .is_some_and(|parent_el| matches_from(adapter, parent_el, sel, left)),
        Combinator::Descendant => {
            let mut current_parent = adapter.parent(element);
            while let Some(ancestor_element) = current_parent {
                if matches_from(adapter, ancestor_element, sel, left) {
                    return true;
                }
                current_parent = adapter.parent(ancestor_element);
            }
            false
        }
        Combinator::AdjacentSibling => adapter
            .previous_sibling_element(element)
            .is_some_and(|prev_el| matches_from(adapter, prev_el, sel, left)),
        Combinator::GeneralSibling => {
            let mut current_sibling = adapter.previous_sibling_element(element);
            while let Some(sibling_element) = current_sibling {
                if matches_from(adapter, sibling_element, sel, left) {
                    return true;
                }
                current_sibling = adapter.previous_sibling_element(sibling_element);
            }
            false
        }
    }
}

/// Match a compound selector against a single element.
/// Spec: Section 5–8
pub fn matches_compound<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    compound: &CompoundSelector,
) -> bool {
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(adapter, element, simple))
}

fn matches_simple<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    simple: &SimpleSelector,
) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(type_name) => adapter.tag_name(element) == type_name.as_str(),
        SimpleSelector::Class(class_name) => adapter.has_class(element, class_name),
        SimpleSelector::IdSelector(id_value) => adapter
            .element_id(element)
            .is_some_and(|value| value == id_value.as_str()),
        SimpleSelector::Attribute(attr) => adapter
            .attr(element, &attr.name)
            .is_some_and(|value| matches_attr_value(attr, value)),
        SimpleSelector::Pseudo(pseudo) => matches_pseudo(adapter, element, pseudo),
    }
}

/// Compare an attribute value with the selector operator.
/// Spec: Section 6.3, 6.3.2
fn matches_attr_value(attr: &AttrSelector, actual: &str) -> bool {
    let (value, expected) = if attr.case_insensitive {
        (actual.to_lowercase(), attr.value.to_lowercase())
    } else {
        (actual.to_owned(), attr.value.clone())
    };
    match attr.operator {
        AttrOperator::Exists => true,
        AttrOperator::Equals => value == expected,
        AttrOperator::Includes => {
            !expected.is_empty() && value.split_ascii_whitespace().any(|token| token == expected)
        }
        AttrOperator::DashMatch => {
            value == expected
                || value
                    .strip_prefix(expected.as_str())
                    .is_some_and(|tail| tail.starts_with('-'))
        }
        AttrOperator::Prefix => !expected.is_empty() && value.starts_with(expected.as_str()),
        AttrOperator::Suffix => !expected.is_empty() && value.ends_with(expected.as_str()),
        AttrOperator::Substring => !expected.is_empty() && value.contains(expected.as_str()),
    }
}

fn matches_pseudo<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    pseudo: &PseudoClass,
) -> bool {
    match pseudo {
        PseudoClass::FirstChild => adapter.previous_sibling_element(element).is_none(),
        PseudoClass::LastChild => adapter.next_sibling_element(element).is_none(),
        PseudoClass::OnlyChild => {
            adapter.previous_sibling_element(element).is_none()
                && adapter.next_sibling_element(element).is_none()
        }
        PseudoClass::FirstOfType => sibling_position(adapter, element, true, false) == 1,
        PseudoClass::LastOfType => sibling_position(adapter, element, true, true) == 1,
        PseudoClass::OnlyOfType => {
            sibling_position(adapter, element, true, false) == 1
                && sibling_position(adapter, element, true, true) == 1
        }
        PseudoClass::NthChild(nth) => {
            nth_matches(*nth, sibling_position(adapter, element, false, false))
        }
        PseudoClass::NthLastChild(nth) => {
            nth_matches(*nth, sibling_position(adapter, element, false, true))
        }
        PseudoClass::NthOfType(nth) => {
            nth_matches(*nth, sibling_position(adapter, element, true, false))
        }
        PseudoClass::NthLastOfType(nth) => {
            nth_matches(*nth, sibling_position(adapter, element, true, true))
        }
        PseudoClass::Empty => !adapter.has_child_nodes(element),
        PseudoClass::Root => adapter.parent(element).is_none(),
        PseudoClass::Checked => match adapter.tag_name(element) {
            "input" => adapter.attr(element, "checked").is_some(),
            "option" => adapter.attr(element, "selected").is_some(),
            _ => false,
        },
        PseudoClass::Disabled => {
            FORM_ELEMENTS.contains(&adapter.tag_name(element))
                && adapter.attr(element, "disabled").is_some()
        }
        PseudoClass::Enabled => {
            FORM_ELEMENTS.contains(&adapter.tag_name(element))
                && adapter.attr(element, "disabled").is_none()
        }
        PseudoClass::Link => {
            matches!(adapter.tag_name(element), "a" | "area")
                && adapter.attr(element, "href").is_some()
        }
        PseudoClass::State(_) => false,
        PseudoClass::Not(list) => !matches_selector_list(adapter, element, list),
        PseudoClass::Is(list) => matches_selector_list(adapter, element, list),
    }
}

fn nth_matches(nth: Nth, position: usize) -> bool {
    i32::try_from(position).is_ok_and(|pos| nth.matches(pos))
}

/// 1-based position among element siblings, optionally counting only the same tag and
/// optionally counting from the end.
fn sibling_position<A: ElementAdapter>(
    adapter: &A,
    element: A::Handle,
    same_type: bool,
    from_end: bool,
) -> usize {
    let tag = adapter.tag_name(element);
    let step = |handle: A::Handle| {
        if from_end {
            adapter.next_sibling_element(handle)
        } else {
            adapter.previous_sibling_element(handle)
        }
    };
    let mut position = 1usize;
    let mut current = step(element);
    while let Some(sibling) = current {
        if !same_type || adapter.tag_name(sibling) == tag {
            position = position.saturating_add(1);
        }
        current = step(sibling);
    }
    position
}
