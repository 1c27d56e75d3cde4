//! Filtering pseudo-classes: each reads one thing from the host and tests it.

use css_ext_selector::{
    ChainSegment, CssPseudoElement, MatchesAttr, MatchesCss, MatchesProperty, TextMatcher,
    ValuePattern,
};
use dom::{DomAccess, NodeKey, PropertyValue, PseudoElement};
use indexmap::IndexMap;

pub(crate) fn contains<H: DomAccess + ?Sized>(
    host: &H,
    element: NodeKey,
    matcher: &TextMatcher,
) -> bool {
    matcher.is_match(&host.text_content(element))
}

pub(crate) fn matches_css<H: DomAccess + ?Sized>(
    host: &H,
    element: NodeKey,
    matches: &MatchesCss,
) -> bool {
    let pseudo = matches.pseudo_element.map(|pseudo| match pseudo {
        CssPseudoElement::Before => PseudoElement::Before,
        CssPseudoElement::After => PseudoElement::After,
    });
    host.computed_style_value(element, pseudo, &matches.property)
        .is_some_and(|value| matches.value.is_match(&value))
}

pub(crate) fn matches_attr<H: DomAccess + ?Sized>(
    host: &H,
    element: NodeKey,
    matches: &MatchesAttr,
) -> bool {
    host.attributes(element).iter().any(|(name, value)| {
        matches.name.is_match(name)
            && matches
                .value
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(value))
    })
}

pub(crate) fn matches_property<H: DomAccess + ?Sized>(
    host: &H,
    element: NodeKey,
    matches: &MatchesProperty,
) -> bool {
    chain_matches(
        &host.element_properties(element),
        &matches.chain,
        matches.value.as_ref(),
    )
}

/// Walk `chain` through nested objects. A regex segment may select several keys; any branch
/// that reaches the end with a matching value wins.
fn chain_matches(
    object: &IndexMap<String, PropertyValue>,
    chain: &[ChainSegment],
    value: Option<&ValuePattern>,
) -> bool {
    let Some((segment, rest)) = chain.split_first() else {
        return false;
    };
    object
        .iter()
        .filter(|(key, _)| segment.is_match(key))
        .any(|(_, property)| {
            if rest.is_empty() {
                return value.is_none_or(|pattern| pattern.is_match(&property.to_string()));
            }
            match property {
                PropertyValue::Object(inner) => chain_matches(inner, rest, value),
                PropertyValue::Undefined
                | PropertyValue::Null
                | PropertyValue::Bool(_)
                | PropertyValue::Number(_)
                | PropertyValue::String(_) => false,
            }
        })
}
