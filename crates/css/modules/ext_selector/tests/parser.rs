#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use css_ext_selector::{
    AbsolutePseudoClass, ChainSegment, Combinator, CssPseudoElement, RelativeKind,
    SelectorCache, SelectorList, SelectorParseErrorKind, SelectorStep, SimpleSelectorNode,
    TextMatcher, Upward, ValuePattern, convert_legacy_syntax, parse_selector_list,
};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn single_step(list: &SelectorList) -> Result<&SelectorStep, Box<dyn Error>> {
    let selector = list.selectors.first().ok_or("no selector")?;
    assert_eq!(list.selectors.len(), 1);
    assert_eq!(selector.steps.len(), 1);
    selector.steps.first().ok_or_else(|| "no step".into())
}

fn absolute(node: Option<&SimpleSelectorNode>) -> Result<&AbsolutePseudoClass, Box<dyn Error>> {
    match node {
        Some(SimpleSelectorNode::AbsoluteExtended(absolute)) => Ok(&absolute.pseudo),
        other => Err(format!("expected an absolute pseudo-class, got {other:?}").into()),
    }
}

fn error_kind(text: &str) -> Option<SelectorParseErrorKind> {
    parse_selector_list(text).err().map(|err| err.kind)
}

#[test]
fn has_with_leading_child_combinator() -> Result<(), Box<dyn Error>> {
    init_logging();
    let list = parse_selector_list("div:has(> .banner)")?;
    let step = single_step(&list)?;
    assert_eq!(step.nodes.len(), 2);
    let Some(SimpleSelectorNode::RelativeExtended(relative)) = step.nodes.get(1) else {
        return Err("expected :has".into());
    };
    assert_eq!(relative.kind, RelativeKind::Has);
    let inner = single_step(&relative.list)?;
    assert_eq!(inner.combinator, Combinator::Child);
    assert_eq!(inner.regular_text(), Some(".banner"));
    assert_eq!(list.to_string(), "div:has(> .banner)");
    Ok(())
}

#[test]
fn scope_prefix_is_stripped_in_relative_arguments() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list("div:has(:scope > p), a:-abp-has(:scope b), c:if(d)")?;
    assert_eq!(list.to_string(), "div:has(> p), a:-abp-has(b), c:if(d)");
    Ok(())
}

#[test]
fn combinators_split_steps() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list("html > body div:contains(ad) + p ~ span")?;
    let selector = list.selectors.first().ok_or("no selector")?;
    let combinators: Vec<Combinator> = selector.steps.iter().map(|step| step.combinator).collect();
    assert_eq!(
        combinators,
        vec![
            Combinator::Descendant,
            Combinator::Child,
            Combinator::Descendant,
            Combinator::NextSibling,
            Combinator::SubsequentSibling,
        ]
    );
    assert_eq!(selector.regular_prefix(), (2, "html > body".to_owned()));
    assert!(!selector.is_regular());
    Ok(())
}

#[test]
fn top_level_commas_split_but_nested_ones_do_not() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list(r#"a[title="x, y"], b:has(c, d), e:contains(f, g)"#)?;
    assert_eq!(list.selectors.len(), 3);
    Ok(())
}

#[test]
fn balanced_nesting_is_consumed_exactly() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list("div:has(p:contains((a)(b)) > span:not(:has(i)))")?;
    assert_eq!(list.to_string(), "div:has(p:contains((a)(b)) > span:not(:has(i)))");
    assert_eq!(
        error_kind("div:contains((a)"),
        Some(SelectorParseErrorKind::UnbalancedParenthesis)
    );
    assert_eq!(error_kind("div:has(p))"), Some(SelectorParseErrorKind::UnbalancedParenthesis));
    assert_eq!(error_kind("div[title"), Some(SelectorParseErrorKind::UnbalancedBracket));
    assert_eq!(error_kind("div]"), Some(SelectorParseErrorKind::UnbalancedBracket));
    assert_eq!(error_kind(r#"div[title="x]"#), Some(SelectorParseErrorKind::UnterminatedQuote));
    Ok(())
}

#[test]
fn contains_regex_and_literal() -> Result<(), Box<dyn Error>> {
    let anchored = parse_selector_list("p:contains(/^ab/)")?;
    let TextMatcher::Regex(_) = text_matcher(&anchored)? else {
        return Err("expected a regex".into());
    };
    assert!(text_matcher(&anchored)?.is_match("abc"));
    assert!(!text_matcher(&anchored)?.is_match("cab"));

    let literal = parse_selector_list("p:contains(ab)")?;
    assert!(text_matcher(&literal)?.is_match("cab"));
    assert!(!text_matcher(&literal)?.is_match("AB"));

    let flagged = parse_selector_list("p:has-text(/sponsored/i)")?;
    assert!(text_matcher(&flagged)?.is_match("SPONSORED post"));

    let regex_with_parens = parse_selector_list(r"p:-abp-contains(/a\)b/)")?;
    assert!(text_matcher(&regex_with_parens)?.is_match("xa)b"));

    let apostrophe = parse_selector_list("p:contains(it's)")?;
    assert!(text_matcher(&apostrophe)?.is_match("well it's here"));

    assert_eq!(
        error_kind("p:contains(/abc)"),
        Some(SelectorParseErrorKind::UnterminatedRegex)
    );
    Ok(())
}

fn text_matcher(list: &SelectorList) -> Result<&TextMatcher, Box<dyn Error>> {
    match absolute(single_step(list)?.nodes.get(1))? {
        AbsolutePseudoClass::Contains(matcher) => Ok(matcher),
        other => Err(format!("expected :contains, got {other:?}").into()),
    }
}

#[test]
fn matches_css_arguments() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list(r#"div:matches-css(background-image: url("ad.png"))"#)?;
    let AbsolutePseudoClass::MatchesCss(matches) = absolute(single_step(&list)?.nodes.get(1))?
    else {
        return Err("expected :matches-css".into());
    };
    assert_eq!(matches.pseudo_element, None);
    assert_eq!(matches.property, "background-image");
    assert!(matches.value.is_match("url(ad.png)"));

    let before = parse_selector_list("div:matches-css-before(content: /^AD/i)")?;
    let AbsolutePseudoClass::MatchesCss(matches) = absolute(single_step(&before)?.nodes.get(1))?
    else {
        return Err("expected :matches-css-before".into());
    };
    assert_eq!(matches.pseudo_element, Some(CssPseudoElement::Before));
    assert!(matches!(matches.value, ValuePattern::Regex(_)));
    assert!(matches.value.is_match("ad here"));
    assert!(!matches.value.is_match("\"ad here\""));

    let wildcard = parse_selector_list("div:matches-css(width: 3*px)")?;
    let AbsolutePseudoClass::MatchesCss(matches) = absolute(single_step(&wildcard)?.nodes.get(1))?
    else {
        return Err("expected :matches-css".into());
    };
    assert!(matches.value.is_match("300px"));
    assert!(!matches.value.is_match("300pt"));

    assert!(matches!(
        error_kind("div:matches-css(color)"),
        Some(SelectorParseErrorKind::InvalidPseudoArgument { .. })
    ));
    Ok(())
}

#[test]
fn matches_attr_and_property_arguments() -> Result<(), Box<dyn Error>> {
    let attr = parse_selector_list(r#"div:matches-attr("data-*"="/^ad/")"#)?;
    let AbsolutePseudoClass::MatchesAttr(matches) = absolute(single_step(&attr)?.nodes.get(1))?
    else {
        return Err("expected :matches-attr".into());
    };
    assert!(matches.name.is_match("data-slot"));
    assert!(!matches.name.is_match("id"));
    assert!(matches.value.as_ref().is_some_and(|value| value.is_match("ad-1")));

    let presence = parse_selector_list("div:matches-attr(hidden)")?;
    let AbsolutePseudoClass::MatchesAttr(matches) = absolute(single_step(&presence)?.nodes.get(1))?
    else {
        return Err("expected :matches-attr".into());
    };
    assert!(matches.value.is_none());

    let property = parse_selector_list("div:matches-property(__ad./^conf.*/.id=1)")?;
    let AbsolutePseudoClass::MatchesProperty(matches) =
        absolute(single_step(&property)?.nodes.get(1))?
    else {
        return Err("expected :matches-property".into());
    };
    assert_eq!(matches.chain.len(), 3);
    assert!(matches!(matches.chain.get(1), Some(ChainSegment::Regex(_))));
    assert!(matches.chain.get(1).is_some_and(|segment| segment.is_match("config")));
    assert!(matches.value.as_ref().is_some_and(|value| value.is_match("1")));

    for bad in [
        "div:matches-property(a..b)",
        "div:matches-property(.a)",
        "div:matches-property(/a.b)",
        "div:matches-attr(=x)",
    ] {
        assert!(
            matches!(
                error_kind(bad),
                Some(
                    SelectorParseErrorKind::InvalidPseudoArgument { .. }
                        | SelectorParseErrorKind::UnterminatedRegex
                )
            ),
            "{bad} should be rejected"
        );
    }
    Ok(())
}

#[test]
fn ancestor_lookups() -> Result<(), Box<dyn Error>> {
    let depth = parse_selector_list("a:upward(2)")?;
    assert!(matches!(
        absolute(single_step(&depth)?.nodes.get(1))?,
        AbsolutePseudoClass::Upward(Upward::Depth(2))
    ));
    let by_selector = parse_selector_list("a:upward(div.ad > section)")?;
    assert!(matches!(
        absolute(single_step(&by_selector)?.nodes.get(1))?,
        AbsolutePseudoClass::Upward(Upward::Selector(text)) if text == "div.ad > section"
    ));
    assert!(matches!(
        error_kind("a:upward(div:contains(x))"),
        Some(SelectorParseErrorKind::InvalidPseudoArgument { .. })
    ));

    let nth = parse_selector_list("a:nth-ancestor(256)")?;
    assert!(matches!(
        absolute(single_step(&nth)?.nodes.get(1))?,
        AbsolutePseudoClass::NthAncestor(256)
    ));
    for bad in ["a:nth-ancestor(0)", "a:nth-ancestor(257)", "a:nth-ancestor(x)", "a:upward(0)"] {
        assert!(
            matches!(
                error_kind(bad),
                Some(SelectorParseErrorKind::InvalidPseudoArgument { .. })
            ),
            "{bad} should be rejected"
        );
    }
    Ok(())
}

#[test]
fn xpath_argument_is_kept_verbatim() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list(r#"div:xpath(//p[@class="ad"]/../..)"#)?;
    assert!(matches!(
        absolute(single_step(&list)?.nodes.get(1))?,
        AbsolutePseudoClass::Xpath(expression) if expression == r#"//p[@class="ad"]/../.."#
    ));
    let leading = parse_selector_list(":xpath(//div)")?;
    let step = single_step(&leading)?;
    assert!(matches!(
        step.nodes.first(),
        Some(SimpleSelectorNode::Regular(regular)) if regular.text.is_empty()
    ));
    Ok(())
}

#[test]
fn standard_is_and_not_stay_regular() -> Result<(), Box<dyn Error>> {
    let plain = parse_selector_list("div:not(.a, [b]):is(p, span)")?;
    assert!(plain.is_regular());
    assert_eq!(single_step(&plain)?.regular_text(), Some("div:not(.a, [b]):is(p, span)"));

    let extended = parse_selector_list("div:not(:contains(x))")?;
    assert!(!extended.is_regular());
    assert!(matches!(
        single_step(&extended)?.nodes.get(1),
        Some(SimpleSelectorNode::RelativeExtended(relative)) if relative.kind == RelativeKind::Not
    ));
    Ok(())
}

#[test]
fn remove_placement() -> Result<(), Box<dyn Error>> {
    let list = parse_selector_list("div.ad:remove(), span:contains(x):remove()")?;
    assert!(list.should_remove());
    assert_eq!(list.to_string(), "div.ad:remove(), span:contains(x):remove()");

    for bad in [
        "div:remove() > p",
        "div:remove():remove()",
        "div:remove(), p",
        "div:has(p:remove())",
        "div:remove(x)",
        "div:remove().a",
    ] {
        assert_eq!(
            error_kind(bad),
            Some(SelectorParseErrorKind::MisplacedRemove),
            "{bad} should be rejected"
        );
    }
    Ok(())
}

#[test]
fn misplaced_combinators() {
    for bad in ["> a", "a >", "a > > b", "a, ~ b", "div:is(> a)", "div:not(+ a)", "div:has(>)"] {
        assert_eq!(
            error_kind(bad),
            Some(SelectorParseErrorKind::MisplacedCombinator),
            "{bad} should be rejected"
        );
    }
    assert!(parse_selector_list("div:has(+ .x), div:has(~ .y)").is_ok());
}

#[test]
fn invalid_input_reports_positions() -> Result<(), Box<dyn Error>> {
    let unknown = parse_selector_list("div:foo").err().ok_or("expected an error")?;
    assert_eq!(unknown.kind, SelectorParseErrorKind::UnknownPseudoClass("foo".to_owned()));
    assert_eq!(unknown.position, 3);

    let nested = parse_selector_list("div:has(p:bogus)").err().ok_or("expected an error")?;
    assert_eq!(nested.position, 9);
    assert!(nested.to_string().ends_with("at position 9"));

    assert_eq!(
        error_kind("div::before"),
        Some(SelectorParseErrorKind::PseudoElement("before".to_owned()))
    );
    assert_eq!(error_kind("div /* x */"), Some(SelectorParseErrorKind::Comment));
    assert_eq!(error_kind("@media print"), Some(SelectorParseErrorKind::AtRule));
    assert_eq!(error_kind(""), Some(SelectorParseErrorKind::Empty));
    assert_eq!(error_kind("a,"), Some(SelectorParseErrorKind::Empty));
    assert_eq!(
        error_kind("div:contains"),
        Some(SelectorParseErrorKind::MissingArgument("contains".to_owned()))
    );
    assert_eq!(
        error_kind("div { color: red }"),
        Some(SelectorParseErrorKind::UnexpectedCharacter('{'))
    );
    assert!(matches!(
        error_kind("div..a"),
        Some(SelectorParseErrorKind::InvalidStandardSelector(_))
    ));
    Ok(())
}

#[test]
fn legacy_attribute_syntax() -> Result<(), Box<dyn Error>> {
    assert_eq!(convert_legacy_syntax(r#"div[-ext-has=".banner"]"#), "div:has(.banner)");
    assert_eq!(convert_legacy_syntax(r"a[-ext-contains='it\'s']"), "a:contains(it's)");
    assert_eq!(
        convert_legacy_syntax(r#"p[-ext-matches-css="display: block"][id]"#),
        "p:matches-css(display: block)[id]"
    );
    assert_eq!(convert_legacy_syntax("div.plain"), "div.plain");

    let legacy = parse_selector_list(r#"div[-ext-has=".banner"]"#)?;
    let modern = parse_selector_list("div:has(.banner)")?;
    assert_eq!(legacy.to_string(), modern.to_string());
    Ok(())
}

#[test]
fn cache_shares_parsed_trees() -> Result<(), Box<dyn Error>> {
    let mut cache = SelectorCache::new();
    let first = cache.get_or_parse("div:contains(x)")?;
    let second = cache.get_or_parse("div:contains(x)")?;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(cache.get_or_parse("div:bogus").is_err());
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(cache.is_empty());
    Ok(())
}
