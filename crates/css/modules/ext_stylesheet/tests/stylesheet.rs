#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use css_ext_selector::{SelectorCache, SelectorParseErrorKind};
use css_ext_stylesheet::{
    DebugMode, ExtCssRuleData, StyleBlockErrorKind, StylesheetErrorKind, parse_rules,
    parse_stylesheet,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn style<'rule>(rule: &'rule ExtCssRuleData, property: &str) -> Option<&'rule str> {
    rule.styles.get(property).map(String::as_str)
}

fn error_kind(text: &str) -> Option<StylesheetErrorKind> {
    let mut cache = SelectorCache::new();
    parse_stylesheet(text, &mut cache).err().map(|err| err.kind)
}

#[test]
fn rules_in_source_order() -> Result<(), Box<dyn Error>> {
    init_logging();
    let mut cache = SelectorCache::new();
    let rules = parse_stylesheet(
        "div.ad { display: none !important; }\n\nspan:contains(promo) { color: red }",
        &mut cache,
    )?;
    assert_eq!(rules.len(), 2);
    let first = rules.first().ok_or("missing rule")?;
    assert_eq!(first.selector_text, "div.ad");
    assert_eq!(style(first, "display"), Some("none"));
    let second = rules.get(1).ok_or("missing rule")?;
    assert_eq!(second.selector_text, "span:contains(promo)");
    assert!(!second.ast.is_regular());
    assert_eq!(cache.len(), 2);
    Ok(())
}

#[test]
fn identical_selectors_merge() -> Result<(), Box<dyn Error>> {
    let mut cache = SelectorCache::new();
    let rules = parse_stylesheet("sel{color:red} sel{color:blue}", &mut cache)?;
    assert_eq!(rules.len(), 1);
    let rule = rules.first().ok_or("missing rule")?;
    assert_eq!(rule.styles.len(), 1);
    assert_eq!(style(rule, "color"), Some("blue"));

    let merged = parse_stylesheet(
        "a { color: red; margin: 0 } b { color: green } a { color: blue; padding: 1px; \
         debug: true } a { debug: global }",
        &mut cache,
    )?;
    assert_eq!(merged.len(), 2);
    let rule = merged.first().ok_or("missing rule")?;
    let keys: Vec<&str> = rule.styles.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["color", "margin", "padding"]);
    assert_eq!(style(rule, "color"), Some("blue"));
    assert_eq!(rule.debug, DebugMode::Global);
    Ok(())
}

#[test]
fn braces_inside_selector_arguments() -> Result<(), Box<dyn Error>> {
    let mut cache = SelectorCache::new();
    let rules = parse_stylesheet(
        r#"div:contains(/a{2}/) { color: red } p:matches-attr("data-x"="{") { color: blue }"#,
        &mut cache,
    )?;
    let selectors: Vec<&str> = rules.iter().map(|rule| rule.selector_text.as_str()).collect();
    assert_eq!(selectors, vec![r"div:contains(/a{2}/)", r#"p:matches-attr("data-x"="{")"#]);
    Ok(())
}

#[test]
fn first_failure_is_reported() {
    assert!(matches!(
        error_kind("div:contains(x { color: red }"),
        Some(StylesheetErrorKind::Selector(err))
            if err.kind == SelectorParseErrorKind::UnbalancedParenthesis
    ));
    assert!(matches!(
        error_kind("a { color: red } div:bogus { color: red }"),
        Some(StylesheetErrorKind::Selector(err))
            if err.kind == SelectorParseErrorKind::UnknownPseudoClass("bogus".to_owned())
    ));
    assert!(matches!(
        error_kind("/* ads */ a { color: red }"),
        Some(StylesheetErrorKind::Selector(err)) if err.kind == SelectorParseErrorKind::Comment
    ));
    assert!(matches!(
        error_kind("@media print { a { color: red } }"),
        Some(StylesheetErrorKind::Selector(err)) if err.kind == SelectorParseErrorKind::AtRule
    ));
    assert!(matches!(
        error_kind("a { color red }"),
        Some(StylesheetErrorKind::Block(err))
            if err.kind == StyleBlockErrorKind::MissingColon("color".to_owned())
    ));
    assert_eq!(error_kind("a { color: red"), Some(StylesheetErrorKind::UnclosedBlock));
    assert_eq!(error_kind("a { color: red } div.ad"), Some(StylesheetErrorKind::MissingBlock));
}

#[test]
fn remove_rules() -> Result<(), Box<dyn Error>> {
    let mut cache = SelectorCache::new();
    let rules = parse_stylesheet(
        "a { color: red }\nb { remove: true }\ndiv.ad:remove(), span:has(i):remove()",
        &mut cache,
    )?;
    let flags: Vec<bool> = rules.iter().map(|rule| rule.should_remove).collect();
    assert_eq!(flags, vec![false, true, true]);
    assert!(rules.iter().filter(|rule| rule.should_remove).all(|rule| rule.styles.is_empty()));

    assert_eq!(
        error_kind("div:remove() { color: red }"),
        Some(StylesheetErrorKind::RemoveConflict)
    );
    assert_eq!(
        error_kind("a { remove: true } a { color: red }"),
        Some(StylesheetErrorKind::RemoveConflict)
    );
    assert!(matches!(
        error_kind("a { remove: true; color: red }"),
        Some(StylesheetErrorKind::Block(err)) if err.kind == StyleBlockErrorKind::RemoveWithStyles
    ));
    assert!(matches!(
        error_kind("div { remove: true; remove: true; }"),
        Some(StylesheetErrorKind::Block(err)) if err.kind == StyleBlockErrorKind::DuplicateRemove
    ));
    Ok(())
}

#[test]
fn legacy_selectors_are_accepted() -> Result<(), Box<dyn Error>> {
    let mut cache = SelectorCache::new();
    let rules = parse_stylesheet(r#"div[-ext-has=".banner"] { display: none }"#, &mut cache)?;
    let rule = rules.first().ok_or("missing rule")?;
    assert_eq!(rule.selector_text, r#"div[-ext-has=".banner"]"#);
    assert_eq!(rule.ast.to_string(), "div:has(.banner)");
    Ok(())
}

#[test]
fn rule_list_is_fail_soft() {
    init_logging();
    let mut cache = SelectorCache::new();
    let parsed = parse_rules(
        &[
            "a { color: red }",
            "b:bogus { color: red }",
            "a { color: blue }",
            "c:remove()",
            "f { remove: true }",
            "f { color: red }",
            "g.plain",
            "d { width: 1px } e { height",
        ],
        &mut cache,
    );
    let selectors: Vec<&str> = parsed
        .rules
        .iter()
        .map(|rule| rule.selector_text.as_str())
        .collect();
    assert_eq!(selectors, vec!["a", "c:remove()", "f"]);
    assert_eq!(
        parsed.rules.first().and_then(|rule| style(rule, "color")),
        Some("blue")
    );
    let kinds: Vec<&StylesheetErrorKind> = parsed.errors.iter().map(|err| &err.kind).collect();
    assert_eq!(kinds.len(), 4);
    assert!(matches!(kinds.first(), Some(StylesheetErrorKind::Selector(_))));
    assert!(matches!(kinds.get(1), Some(StylesheetErrorKind::RemoveConflict)));
    assert!(matches!(kinds.get(2), Some(StylesheetErrorKind::MissingBlock)));
    assert!(matches!(kinds.get(3), Some(StylesheetErrorKind::UnclosedBlock)));
    let rendered = parsed
        .errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default();
    assert!(rendered.contains("b:bogus"));
}
