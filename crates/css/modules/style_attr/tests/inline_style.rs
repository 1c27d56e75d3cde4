#![allow(clippy::unwrap_used)]

use css_style_attr::{InlineStyle, parse_style_attribute, split_declarations};

#[test]
fn semicolons_inside_urls_and_strings_do_not_split() {
    let parts = split_declarations(r#"background: url("a;b.png"); content: 'x;y'; color: red"#);
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].trim(), r#"background: url("a;b.png")"#);
    assert_eq!(parts[1].trim(), "content: 'x;y'");
}

#[test]
fn important_is_lifted_into_a_flag() {
    let decls = parse_style_attribute("Display: none !important; color:blue");
    assert_eq!(decls.len(), 2);
    assert_eq!(decls[0].property, "display");
    assert_eq!(decls[0].value, "none");
    assert!(decls[0].important);
    assert!(!decls[1].important);
}

#[test]
fn invalid_items_are_skipped() {
    let decls = parse_style_attribute("color; : red; width: ; height: 10px");
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].property, "height");
}

#[test]
fn set_replaces_in_place_and_serializes() {
    let mut style = InlineStyle::from_attribute(Some("color: red; width: 10px"));
    style.set("color", "blue", true);
    assert_eq!(style.to_css_text(), "color: blue !important; width: 10px;");
    let removed = style.remove("width").unwrap();
    assert_eq!(removed.value, "10px");
    assert_eq!(style.declarations().len(), 1);
    assert!(InlineStyle::from_attribute(None).is_empty());
}
