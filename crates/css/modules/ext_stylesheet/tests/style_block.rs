#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use css_ext_stylesheet::{DebugMode, StyleBlockErrorKind, parse_style_block};

fn error_kind(body: &str) -> Option<StyleBlockErrorKind> {
    parse_style_block(body).err().map(|err| err.kind)
}

#[test]
fn declarations_keep_raw_values() -> Result<(), Box<dyn Error>> {
    let block = parse_style_block(
        "color: red; background: url(\"a;b.png\") no-repeat; content: 'x;y'; margin: 0 auto",
    )?;
    let pairs: Vec<(&str, &str)> = block
        .styles
        .iter()
        .map(|(property, value)| (property.as_str(), value.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("color", "red"),
            ("background", "url(\"a;b.png\") no-repeat"),
            ("content", "'x;y'"),
            ("margin", "0 auto"),
        ]
    );
    assert_eq!(block.debug, DebugMode::Off);
    assert!(!block.remove);
    Ok(())
}

#[test]
fn important_is_stripped_and_names_are_lowercased() -> Result<(), Box<dyn Error>> {
    let block = parse_style_block("COLOR: Red !important;; --Accent: Blue")?;
    assert_eq!(block.styles.get("color").map(String::as_str), Some("Red"));
    assert_eq!(block.styles.get("--Accent").map(String::as_str), Some("Blue"));
    Ok(())
}

#[test]
fn later_duplicates_overwrite_in_place() -> Result<(), Box<dyn Error>> {
    let block = parse_style_block("color: red; margin: 0; color: blue;")?;
    let keys: Vec<&str> = block.styles.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["color", "margin"]);
    assert_eq!(block.styles.get("color").map(String::as_str), Some("blue"));
    Ok(())
}

#[test]
fn debug_and_remove_become_metadata() -> Result<(), Box<dyn Error>> {
    let debug = parse_style_block("display: none; debug: true")?;
    assert_eq!(debug.debug, DebugMode::On);
    assert_eq!(debug.styles.len(), 1);

    let global = parse_style_block("debug: global")?;
    assert_eq!(global.debug, DebugMode::Global);
    assert!(global.styles.is_empty());

    let remove = parse_style_block("remove: true; debug: true")?;
    assert!(remove.remove);
    assert!(remove.styles.is_empty());

    assert_eq!(
        error_kind("debug: yes"),
        Some(StyleBlockErrorKind::InvalidDebugValue("yes".to_owned()))
    );
    assert_eq!(
        error_kind("remove: false"),
        Some(StyleBlockErrorKind::InvalidRemoveValue("false".to_owned()))
    );
    assert_eq!(
        error_kind("remove: true; color: red"),
        Some(StyleBlockErrorKind::RemoveWithStyles)
    );
    Ok(())
}

#[test]
fn malformed_blocks() {
    assert_eq!(
        error_kind("color red"),
        Some(StyleBlockErrorKind::MissingColon("color".to_owned()))
    );
    assert_eq!(
        error_kind("color;"),
        Some(StyleBlockErrorKind::MissingColon("color".to_owned()))
    );
    assert_eq!(
        error_kind("color:"),
        Some(StyleBlockErrorKind::MissingValue("color".to_owned()))
    );
    assert_eq!(
        error_kind("color: !important; margin: 0"),
        Some(StyleBlockErrorKind::MissingValue("color".to_owned()))
    );
    assert_eq!(error_kind("content: \"abc"), Some(StyleBlockErrorKind::UnterminatedQuote));
    assert_eq!(error_kind("color: red; /* note */"), Some(StyleBlockErrorKind::Comment));
    assert_eq!(error_kind("color: /* note */ red"), Some(StyleBlockErrorKind::Comment));
    assert_eq!(error_kind("color: red; a { b: c }"), Some(StyleBlockErrorKind::NestedBlock));
    assert_eq!(error_kind("color: { red }"), Some(StyleBlockErrorKind::NestedBlock));
    assert_eq!(
        error_kind("remove: true; remove: true"),
        Some(StyleBlockErrorKind::DuplicateRemove)
    );
}

#[test]
fn errors_report_positions() -> Result<(), Box<dyn Error>> {
    let err = parse_style_block("color: red; width").err().ok_or("expected an error")?;
    assert_eq!(err.kind, StyleBlockErrorKind::MissingColon("width".to_owned()));
    assert_eq!(err.position, 17);
    assert!(err.to_string().ends_with("at position 17"));
    Ok(())
}

#[test]
fn empty_block_is_valid() -> Result<(), Box<dyn Error>> {
    let block = parse_style_block("  ")?;
    assert!(block.styles.is_empty());
    Ok(())
}
