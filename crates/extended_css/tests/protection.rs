#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use core::time::Duration;
use std::rc::Rc;

use dom::{Document, DomAccess as _, DomMutation as _, NodeKey};
use extended_css::{
    DEFAULT_PROTECTION_CAP, EngineSettings, ExtCssConfiguration, ExtendedCss,
    ManualClock,
};

const PAGE: &str = r#"
    <html><body>
      <div id="target" class="ad">promoted</div>
      <aside id="promo">Sponsored</aside>
    </body></html>
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn page() -> Result<(Document, NodeKey), Box<dyn Error>> {
    init_logging();
    let document = Document::parse_html(PAGE)?;
    let target = document.get_element_by_id("target").ok_or("missing #target")?;
    Ok((document, target))
}

#[test]
fn protection_stops_after_the_cap() -> Result<(), Box<dyn Error>> {
    let (mut document, target) = page()?;
    let mut engine =
        ExtendedCss::new(ExtCssConfiguration::new().with_style_sheet("#target { color: red }"))?;
    engine.apply(&mut document);

    let mut restored = 0usize;
    for _ in 0..60 {
        document.remove_attribute(target, "style")?;
        engine.process_mutations(&mut document);
        if document.attribute(target, "style").is_some() {
            restored += 1;
        }
    }

    assert_eq!(restored, DEFAULT_PROTECTION_CAP);
    assert_eq!(engine.restorations(target), DEFAULT_PROTECTION_CAP);
    assert!(!engine.is_protected(target));
    assert_eq!(document.attribute(target, "style"), None);
    assert_eq!(engine.next_deadline(), None);
    Ok(())
}

#[test]
fn restoration_keeps_unrelated_declarations() -> Result<(), Box<dyn Error>> {
    let (mut document, target) = page()?;
    let mut engine =
        ExtendedCss::new(ExtCssConfiguration::new().with_style_sheet(".ad { color: red }"))?;
    engine.apply(&mut document);

    document.set_attribute(target, "style", "color: blue; margin: 0")?;
    engine.process_mutations(&mut document);
    assert_eq!(
        document.attribute(target, "style").as_deref(),
        Some("color: red !important; margin: 0;")
    );
    assert_eq!(engine.restorations(target), 1);

    document.set_attribute(target, "style", "padding: 1px; color: red !important")?;
    engine.process_mutations(&mut document);
    assert_eq!(
        document.attribute(target, "style").as_deref(),
        Some("padding: 1px; color: red !important")
    );
    assert_eq!(engine.restorations(target), 1);
    assert!(engine.is_protected(target));
    Ok(())
}

#[test]
fn overlapping_rules_share_one_protector() -> Result<(), Box<dyn Error>> {
    let (mut document, target) = page()?;
    let clock = Rc::new(ManualClock::new());
    let mut engine = ExtendedCss::new(
        ExtCssConfiguration::new()
            .with_style_sheet("div { color: red } .ad { color: blue; opacity: 0.5 }")
            .with_clock(Rc::<ManualClock>::clone(&clock)),
    )?;
    engine.apply(&mut document);
    let merged = Some("color: blue !important; opacity: 0.5 !important;");
    assert_eq!(document.attribute(target, "style").as_deref(), merged);
    assert_eq!(engine.affected_elements().len(), 2);
    assert_eq!(document.observer_count(), 2);

    for _ in 0..5 {
        engine.process_mutations(&mut document);
    }
    assert_eq!(engine.restorations(target), 0);
    assert_eq!(document.attribute(target, "style").as_deref(), merged);
    assert_eq!(engine.next_deadline(), None);

    // Dropping the class leaves the `div` rule in charge of the color.
    document.set_attribute(target, "class", "plain")?;
    engine.process_mutations(&mut document);
    clock.advance(Duration::from_millis(200));
    assert!(engine.run_scheduled(&mut document));
    assert_eq!(
        document.attribute(target, "style").as_deref(),
        Some("color: red !important;")
    );
    engine.process_mutations(&mut document);
    assert_eq!(engine.restorations(target), 0);
    assert!(engine.is_protected(target));

    engine.dispose(&mut document);
    assert_eq!(document.attribute(target, "style"), None);
    assert_eq!(document.observer_count(), 0);
    Ok(())
}

#[test]
fn reinserted_elements_are_removed_until_the_cap() -> Result<(), Box<dyn Error>> {
    let (mut document, _) = page()?;
    let promo = document.get_element_by_id("promo").ok_or("missing #promo")?;
    let body = document.query_selector("body")?.ok_or("missing body")?;
    let clock = Rc::new(ManualClock::new());
    let mut engine = ExtendedCss::new(
        ExtCssConfiguration::new()
            .with_style_sheet("aside:contains(Sponsored) { remove: true }")
            .with_settings(EngineSettings::new(Duration::from_millis(150), 3))
            .with_clock(Rc::<ManualClock>::clone(&clock)),
    )?;

    engine.apply(&mut document);
    assert!(!document.is_connected(promo));

    let mut still_removed = Vec::new();
    for _ in 0..3 {
        document.append_child(body, promo)?;
        engine.process_mutations(&mut document);
        clock.advance(Duration::from_millis(200));
        assert!(engine.run_scheduled(&mut document));
        still_removed.push(!document.is_connected(promo));
    }
    assert_eq!(still_removed, vec![true, true, false]);
    Ok(())
}
