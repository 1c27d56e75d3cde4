#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use core::time::Duration;
use std::rc::Rc;

use dom::{Document, DomAccess as _, DomMutation as _, NodeKey};
use extended_css::{ExtCssConfiguration, ExtendedCss, InputEvent, ManualClock};

const PAGE: &str = r#"
    <html><body>
      <div id="feed"><div class="post">old news</div></div>
    </body></html>
"#;

struct Fixture {
    document: Document,
    feed: NodeKey,
    clock: Rc<ManualClock>,
    engine: ExtendedCss,
}

fn fixture() -> Result<Fixture, Box<dyn Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::parse_html(PAGE)?;
    let feed = document.get_element_by_id("feed").ok_or("missing #feed")?;
    let clock = Rc::new(ManualClock::new());
    let mut engine = ExtendedCss::new(
        ExtCssConfiguration::new()
            .with_css_rules([".post:contains(fresh) { color: red }"])
            .with_clock(Rc::<ManualClock>::clone(&clock)),
    )?;
    engine.apply(&mut document);
    Ok(Fixture {
        document,
        feed,
        clock,
        engine,
    })
}

fn add_post(fixture: &mut Fixture, text: &str) -> Result<NodeKey, Box<dyn Error>> {
    let post = fixture
        .document
        .append_element(fixture.feed, "div", &[("class", "post")])?;
    fixture.document.append_text(post, text)?;
    Ok(post)
}

/// Deliver pending changes and run the pass they schedule.
fn settle(fixture: &mut Fixture) -> Result<(), Box<dyn Error>> {
    fixture.engine.process_mutations(&mut fixture.document);
    fixture.clock.advance(Duration::from_millis(200));
    if fixture.engine.run_scheduled(&mut fixture.document) {
        Ok(())
    } else {
        Err("no pass was due".into())
    }
}

#[test]
fn a_burst_of_changes_runs_one_pass() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    fixture.clock.set(Duration::from_millis(10));
    let post = add_post(&mut fixture, "fresh news")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert_eq!(fixture.engine.next_deadline(), Some(Duration::from_millis(150)));

    fixture.clock.set(Duration::from_millis(50));
    let later = add_post(&mut fixture, "more fresh news")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert_eq!(fixture.engine.next_deadline(), Some(Duration::from_millis(150)));

    fixture.clock.set(Duration::from_millis(100));
    assert!(!fixture.engine.run_scheduled(&mut fixture.document));
    assert_eq!(fixture.document.attribute(post, "style"), None);

    fixture.clock.set(Duration::from_millis(150));
    assert!(fixture.engine.run_scheduled(&mut fixture.document));
    assert!(!fixture.engine.run_scheduled(&mut fixture.document));
    assert_eq!(fixture.engine.next_deadline(), None);
    for element in [post, later] {
        assert_eq!(
            fixture.document.attribute(element, "style").as_deref(),
            Some("color: red !important;")
        );
    }
    Ok(())
}

#[test]
fn a_change_long_after_the_last_pass_is_due_immediately() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    fixture.clock.set(Duration::from_secs(5));
    add_post(&mut fixture, "fresh")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert_eq!(fixture.engine.next_deadline(), Some(Duration::from_secs(5)));
    assert!(fixture.engine.run_scheduled(&mut fixture.document));
    Ok(())
}

#[test]
fn elements_that_stop_matching_are_reverted() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    let post = add_post(&mut fixture, "fresh news")?;
    settle(&mut fixture)?;
    assert_eq!(fixture.engine.affected_elements().len(), 1);

    fixture.clock.advance(Duration::from_millis(500));
    fixture.document.set_attribute(post, "class", "story")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert!(fixture.engine.run_scheduled(&mut fixture.document));
    assert_eq!(fixture.document.attribute(post, "style"), None);
    assert!(fixture.engine.affected_elements().is_empty());
    Ok(())
}

#[test]
fn attribute_churn_right_after_hover_is_ignored() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    let post = add_post(&mut fixture, "old")?;
    settle(&mut fixture)?;

    fixture.clock.set(Duration::from_secs(1));
    fixture.engine.record_event(&InputEvent::trusted("mouseover"));
    fixture.clock.advance(Duration::from_millis(5));
    fixture.document.set_attribute(post, "class", "post hovered")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert_eq!(fixture.engine.next_deadline(), None);

    fixture.clock.advance(Duration::from_millis(20));
    fixture.document.set_attribute(post, "class", "post")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert!(fixture.engine.next_deadline().is_some());
    Ok(())
}

#[test]
fn untrusted_or_non_hover_events_do_not_suppress_changes() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    let post = add_post(&mut fixture, "old")?;
    settle(&mut fixture)?;

    fixture.engine.record_event(&InputEvent::untrusted("mouseover"));
    fixture.document.set_attribute(post, "id", "changed")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert!(fixture.engine.next_deadline().is_some());

    fixture.clock.advance(Duration::from_secs(1));
    assert!(fixture.engine.run_scheduled(&mut fixture.document));
    fixture.engine.record_event(&InputEvent::trusted("click"));
    fixture.document.set_attribute(post, "id", "changed-again")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert!(fixture.engine.next_deadline().is_some());
    Ok(())
}

#[test]
fn a_disposed_engine_schedules_nothing() -> Result<(), Box<dyn Error>> {
    let mut fixture = fixture()?;
    fixture.engine.dispose(&mut fixture.document);
    let post = add_post(&mut fixture, "fresh news")?;
    fixture.engine.process_mutations(&mut fixture.document);
    assert_eq!(fixture.engine.next_deadline(), None);
    assert!(!fixture.engine.run_scheduled(&mut fixture.document));
    assert_eq!(fixture.document.attribute(post, "style"), None);
    assert_eq!(fixture.document.observer_count(), 0);
    Ok(())
}
