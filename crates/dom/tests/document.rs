#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use dom::{
    Document, DomAccess as _, DomMutation as _, HostError, MutationKind, MutationSource as _,
    NodeKey, ObserveOptions, PropertyValue, PseudoElement,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample() -> Result<Document, Box<dyn Error>> {
    let html = r#"
        <html><body>
          <section id="feed">
            <div class="post" id="first"><p>Hello <b>world</b></p></div>
            <div class="post sponsored" id="second"><p>Buy &amp; save</p><span>ad</span></div>
            <p id="tail">last</p>
          </section>
          <input type="checkbox" checked>
          <script>if (a < b) { document.write("<div>") }</script>
        </body></html>
    "#;
    Ok(Document::parse_html(html)?)
}

fn by_id(document: &Document, id: &str) -> Result<NodeKey, Box<dyn Error>> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| format!("missing #{id}").into())
}

#[test]
fn markup_builds_elements_text_and_raw_text() -> Result<(), Box<dyn Error>> {
    init_logging();
    let document = sample()?;
    let second = by_id(&document, "second")?;
    assert_eq!(document.tag_name(second).as_deref(), Some("div"));
    assert_eq!(document.attribute(second, "CLASS").as_deref(), Some("post sponsored"));
    assert_eq!(document.text_content(second), "Buy & savead");

    let script = document.query_selector("script")?.ok_or("missing script")?;
    assert!(document.text_content(script).contains("document.write(\"<div>\")"));
    assert_eq!(document.select("div")?.len(), 2);

    let input = document.query_selector("input")?.ok_or("missing input")?;
    assert_eq!(document.attribute(input, "checked").as_deref(), Some(""));
    assert!(document.element_children(input).is_empty());
    Ok(())
}

#[test]
fn malformed_markup_is_repaired() -> Result<(), Box<dyn Error>> {
    init_logging();
    let document = Document::parse_html("<p>one<p>two &amp; <b>three</b><!-- note --> four")?;
    assert_eq!(document.select("html > head")?.len(), 1);
    let body = document.query_selector("body")?.ok_or("missing body")?;
    let paragraphs = document.select("p")?;
    assert_eq!(document.element_children(body), paragraphs);
    let second = *paragraphs.last().ok_or("missing paragraph")?;
    assert_eq!(document.text_content(second), "two & three four");
    assert_eq!(document.evaluate_xpath(second, "text()")?.len(), 2);

    let unterminated = Document::parse_html("<div id=\"open\">text<div class=\"x")?;
    assert_eq!(unterminated.select("div")?.len(), 1);
    assert!(unterminated.get_element_by_id("open").is_some());
    assert_eq!(Document::parse_html("<!-- open")?.select("body")?.len(), 1);
    Ok(())
}

#[test]
fn standard_queries_use_document_order() -> Result<(), Box<dyn Error>> {
    let document = sample()?;
    let feed = by_id(&document, "feed")?;
    let found = document.query_selector_all(feed, "p, .post")?;
    let ids: Vec<Option<String>> = found
        .iter()
        .map(|&node| document.attribute(node, "id"))
        .collect();
    assert_eq!(
        ids,
        vec![
            Some("first".to_owned()),
            None,
            Some("second".to_owned()),
            None,
            Some("tail".to_owned()),
        ]
    );
    let second = by_id(&document, "second")?;
    assert!(document.matches_selector(second, "section > .sponsored:nth-child(2)")?);
    assert!(matches!(
        document.query_selector_all(feed, "div >"),
        Err(HostError::InvalidSelector(_))
    ));
    Ok(())
}

#[test]
fn observers_receive_shaped_records() -> Result<(), Box<dyn Error>> {
    let mut document = sample()?;
    let feed = by_id(&document, "feed")?;
    let first = by_id(&document, "first")?;
    let everything = document.observe(
        NodeKey::ROOT,
        ObserveOptions {
            child_list: true,
            subtree: true,
            attributes: true,
            attribute_old_value: true,
            ..ObserveOptions::default()
        },
    );
    let ids_only = document.observe(
        feed,
        ObserveOptions {
            subtree: true,
            attributes: true,
            attribute_filter: Some(vec!["id".to_owned()]),
            ..ObserveOptions::default()
        },
    );

    document.set_attribute(first, "style", "color: red")?;
    document.set_attribute(first, "id", "renamed")?;
    document.remove_attribute(first, "missing")?;
    let added = document.append_element(feed, "aside", &[])?;

    let records = document.take_records(everything);
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.first().map(|record| &record.kind),
        Some(&MutationKind::Attributes {
            name: "style".to_owned(),
            old_value: None,
        })
    );
    assert_eq!(
        records.get(1).map(|record| &record.kind),
        Some(&MutationKind::Attributes {
            name: "id".to_owned(),
            old_value: Some("first".to_owned()),
        })
    );
    assert_eq!(
        records.get(2).map(|record| &record.kind),
        Some(&MutationKind::ChildList {
            added: vec![added],
            removed: Vec::new(),
        })
    );

    let filtered = document.take_records(ids_only);
    assert_eq!(filtered.len(), 1);
    assert_eq!(
        filtered.first().map(|record| &record.kind),
        Some(&MutationKind::Attributes {
            name: "id".to_owned(),
            old_value: None,
        })
    );

    document.disconnect(everything);
    document.disconnect(ids_only);
    assert_eq!(document.observer_count(), 0);
    Ok(())
}

#[test]
fn removed_nodes_can_be_reinserted() -> Result<(), Box<dyn Error>> {
    let mut document = sample()?;
    let feed = by_id(&document, "feed")?;
    let second = by_id(&document, "second")?;
    document.remove_node(second)?;
    assert!(!document.is_connected(second));
    assert!(document.get_element_by_id("second").is_none());

    document.append_child(feed, second)?;
    assert!(document.is_connected(second));
    assert_eq!(document.element_children(feed).last(), Some(&second));
    assert!(document.remove_node(NodeKey::ROOT).is_err());
    assert!(document.append_child(second, feed).is_err());
    Ok(())
}

#[test]
fn computed_style_follows_the_cascade() -> Result<(), Box<dyn Error>> {
    let mut document = sample()?;
    document.add_stylesheet(
        r#"
        /* feed styling */
        .post { display: flex; color: blue }
        #second { display: grid }
        div.post { display: none !important }
        section { color: green; background-color: white }
        #first::before { content: "AD" }
        #first:after { content: 'x' }
        "#,
    )?;
    let first = by_id(&document, "first")?;
    let tail = by_id(&document, "tail")?;
    document.set_attribute(first, "style", "display: block; color: red !important")?;

    assert_eq!(
        document.computed_style_value(first, None, "display").as_deref(),
        Some("none")
    );
    assert_eq!(document.computed_style_value(first, None, "color").as_deref(), Some("red"));
    assert_eq!(document.computed_style_value(tail, None, "color").as_deref(), Some("green"));
    assert_eq!(
        document.computed_style_value(tail, None, "background-color").as_deref(),
        Some("rgba(0, 0, 0, 0)")
    );
    assert_eq!(
        document
            .computed_style_value(first, Some(PseudoElement::Before), "content")
            .as_deref(),
        Some("\"AD\"")
    );
    assert_eq!(
        document
            .computed_style_value(first, Some(PseudoElement::After), "content")
            .as_deref(),
        Some("'x'")
    );
    assert_eq!(
        document
            .computed_style_value(tail, Some(PseudoElement::Before), "content")
            .as_deref(),
        Some("none")
    );
    assert_eq!(
        document.computed_style_value(tail, None, "display").as_deref(),
        Some("block")
    );
    assert!(document.computed_style_value(NodeKey::ROOT, None, "display").is_none());
    Ok(())
}

#[test]
fn author_strings_may_contain_braces() -> Result<(), Box<dyn Error>> {
    let mut document = sample()?;
    document.add_stylesheet(
        "div::after { content: \"}\" } #tail:before { content: '{ x }'; color: red }",
    )?;
    let first = by_id(&document, "first")?;
    let tail = by_id(&document, "tail")?;
    assert_eq!(
        document
            .computed_style_value(first, Some(PseudoElement::After), "content")
            .as_deref(),
        Some("\"}\"")
    );
    assert_eq!(
        document
            .computed_style_value(tail, Some(PseudoElement::Before), "content")
            .as_deref(),
        Some("'{ x }'")
    );
    assert_eq!(
        document
            .computed_style_value(tail, Some(PseudoElement::Before), "color")
            .as_deref(),
        Some("red")
    );

    assert!(document.add_stylesheet("div { color: red").is_err());
    assert!(document.add_stylesheet("div { color: red } }").is_err());
    assert!(document.add_stylesheet("div").is_err());
    Ok(())
}

#[test]
fn element_properties_include_expandos() -> Result<(), Box<dyn Error>> {
    let mut document = sample()?;
    let first = by_id(&document, "first")?;
    document.set_property(first, "adSlot", PropertyValue::Number(3.0))?;
    let properties = document.element_properties(first);
    assert_eq!(
        properties.get("tagName"),
        Some(&PropertyValue::String("DIV".to_owned()))
    );
    assert_eq!(
        properties.get("adSlot").map(ToString::to_string).as_deref(),
        Some("3")
    );
    assert!(document.set_property(NodeKey::ROOT, "x", PropertyValue::Null).is_err());
    Ok(())
}

#[test]
fn xpath_paths_predicates_and_functions() -> Result<(), Box<dyn Error>> {
    let document = sample()?;
    let feed = by_id(&document, "feed")?;
    let first = by_id(&document, "first")?;
    let second = by_id(&document, "second")?;
    let tail = by_id(&document, "tail")?;

    assert_eq!(
        document.evaluate_xpath(NodeKey::ROOT, "//div[@id='second']")?,
        vec![second]
    );
    assert_eq!(
        document.evaluate_xpath(NodeKey::ROOT, "//div[contains(., 'save')]")?,
        vec![second]
    );
    assert_eq!(
        document.evaluate_xpath(first, "following-sibling::*[last()]")?,
        vec![tail]
    );
    assert_eq!(document.evaluate_xpath(tail, "preceding-sibling::div[1]")?, vec![second]);
    assert_eq!(document.evaluate_xpath(first, "../..")?.len(), 1);
    assert_eq!(document.evaluate_xpath(first, "ancestor::section")?, vec![feed]);
    assert_eq!(
        document.evaluate_xpath(feed, "div[count(p) = 1 and not(span)]")?,
        vec![first]
    );
    assert_eq!(
        document.evaluate_xpath(feed, "p | div[starts-with(@class, 'post ')]")?,
        vec![second, tail]
    );
    let texts = document.evaluate_xpath(first, ".//text()")?;
    assert_eq!(texts.len(), 2);
    assert!(texts.iter().all(|&node| !document.is_element(node)));
    assert_eq!(
        document.evaluate_xpath(NodeKey::ROOT, "//*[@id][position() = 2]")?.len(),
        1
    );
    Ok(())
}

#[test]
fn xpath_rejects_bad_expressions() -> Result<(), Box<dyn Error>> {
    let document = sample()?;
    for expression in ["", "//div[", "count(//div)", "//@id/div", "'open", "foo::div"] {
        assert!(
            matches!(
                document.evaluate_xpath(NodeKey::ROOT, expression),
                Err(HostError::InvalidXPath(_))
            ),
            "{expression} should be rejected"
        );
    }
    assert!(matches!(
        document.evaluate_xpath(NodeKey(9999), "."),
        Err(HostError::UnknownNode(_))
    ));
    Ok(())
}

#[test]
fn element_path_and_snapshot() -> Result<(), Box<dyn Error>> {
    let document = sample()?;
    let second = by_id(&document, "second")?;
    assert_eq!(
        document.element_path(second),
        "html > body:nth-child(2) > section:nth-child(1) > div:nth-child(2)"
    );
    let snapshot = document.to_json_value(second);
    assert_eq!(snapshot["attrs"]["id"], "second");
    assert_eq!(snapshot["children"][0]["tag"], "p");
    assert!(document.to_json_string().contains("\"post sponsored\""));
    assert!(format!("{document:?}").contains("<section id=\"feed\">"));
    Ok(())
}
