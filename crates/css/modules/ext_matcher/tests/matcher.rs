#![cfg(test)]
#![allow(
    clippy::missing_panics_doc,
    reason = "Assertions in tests are expected"
)]

use core::error::Error;
use css_ext_matcher::{ExtendedMatcher, select};
use css_ext_selector::{SelectorList, SimpleSelectorNode, parse_selector_list};
use dom::{Document, DomAccess as _, NodeKey, PropertyValue};
use indexmap::IndexMap;

const FEED: &str = r#"
    <html><body>
      <div id="feed">
        <div class="item" id="one"><span class="banner">ad</span><p>Sponsored content</p></div>
        <div class="item" id="two"><p><span class="banner">nested</span></p><p>abc story</p></div>
        <div class="item" id="three" data-ad-slot="top"><a href="/x">link</a></div>
      </div>
      <section id="side"><p id="deep"><b id="bold">cab</b></p></section>
    </body></html>
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn feed() -> Result<Document, Box<dyn Error>> {
    init_logging();
    Ok(Document::parse_html(FEED)?)
}

fn by_id(document: &Document, id: &str) -> Result<NodeKey, Box<dyn Error>> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| format!("missing #{id}").into())
}

fn run(document: &Document, selector: &str) -> Result<Vec<NodeKey>, Box<dyn Error>> {
    Ok(select(document, &parse_selector_list(selector)?))
}

fn ids(document: &Document, selector: &str) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(run(document, selector)?
        .into_iter()
        .map(|element| document.attribute(element, "id").unwrap_or_default())
        .collect())
}

#[test]
fn has_with_child_combinator_requires_a_direct_child() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    assert_eq!(ids(&document, "div:has(> .banner)")?, vec!["one"]);
    assert_eq!(ids(&document, "div.item:has(.banner)")?, vec!["one", "two"]);
    assert_eq!(ids(&document, "div.item:has(+ div > p)")?, vec!["one"]);
    assert_eq!(ids(&document, "div.item:not(:has(.banner))")?, vec!["three"]);
    Ok(())
}

#[test]
fn contains_literal_and_anchored_regex() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    let two_paragraphs = document.select("#two > p")?;
    let story = *two_paragraphs.get(1).ok_or("missing paragraph")?;
    let deep = by_id(&document, "deep")?;

    assert_eq!(run(&document, "p:contains(/^ab/)")?, vec![story]);
    assert_eq!(run(&document, "p:contains(ab)")?, vec![story, deep]);
    assert_eq!(run(&document, "p:has-text(/STORY/i)")?, vec![story]);
    assert!(run(&document, "p:contains(ABC)")?.is_empty());
    Ok(())
}

#[test]
fn ancestor_lookups() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    assert!(run(&document, "body:nth-ancestor(2)")?.is_empty());
    assert_eq!(ids(&document, "#bold:nth-ancestor(2)")?, vec!["side"]);
    assert_eq!(ids(&document, "b:upward(1)")?, vec!["deep"]);
    assert_eq!(ids(&document, "b:upward(section)")?, vec!["side"]);
    assert!(run(&document, "b:upward(div)")?.is_empty());
    assert_eq!(ids(&document, ".banner:upward(.item)")?, vec!["one", "two"]);
    Ok(())
}

#[test]
fn computed_style_predicates() -> Result<(), Box<dyn Error>> {
    let mut document = feed()?;
    document.add_stylesheet(
        ".item { display: flex } #three { display: none } #one::before { content: \"AD\" }",
    )?;
    assert_eq!(ids(&document, "div:matches-css(display: flex)")?, vec!["one", "two"]);
    assert_eq!(ids(&document, "div:matches-css(display: /^fl/)")?, vec!["one", "two"]);
    assert_eq!(ids(&document, "div:matches-css(display: n*e)")?, vec!["three"]);
    assert_eq!(ids(&document, "div:matches-css-before(content: /AD/)")?, vec!["one"]);
    Ok(())
}

#[test]
fn attribute_and_property_predicates() -> Result<(), Box<dyn Error>> {
    let mut document = feed()?;
    let one = by_id(&document, "one")?;
    let mut ads = IndexMap::new();
    ads.insert("enabled".to_owned(), PropertyValue::Bool(true));
    ads.insert("slots".to_owned(), PropertyValue::Number(2.0));
    let mut config = IndexMap::new();
    config.insert("ads".to_owned(), PropertyValue::Object(ads));
    document.set_property(one, "config", PropertyValue::Object(config))?;

    assert_eq!(ids(&document, r#"div:matches-attr("data-ad-*")"#)?, vec!["three"]);
    assert_eq!(ids(&document, r#"div:matches-attr("data-ad-slot"="top")"#)?, vec!["three"]);
    assert_eq!(ids(&document, r#"div:matches-attr(/^data-/="/^to/")"#)?, vec!["three"]);
    assert!(run(&document, "div:matches-attr(data-ad-slot=bottom)")?.is_empty());

    assert_eq!(ids(&document, "div:matches-property(config.ads.enabled=true)")?, vec!["one"]);
    assert_eq!(ids(&document, "div:matches-property(config.ads.slots=2)")?, vec!["one"]);
    assert_eq!(ids(&document, "div:matches-property(config.ads)")?, vec!["one"]);
    assert_eq!(ids(&document, "div:matches-property(/^conf/.ads.enabled)")?, vec!["one"]);
    assert!(run(&document, "div:matches-property(config.ads.enabled.deeper)")?.is_empty());
    assert!(run(&document, "div:matches-property(config.missing)")?.is_empty());
    assert_eq!(ids(&document, "div:matches-property(id=two)")?, vec!["two"]);
    Ok(())
}

#[test]
fn xpath_contexts() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    assert_eq!(
        run(&document, ":xpath(//div[@id='two']/p)")?,
        document.select("#two > p")?
    );
    assert_eq!(ids(&document, "#bold:xpath(../..)")?, vec!["side"]);
    assert_eq!(ids(&document, "p:xpath(..)")?, vec!["one", "two", "side"]);
    assert!(run(&document, "div:xpath(count(//p))")?.is_empty());
    Ok(())
}

#[test]
fn combinators_after_extended_steps() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    assert_eq!(ids(&document, "div:has(> .banner) + div")?, vec!["two"]);
    assert_eq!(ids(&document, "div:has(> .banner) ~ div")?, vec!["two", "three"]);
    assert_eq!(
        run(&document, "#feed > div:contains(nested) p")?,
        document.select("#two p")?
    );
    assert_eq!(
        run(&document, "p:is(:contains(abc), :contains(Sponsored))")?,
        document.select("#one > p, #two > p:last-child")?
    );
    assert_eq!(ids(&document, "div.item:remove()")?, vec!["one", "two", "three"]);
    Ok(())
}

#[test]
fn results_are_deduplicated_in_document_order() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    let expected = document.select("#two > p:last-child, #deep")?;
    assert_eq!(run(&document, "#deep, p:contains(a), #deep")?, expected);
    Ok(())
}

/// The argument list of the `:has()` that follows the first compound's type selector.
fn has_argument(list: &SelectorList) -> Result<&SelectorList, Box<dyn Error>> {
    list.selectors
        .first()
        .and_then(|selector| selector.steps.first())
        .and_then(|step| step.nodes.get(1))
        .and_then(|node| match node {
            SimpleSelectorNode::RelativeExtended(relative) => Some(&*relative.list),
            SimpleSelectorNode::Regular(_) | SimpleSelectorNode::AbsoluteExtended(_) => None,
        })
        .ok_or_else(|| "missing :has argument".into())
}

#[test]
fn relative_selection_from_a_scope() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    let list = parse_selector_list("div:has(> .banner)")?;
    let inner = has_argument(&list)?;
    let one = by_id(&document, "one")?;
    let two = by_id(&document, "two")?;
    let mut matcher = ExtendedMatcher::new(&document);
    assert_eq!(matcher.select_relative(inner, one), document.select("#one > .banner")?);
    assert!(matcher.select_relative(inner, two).is_empty());
    assert_eq!(matcher.select(&list), vec![one]);
    Ok(())
}

#[test]
fn relative_results_keep_traversal_order() -> Result<(), Box<dyn Error>> {
    let document = feed()?;
    let list = parse_selector_list("div:has(+ div, > .banner)")?;
    let inner = has_argument(&list)?;
    let one = by_id(&document, "one")?;
    let two = by_id(&document, "two")?;
    let mut matcher = ExtendedMatcher::new(&document);

    let mut expected = vec![two];
    expected.extend(document.select("#one > .banner")?);
    assert_eq!(matcher.select_relative(inner, one), expected);
    assert_eq!(matcher.select(&list), vec![one, two]);
    Ok(())
}
