//! Computed style for the in-memory document.
//! Spec: <https://www.w3.org/TR/css-cascade-4/#cascade-sort>
//!
//! Author rules are ordered by importance, origin (inline beats author), specificity and source
//! order. Inherited properties fall back to the parent; everything else falls back to a small
//! table of initial values.

use crate::document::Document;
use crate::{DomAccess, NodeKey, PseudoElement};
use anyhow::{Context as _, Result, anyhow, bail};
use core::mem;
use css_selectors::{
    ComplexSelector, ElementAdapter, Specificity, matches_complex, parse_complex_selector,
    specificity_of_complex, split_top_level,
};
use css_style_attr::{Declaration, InlineStyle, parse_style_attribute};
use cssparser::{ParseError, Parser, ParserInput, Token};

/// Properties that inherit from the parent when not set.
const INHERITED: &[&str] = &[
    "color",
    "cursor",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "line-height",
    "text-align",
    "visibility",
    "white-space",
];

/// Elements rendered as blocks by the user agent sheet.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "html",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "ul",
];

/// Elements never rendered.
const HIDDEN_ELEMENTS: &[&str] = &[
    "base", "head", "link", "meta", "noscript", "script", "style", "template", "title",
];

#[derive(Debug, Clone)]
struct AuthorRule {
    selector: ComplexSelector,
    pseudo: Option<PseudoElement>,
    specificity: Specificity,
    order: usize,
    declarations: Vec<Declaration>,
}

/// Author rules registered on a document.
#[derive(Debug, Default)]
pub(crate) struct AuthorStyles {
    rules: Vec<AuthorRule>,
}

impl AuthorStyles {
    /// Parse `selector, ... { declarations }` blocks and append them.
    pub(crate) fn add(&mut self, css: &str) -> Result<()> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut prelude = String::new();
        loop {
            let at = parser.position();
            let Ok(token) = parser.next_including_whitespace_and_comments().cloned() else {
                prelude.push_str(parser.slice_from(at));
                break;
            };
            match token {
                Token::Comment(_) => {}
                Token::CloseCurlyBracket => bail!("unexpected `}}` after `{}`", prelude.trim()),
                Token::CurlyBracketBlock => {
                    let head = parser.slice_from(at);
                    prelude.push_str(head.strip_suffix('{').unwrap_or(head));
                    let body = parser
                        .parse_nested_block(|block| {
                            Ok::<String, ParseError<'_, ()>>(significant_text(block))
                        })
                        .map_err(|_| anyhow!("unreadable block after `{}`", prelude.trim()))?;
                    if !parser.slice_from(at).ends_with('}') {
                        bail!("unterminated block after `{}`", prelude.trim());
                    }
                    self.add_rule(&mem::take(&mut prelude), &body)?;
                }
                _ => prelude.push_str(parser.slice_from(at)),
            }
        }
        if !prelude.trim().is_empty() {
            bail!("trailing text without a block: `{}`", prelude.trim());
        }
        Ok(())
    }

    fn add_rule(&mut self, prelude: &str, body: &str) -> Result<()> {
        let declarations = parse_style_attribute(body);
        for (_, part) in split_top_level(prelude, ',') {
            let (selector_text, pseudo) = split_pseudo_element(part.trim());
            let selector = parse_complex_selector(selector_text)
                .with_context(|| format!("invalid selector `{}`", part.trim()))?;
            self.rules.push(AuthorRule {
                specificity: specificity_of_complex(&selector),
                selector,
                pseudo,
                order: self.rules.len(),
                declarations: declarations.clone(),
            });
        }
        Ok(())
    }
}

/// The rest of `parser` as source text, without comments.
fn significant_text(parser: &mut Parser<'_, '_>) -> String {
    let mut text = String::new();
    loop {
        let at = parser.position();
        let next = parser
            .next_including_whitespace_and_comments()
            .map(|token| matches!(token, Token::Comment(_)));
        match next {
            Ok(true) => {}
            Ok(false) => text.push_str(parser.slice_from(at)),
            Err(_) => {
                text.push_str(parser.slice_from(at));
                break;
            }
        }
    }
    text
}

/// Split a trailing `::before`/`::after` (or the legacy single-colon form) off a selector.
fn split_pseudo_element(selector: &str) -> (&str, Option<PseudoElement>) {
    let lowered = selector.to_ascii_lowercase();
    for (suffix, pseudo) in [
        ("::before", PseudoElement::Before),
        ("::after", PseudoElement::After),
        (":before", PseudoElement::Before),
        (":after", PseudoElement::After),
    ] {
        if lowered.ends_with(suffix) {
            let head = selector
                .get(..selector.len().saturating_sub(suffix.len()))
                .unwrap_or_default();
            let head_text = if head.trim().is_empty() { "*" } else { head };
            return (head_text, Some(pseudo));
        }
    }
    (selector, None)
}

/// Cascade sort key: importance, origin (0 author, 1 inline), specificity, rule order,
/// declaration order.
type CascadeKey = (bool, u8, Specificity, usize, usize);

fn consider(key: CascadeKey, value: &str, winner: &mut Option<(CascadeKey, String)>) {
    if winner.as_ref().is_none_or(|(current, _)| key > *current) {
        *winner = Some((key, value.to_owned()));
    }
}

/// The winning declared value of `property`, if any.
fn cascaded_value(
    document: &Document,
    element: NodeKey,
    pseudo: Option<PseudoElement>,
    property: &str,
) -> Option<String> {
    let mut winner: Option<(CascadeKey, String)> = None;
    for rule in &document.styles.rules {
        if rule.pseudo != pseudo || !matches_complex(document, element, &rule.selector) {
            continue;
        }
        for (index, declaration) in rule.declarations.iter().enumerate() {
            if declaration.property == property {
                let key = (
                    declaration.important,
                    0,
                    rule.specificity,
                    rule.order,
                    index,
                );
                consider(key, &declaration.value, &mut winner);
            }
        }
    }
    if pseudo.is_none() {
        let inline = InlineStyle::from_attribute(document.attr(element, "style"));
        if let Some(declaration) = inline.get(property) {
            let key = (
                declaration.important,
                1,
                Specificity::default(),
                usize::MAX,
                0,
            );
            consider(key, &declaration.value, &mut winner);
        }
    }
    winner.map(|(_, value)| value)
}

/// Computed value of `property`. `None` if `element` is not an element.
pub(crate) fn computed_value(
    document: &Document,
    element: NodeKey,
    pseudo: Option<PseudoElement>,
    property: &str,
) -> Option<String> {
    if !document.is_element(element) {
        return None;
    }
    let property_name = property.trim().to_ascii_lowercase();
    let declared = cascaded_value(document, element, pseudo, &property_name);
    match declared.as_deref() {
        Some("initial") => return Some(initial_value(document, element, pseudo, &property_name)),
        Some(value) if value != "inherit" => return Some(value.to_owned()),
        Some(_) | None => {}
    }
    let inherits = declared.is_some() || INHERITED.contains(&property_name.as_str());
    if inherits {
        // A pseudo-element inherits from its originating element.
        let parent = if pseudo.is_some() {
            Some(element)
        } else {
            document.parent_element(element)
        };
        if let Some(parent_element) = parent {
            return computed_value(document, parent_element, None, &property_name);
        }
    }
    Some(initial_value(document, element, pseudo, &property_name))
}

fn initial_value(
    document: &Document,
    element: NodeKey,
    pseudo: Option<PseudoElement>,
    property: &str,
) -> String {
    let value = match property {
        "display" if pseudo.is_some() => "inline",
        "display" => default_display(ElementAdapter::tag_name(document, element)),
        "content" if pseudo.is_some() => "none",
        "content" => "normal",
        "visibility" => "visible",
        "opacity" => "1",
        "position" => "static",
        "color" => "rgb(0, 0, 0)",
        "background-color" => "rgba(0, 0, 0, 0)",
        "background-image" => "none",
        "font-size" => "16px",
        "font-weight" => "400",
        "z-index" | "width" | "height" => "auto",
        _ => "",
    };
    value.to_owned()
}

fn default_display(tag: &str) -> &'static str {
    match tag {
        "li" => "list-item",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        _ if BLOCK_ELEMENTS.contains(&tag) => "block",
        _ if HIDDEN_ELEMENTS.contains(&tag) => "none",
        _ => "inline",
    }
}
