//! Stylesheet splitting.
//!
//! A `{` may belong to a quoted or regex selector argument, so the selector parser decides
//! where each rule's block starts: the text before the first `{` is tried as a selector, then
//! the text before the next one, and so on. The block runs to the matching `}`.

use std::sync::Arc;

use crate::error::{StylesheetError, StylesheetErrorKind};
use crate::rule::{ExtCssRuleData, RuleSet};
use crate::style_block::{StyleBlock, parse_style_block};
use css_ext_selector::{SelectorCache, SelectorList, SelectorParseError};
use log::{debug, warn};

/// Result of the fail-soft entry point.
#[derive(Debug, Default)]
pub struct ParsedRules {
    pub rules: Vec<ExtCssRuleData>,
    /// Entries that were skipped, in input order.
    pub errors: Vec<StylesheetError>,
}

/// Parse a whole stylesheet. Rules sharing a selector are merged.
///
/// # Errors
/// Returns the first invalid rule; nothing is returned for the valid ones.
pub fn parse_stylesheet(
    text: &str,
    cache: &mut SelectorCache,
) -> Result<Vec<ExtCssRuleData>, StylesheetError> {
    let mut set = RuleSet::default();
    for (rule_text, rule) in split_rules(text, cache)? {
        set.add(rule)
            .map_err(|kind| StylesheetError::new(kind, rule_text))?;
    }
    let rules = set.into_rules();
    debug!("parsed stylesheet into {} rule(s)", rules.len());
    Ok(rules)
}

/// Parse independent rule strings. Invalid entries are skipped and reported; the rest are
/// merged as if they formed one stylesheet.
pub fn parse_rules<S: AsRef<str>>(entries: &[S], cache: &mut SelectorCache) -> ParsedRules {
    let mut set = RuleSet::default();
    let mut errors = Vec::new();
    for entry in entries {
        let split = match split_rules(entry.as_ref(), cache) {
            Ok(split) => split,
            Err(err) => {
                warn!("skipping css rule: {err}");
                errors.push(err);
                continue;
            }
        };
        for (rule_text, rule) in split {
            if let Err(kind) = set.add(rule) {
                let err = StylesheetError::new(kind, rule_text);
                warn!("skipping css rule: {err}");
                errors.push(err);
            }
        }
    }
    let rules = set.into_rules();
    debug!("parsed {} rule(s), skipped {}", rules.len(), errors.len());
    ParsedRules { rules, errors }
}

/// Split `text` into rules without merging. Each rule comes with its source text.
fn split_rules<'text>(
    text: &'text str,
    cache: &mut SelectorCache,
) -> Result<Vec<(&'text str, ExtCssRuleData)>, StylesheetError> {
    let mut rules = Vec::new();
    let mut start = 0usize;
    while let Some(rest) = text.get(start..)
        && !rest.trim().is_empty()
    {
        let (selector_text, ast, open) = match find_selector(rest, cache) {
            Ok(found) => found,
            Err(SelectorSearch::NoBlock) => {
                rules.push((rest, trailing_remove_rule(rest, cache)?));
                break;
            }
            Err(SelectorSearch::Invalid(err, attempted)) => {
                return Err(StylesheetError::new(
                    StylesheetErrorKind::Selector(err),
                    attempted,
                ));
            }
        };
        let body_start = open.saturating_add(1);
        let Some(close) = find_block_end(rest, body_start) else {
            return Err(StylesheetError::new(StylesheetErrorKind::UnclosedBlock, rest));
        };
        let rule_text = rest.get(..=close).unwrap_or(rest);
        let body = rest.get(body_start..close).unwrap_or_default();
        let block = parse_style_block(body)
            .map_err(|err| StylesheetError::new(StylesheetErrorKind::Block(err), rule_text))?;
        let rule = ExtCssRuleData::new(selector_text, ast, block)
            .map_err(|kind| StylesheetError::new(kind, rule_text))?;
        rules.push((rule_text, rule));
        start = start.saturating_add(close).saturating_add(1);
    }
    Ok(rules)
}

enum SelectorSearch<'text> {
    /// No `{` left.
    NoBlock,
    /// Every candidate failed; carries the first failure and the text it was for.
    Invalid(SelectorParseError, &'text str),
}

/// Find the first `{` whose preceding text parses as a selector. Attempts are bounded by the
/// number of `{` in `rest`.
fn find_selector<'text>(
    rest: &'text str,
    cache: &mut SelectorCache,
) -> Result<(&'text str, Arc<SelectorList>, usize), SelectorSearch<'text>> {
    let mut first_error: Option<(SelectorParseError, &'text str)> = None;
    for (open, _) in rest.match_indices('{') {
        let candidate = rest.get(..open).unwrap_or_default().trim();
        match cache.get_or_parse(candidate) {
            Ok(ast) => return Ok((candidate, ast, open)),
            Err(err) => {
                first_error.get_or_insert((err, candidate));
            }
        }
    }
    match first_error {
        Some((err, candidate)) => Err(SelectorSearch::Invalid(err, candidate)),
        None => Err(SelectorSearch::NoBlock),
    }
}

/// A blockless tail is only valid as a `:remove()` selector.
fn trailing_remove_rule(
    rest: &str,
    cache: &mut SelectorCache,
) -> Result<ExtCssRuleData, StylesheetError> {
    let ast = cache
        .get_or_parse(rest.trim())
        .map_err(|err| StylesheetError::new(StylesheetErrorKind::Selector(err), rest))?;
    if !ast.should_remove() {
        return Err(StylesheetError::new(StylesheetErrorKind::MissingBlock, rest));
    }
    ExtCssRuleData::new(rest, ast, StyleBlock::default())
        .map_err(|kind| StylesheetError::new(kind, rest))
}

/// Index of the `}` closing the block whose body starts at `body_start`, skipping quoted text.
/// Nested braces are balanced so the block parser can report them.
fn find_block_end(text: &str, body_start: usize) -> Option<usize> {
    let body = text.get(body_start..)?;
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, character) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, character) {
            (_, '\\') => escaped = true,
            (Some(open), current) if current == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(character),
            (None, '{') => depth = depth.saturating_add(1),
            (None, '}') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(body_start.saturating_add(index));
                }
            }
            (None, _) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::find_block_end;

    #[test]
    fn block_end_skips_quotes_and_nesting() {
        assert_eq!(find_block_end("a { b }", 3), Some(6));
        assert_eq!(find_block_end("a { content: \"}\" }", 3), Some(17));
        assert_eq!(find_block_end("a { x { y } }", 3), Some(12));
        assert_eq!(find_block_end("a { b", 3), None);
    }
}
