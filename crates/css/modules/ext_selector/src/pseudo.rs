//! Extended pseudo-class names and argument validation.

use crate::ast::{
    AbsolutePseudoClass, ChainSegment, CssPseudoElement, MatchesAttr, MatchesCss,
    MatchesProperty, RelativeKind, TextMatcher, Upward, ValuePattern,
};
use regex::{Regex, RegexBuilder};

/// Largest depth accepted by `:nth-ancestor()` and `:upward()`.
pub const MAX_ANCESTOR_DEPTH: usize = 256;

/// Every extended pseudo-class name, aliases included.
pub const EXTENDED_PSEUDO_CLASSES: &[&str] = &[
    "contains",
    "has-text",
    "-abp-contains",
    "matches-css",
    "matches-css-before",
    "matches-css-after",
    "matches-attr",
    "matches-property",
    "xpath",
    "nth-ancestor",
    "upward",
    "remove",
    "has",
    "-abp-has",
    "if",
    "is",
    "not",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExtendedKind {
    Contains,
    MatchesCss(Option<CssPseudoElement>),
    MatchesAttr,
    MatchesProperty,
    Xpath,
    NthAncestor,
    Upward,
    Remove,
    Relative(RelativeKind),
}

impl ExtendedKind {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "contains" | "has-text" | "-abp-contains" => Self::Contains,
            "matches-css" => Self::MatchesCss(None),
            "matches-css-before" => Self::MatchesCss(Some(CssPseudoElement::Before)),
            "matches-css-after" => Self::MatchesCss(Some(CssPseudoElement::After)),
            "matches-attr" => Self::MatchesAttr,
            "matches-property" => Self::MatchesProperty,
            "xpath" => Self::Xpath,
            "nth-ancestor" => Self::NthAncestor,
            "upward" => Self::Upward,
            "remove" => Self::Remove,
            "has" | "-abp-has" | "if" => Self::Relative(RelativeKind::Has),
            "is" => Self::Relative(RelativeKind::Is),
            "not" => Self::Relative(RelativeKind::Not),
            _ => return None,
        };
        Some(kind)
    }

    /// Quotes group text in every argument except free text.
    pub(crate) const fn tracks_quotes(self) -> bool {
        !matches!(self, Self::Contains)
    }

    /// Characters after which `/` opens a regex literal in the argument. The start of the
    /// argument always does. `None` means the argument has no regex literals.
    pub(crate) const fn regex_openers(self) -> Option<&'static [char]> {
        match self {
            Self::Contains => Some(&[]),
            Self::MatchesCss(_) => Some(&[':']),
            Self::MatchesAttr => Some(&['=']),
            Self::MatchesProperty => Some(&['.', '=']),
            Self::Xpath
            | Self::NthAncestor
            | Self::Upward
            | Self::Remove
            | Self::Relative(_) => None,
        }
    }
}

/// True if `name` is an extended pseudo-class or alias.
pub fn is_extended_pseudo_class(name: &str) -> bool {
    EXTENDED_PSEUDO_CLASSES.contains(&name.to_ascii_lowercase().as_str())
}

/// Validate the argument of an absolute pseudo-class. The error is a human-readable reason.
pub(crate) fn parse_absolute(
    kind: ExtendedKind,
    arg: &str,
) -> Result<AbsolutePseudoClass, String> {
    if arg.trim().is_empty() {
        return Err("argument is empty".to_owned());
    }
    match kind {
        ExtendedKind::Contains => parse_contains(arg).map(AbsolutePseudoClass::Contains),
        ExtendedKind::MatchesCss(pseudo_element) => {
            parse_matches_css(pseudo_element, arg).map(AbsolutePseudoClass::MatchesCss)
        }
        ExtendedKind::MatchesAttr => {
            parse_matches_attr(arg).map(AbsolutePseudoClass::MatchesAttr)
        }
        ExtendedKind::MatchesProperty => {
            parse_matches_property(arg).map(AbsolutePseudoClass::MatchesProperty)
        }
        ExtendedKind::Xpath => Ok(AbsolutePseudoClass::Xpath(arg.trim().to_owned())),
        ExtendedKind::NthAncestor => parse_depth(arg).map(AbsolutePseudoClass::NthAncestor),
        ExtendedKind::Upward => parse_upward(arg).map(AbsolutePseudoClass::Upward),
        ExtendedKind::Remove | ExtendedKind::Relative(_) => {
            Err("not an absolute pseudo-class".to_owned())
        }
    }
}

/// Parse `/pattern/flags`. Returns `None` when `text` is not written as a regex literal.
///
/// Supported flags: `i`, `m`, `s`; `g`, `u` and `y` are accepted and have no effect.
pub fn parse_regex_literal(text: &str) -> Option<Result<Regex, String>> {
    let body = text.strip_prefix('/')?;
    let close = body.rfind('/')?;
    let pattern = body.get(..close)?;
    let flags = body.get(close.saturating_add(1)..)?;
    if pattern.is_empty() || !flags.chars().all(|flag| "gimsuy".contains(flag)) {
        return None;
    }
    let source = pattern.replace("\\/", "/");
    let built = RegexBuilder::new(&source)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|err| format!("invalid regexp {text}: {err}"));
    Some(built)
}

/// Remove one pair of matching surrounding quotes.
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2
            && let Some(inner) = trimmed
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

/// Rewrite `url("x")` and `url('x')` as `url(x)`.
pub fn normalize_url_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("url(") {
        let open_end = start.saturating_add(4);
        out.push_str(rest.get(..open_end).unwrap_or_default());
        let tail = rest.get(open_end..).unwrap_or_default();
        let Some(close) = tail.find(')') else {
            rest = tail;
            break;
        };
        out.push_str(strip_quotes(tail.get(..close).unwrap_or_default()));
        rest = tail.get(close..).unwrap_or_default();
    }
    out.push_str(rest);
    out
}

fn value_pattern(text: &str) -> Result<ValuePattern, String> {
    if let Some(regex) = parse_regex_literal(text) {
        return regex.map(ValuePattern::Regex);
    }
    if text.contains('*') {
        let parts: Vec<String> = text.split('*').map(regex::escape).collect();
        let source = format!("(?s)^{}$", parts.join(".*"));
        return Regex::new(&source)
            .map(ValuePattern::Wildcard)
            .map_err(|err| err.to_string());
    }
    Ok(ValuePattern::Exact(text.to_owned()))
}

fn parse_contains(arg: &str) -> Result<TextMatcher, String> {
    match parse_regex_literal(arg.trim()) {
        Some(regex) => regex.map(TextMatcher::Regex),
        None => Ok(TextMatcher::Literal(arg.to_owned())),
    }
}

fn parse_matches_css(
    pseudo_element: Option<CssPseudoElement>,
    arg: &str,
) -> Result<MatchesCss, String> {
    let (raw_property, raw_value) = arg
        .split_once(':')
        .ok_or_else(|| "expected `property: value`".to_owned())?;
    let property = raw_property.trim().to_ascii_lowercase();
    if property.is_empty()
        || !property
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '-')
    {
        return Err(format!("invalid property name `{}`", raw_property.trim()));
    }
    let value_text = raw_value.trim();
    if value_text.is_empty() {
        return Err(format!("missing value for `{property}`"));
    }
    let value = if value_text.starts_with('/') {
        value_pattern(value_text)?
    } else {
        value_pattern(&normalize_url_quotes(value_text))?
    };
    Ok(MatchesCss {
        pseudo_element,
        property,
        value,
    })
}

/// Split at the first `=` that is not inside quotes or a regex literal.
fn split_assignment(text: &str) -> Result<(&str, Option<&str>), String> {
    let mut quote: Option<char> = None;
    let mut in_regex = false;
    let mut escaped = false;
    let mut previous: Option<char> = None;
    for (index, character) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if character == '\\' {
            escaped = true;
        } else if let Some(open) = quote {
            if character == open {
                quote = None;
            }
        } else if in_regex {
            if character == '/' {
                in_regex = false;
            }
        } else {
            match character {
                '"' | '\'' => quote = Some(character),
                '/' if previous.is_none_or(|before| matches!(before, '=' | '.')) => {
                    in_regex = true;
                }
                '=' => {
                    let left = text.get(..index).unwrap_or_default();
                    let right = text.get(index.saturating_add(1)..).unwrap_or_default();
                    return Ok((left, Some(right)));
                }
                _ => {}
            }
        }
        if !character.is_whitespace() {
            previous = Some(character);
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_owned());
    }
    if in_regex {
        return Err("unterminated regexp".to_owned());
    }
    Ok((text, None))
}

fn parse_matches_attr(arg: &str) -> Result<MatchesAttr, String> {
    let (raw_name, raw_value) = split_assignment(arg.trim())?;
    let name_text = strip_quotes(raw_name);
    if name_text.is_empty() {
        return Err("missing attribute name".to_owned());
    }
    let name = if name_text.starts_with('/') {
        value_pattern(name_text)?
    } else {
        value_pattern(&name_text.to_ascii_lowercase())?
    };
    let value = raw_value
        .map(|text| value_pattern(strip_quotes(text)))
        .transpose()?;
    Ok(MatchesAttr { name, value })
}

/// Split a property chain at dots outside regex literals.
fn split_chain(chain: &str) -> Result<Vec<&str>, String> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut in_regex = false;
    let mut escaped = false;
    for (index, character) in chain.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match character {
            '\\' => escaped = true,
            '/' if in_regex => in_regex = false,
            '/' if index == start => in_regex = true,
            '.' if !in_regex => {
                segments.push(chain.get(start..index).unwrap_or_default());
                start = index.saturating_add(1);
            }
            _ => {}
        }
    }
    if in_regex {
        return Err("unterminated regexp in property chain".to_owned());
    }
    segments.push(chain.get(start..).unwrap_or_default());
    Ok(segments)
}

fn parse_matches_property(arg: &str) -> Result<MatchesProperty, String> {
    let (raw_chain, raw_value) = split_assignment(arg.trim())?;
    let chain_text = strip_quotes(raw_chain);
    let mut chain = Vec::new();
    for segment in split_chain(chain_text)? {
        if segment.is_empty() {
            return Err(format!("empty segment in property chain `{chain_text}`"));
        }
        if let Some(regex) = parse_regex_literal(segment) {
            chain.push(ChainSegment::Regex(regex?));
        } else if segment
            .chars()
            .any(|character| character.is_whitespace() || matches!(character, '"' | '\'' | '/'))
        {
            return Err(format!("invalid property name `{segment}`"));
        } else {
            chain.push(ChainSegment::Literal(segment.to_owned()));
        }
    }
    let value = raw_value
        .map(|text| value_pattern(strip_quotes(text)))
        .transpose()?;
    Ok(MatchesProperty { chain, value })
}

fn parse_depth(arg: &str) -> Result<usize, String> {
    let text = arg.trim();
    let depth = text
        .parse::<usize>()
        .map_err(|_| format!("`{text}` is not a positive integer"))?;
    if !(1..=MAX_ANCESTOR_DEPTH).contains(&depth) {
        return Err(format!("depth {depth} is outside 1..={MAX_ANCESTOR_DEPTH}"));
    }
    Ok(depth)
}

fn parse_upward(arg: &str) -> Result<Upward, String> {
    let text = arg.trim();
    if text
        .trim_start_matches(['-', '+'])
        .chars()
        .all(|character| character.is_ascii_digit())
    {
        return parse_depth(text).map(Upward::Depth);
    }
    css_selectors::parse_selector_list(text)
        .map(|_| Upward::Selector(text.to_owned()))
        .map_err(|err| format!("not a standard selector: {err}"))
}
