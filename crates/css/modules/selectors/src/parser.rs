//! CSS selector parsing.
//! Spec: <https://www.w3.org/TR/selectors-3/>

use crate::{
    AttrOperator, AttrSelector, Combinator, ComplexSelector, CompoundSelector, Nth, PseudoClass,
    SelectorError, SelectorErrorKind, SelectorList, SimpleSelector,
};
use core::mem::take;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Internal tokenizer token kinds.
enum Tok {
    /// A combinator token like child/adjacent/general sibling.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWS,
    /// A simple selector token (type, class, id, attribute, pseudo-class, universal).
    Simple(SimpleSelector),
}

/// Tokenizer over a selector string.
struct SelectorTokenizer<'input> {
    /// Underlying bytes for the selector.
    input_bytes: &'input [u8],
    /// Current cursor index into `input_bytes`.
    index: usize,
    /// Offset of `input_bytes` inside the text the caller handed to the public entry point.
    base: usize,
}

impl<'input> SelectorTokenizer<'input> {
    /// Construct a tokenizer from input.
    #[inline]
    const fn new(input: &'input str, base: usize) -> Self {
        Self {
            input_bytes: input.as_bytes(),
            index: 0,
            base,
        }
    }

    /// Build an error at the current cursor.
    #[inline]
    fn error(&self, kind: SelectorErrorKind) -> SelectorError {
        SelectorError {
            kind,
            position: self.base.saturating_add(self.index),
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    #[inline]
    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Return the next selector token, if any.
    fn next_token(&mut self) -> Result<Option<Tok>, SelectorError> {
        if self.skip_spaces() {
            return Ok(Some(Tok::DescendantWS));
        }
        let Some(current) = self.peek() else {
            return Ok(None);
        };
        let token = match current {
            b'*' => {
                self.bump();
                Tok::Simple(SimpleSelector::Universal)
            }
            b'.' => {
                self.bump();
                Tok::Simple(SimpleSelector::Class(self.consume_required_ident(false)?))
            }
            b'#' => {
                self.bump();
                Tok::Simple(SimpleSelector::IdSelector(
                    self.consume_required_ident(false)?,
                ))
            }
            b'[' => Tok::Simple(SimpleSelector::Attribute(self.consume_attr()?)),
            b':' => Tok::Simple(SimpleSelector::Pseudo(self.consume_pseudo()?)),
            b'>' => {
                self.bump();
                Tok::Combinator(Combinator::Child)
            }
            b'+' => {
                self.bump();
                Tok::Combinator(Combinator::AdjacentSibling)
            }
            b'~' => {
                self.bump();
                Tok::Combinator(Combinator::GeneralSibling)
            }
            byte if is_ident_start(byte) => {
                Tok::Simple(SimpleSelector::Type(self.consume_ident(true)))
            }
            _ => {
                let character = self.current_char();
                return Err(self.error(SelectorErrorKind::UnexpectedCharacter(character)));
            }
        };
        Ok(Some(token))
    }

    /// The full character at the cursor, for error reporting.
    fn current_char(&self) -> char {
        self.input_bytes
            .get(self.index..)
            .and_then(|rest| {
                let text = String::from_utf8_lossy(rest);
                text.chars().next()
            })
            .unwrap_or('\u{FFFD}')
    }

    /// Skip whitespace, returning whether any was consumed.
    #[inline]
    fn skip_spaces(&mut self) -> bool {
        let start = self.index;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
        self.index != start
    }

    /// Consume an identifier: ASCII alphanumerics, '-', '_', non-ASCII and escaped characters.
    fn consume_ident(&mut self, lowercase: bool) -> String {
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                self.bump();
                if let Some(escaped) = self.peek() {
                    bytes.push(escaped);
                    self.bump();
                }
            } else if is_ident_byte(byte) {
                bytes.push(byte);
                self.bump();
            } else {
                break;
            }
        }
        let ident = String::from_utf8_lossy(&bytes).into_owned();
        if lowercase {
            ident.to_ascii_lowercase()
        } else {
            ident
        }
    }

    /// Like `consume_ident` but an empty identifier is an error.
    fn consume_required_ident(&mut self, lowercase: bool) -> Result<String, SelectorError> {
        let ident = self.consume_ident(lowercase);
        if ident.is_empty() {
            return Err(self.error(SelectorErrorKind::MissingIdentifier));
        }
        Ok(ident)
    }

    /// Parse an attribute selector: `[name]`, `[name op value]`, `[name op value i]`.
    fn consume_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        // skip '['
        self.bump();
        self.skip_spaces();
        let name = self.consume_required_ident(true)?;
        self.skip_spaces();
        let operator = match self.peek() {
            Some(b']') => {
                self.bump();
                return Ok(AttrSelector {
                    name,
                    operator: AttrOperator::Exists,
                    value: String::new(),
                    case_insensitive: false,
                });
            }
            Some(b'=') => AttrOperator::Equals,
            Some(b'~') => AttrOperator::Includes,
            Some(b'|') => AttrOperator::DashMatch,
            Some(b'^') => AttrOperator::Prefix,
            Some(b'$') => AttrOperator::Suffix,
            Some(b'*') => AttrOperator::Substring,
            Some(_) => return Err(self.error(SelectorErrorKind::InvalidAttribute)),
            None => return Err(self.error(SelectorErrorKind::InvalidAttribute)),
        };
        self.bump();
        if operator != AttrOperator::Equals {
            if self.peek() != Some(b'=') {
                return Err(self.error(SelectorErrorKind::InvalidAttribute));
            }
            self.bump();
        }
        self.skip_spaces();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.bump();
                self.consume_quoted(quote)?
            }
            Some(_) => self.consume_ident(false),
            None => return Err(self.error(SelectorErrorKind::InvalidAttribute)),
        };
        self.skip_spaces();
        let mut case_insensitive = false;
        if let Some(flag) = self.peek()
            && matches!(flag, b'i' | b'I' | b's' | b'S')
        {
            case_insensitive = flag.eq_ignore_ascii_case(&b'i');
            self.bump();
            self.skip_spaces();
        }
        if self.peek() != Some(b']') {
            return Err(self.error(SelectorErrorKind::InvalidAttribute));
        }
        self.bump();
        Ok(AttrSelector {
            name,
            operator,
            value,
            case_insensitive,
        })
    }

    /// Consume a quoted string body up to (and including) the closing quote.
    fn consume_quoted(&mut self, quote: u8) -> Result<String, SelectorError> {
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error(SelectorErrorKind::UnterminatedString)),
                Some(b'\\') => {
                    self.bump();
                    if let Some(escaped) = self.peek() {
                        bytes.push(escaped);
                        self.bump();
                    }
                }
                Some(byte) if byte == quote => {
                    self.bump();
                    break;
                }
                Some(byte) => {
                    bytes.push(byte);
                    self.bump();
                }
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parse `:name` or `:name(argument)`.
    fn consume_pseudo(&mut self) -> Result<PseudoClass, SelectorError> {
        // skip ':'
        self.bump();
        if self.peek() == Some(b':') {
            self.bump();
            let name = self.consume_ident(true);
            return Err(self.error(SelectorErrorKind::PseudoElement(name)));
        }
        let name_start = self.index;
        let name = self.consume_required_ident(true)?;
        if self.peek() != Some(b'(') {
            return pseudo_from_name(&name).ok_or_else(|| SelectorError {
                kind: SelectorErrorKind::UnknownPseudoClass(name.clone()),
                position: self.base.saturating_add(name_start),
            });
        }
        let argument_start = self.index.saturating_add(1);
        let argument = self.consume_parenthesized()?;
        let invalid = |tokenizer: &Self| SelectorError {
            kind: SelectorErrorKind::InvalidPseudoArgument(name.clone()),
            position: tokenizer.base.saturating_add(argument_start),
        };
        match name.as_str() {
            "nth-child" => parse_nth(&argument)
                .map(PseudoClass::NthChild)
                .ok_or_else(|| invalid(self)),
            "nth-last-child" => parse_nth(&argument)
                .map(PseudoClass::NthLastChild)
                .ok_or_else(|| invalid(self)),
            "nth-of-type" => parse_nth(&argument)
                .map(PseudoClass::NthOfType)
                .ok_or_else(|| invalid(self)),
            "nth-last-of-type" => parse_nth(&argument)
                .map(PseudoClass::NthLastOfType)
                .ok_or_else(|| invalid(self)),
            "not" | "is" => {
                let nested = parse_list_at(&argument, self.base.saturating_add(argument_start))?;
                if name == "not" {
                    Ok(PseudoClass::Not(Box::new(nested)))
                } else {
                    Ok(PseudoClass::Is(Box::new(nested)))
                }
            }
            _ => Err(SelectorError {
                kind: SelectorErrorKind::UnknownPseudoClass(name.clone()),
                position: self.base.saturating_add(name_start),
            }),
        }
    }

    /// Consume `( ... )` with nesting and quotes, returning the inner text.
    fn consume_parenthesized(&mut self) -> Result<String, SelectorError> {
        let open = self.index;
        // skip '('
        self.bump();
        let start = self.index;
        let mut depth = 1usize;
        let mut quote: Option<u8> = None;
        while let Some(byte) = self.peek() {
            match (quote, byte) {
                (_, b'\\') => self.bump(),
                (Some(open_quote), current) if current == open_quote => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(byte),
                (None, b'(') => depth = depth.saturating_add(1),
                (None, b')') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let inner = self.input_bytes.get(start..self.index).unwrap_or(&[]);
                        self.bump();
                        return Ok(String::from_utf8_lossy(inner).into_owned());
                    }
                }
                (None, _) => {}
            }
            self.bump();
        }
        let kind = if quote.is_some() {
            SelectorErrorKind::UnterminatedString
        } else {
            SelectorErrorKind::UnbalancedParenthesis
        };
        Err(SelectorError {
            kind,
            position: self.base.saturating_add(open),
        })
    }
}

/// True for bytes that may start a type selector.
const fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'-' || byte == b'\\' || byte >= 0x80
}

/// True for bytes that may continue an identifier.
const fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

/// Map a non-functional pseudo-class name.
fn pseudo_from_name(name: &str) -> Option<PseudoClass> {
    let pseudo = match name {
        "first-child" => PseudoClass::FirstChild,
        "last-child" => PseudoClass::LastChild,
        "only-child" => PseudoClass::OnlyChild,
        "first-of-type" => PseudoClass::FirstOfType,
        "last-of-type" => PseudoClass::LastOfType,
        "only-of-type" => PseudoClass::OnlyOfType,
        "empty" => PseudoClass::Empty,
        "root" => PseudoClass::Root,
        "checked" => PseudoClass::Checked,
        "disabled" => PseudoClass::Disabled,
        "enabled" => PseudoClass::Enabled,
        "link" | "any-link" => PseudoClass::Link,
        "visited" | "hover" | "active" | "focus" | "focus-within" | "focus-visible"
        | "target" => PseudoClass::State(name.to_owned()),
        _ => return None,
    };
    Some(pseudo)
}

/// Parse the `An+B` microsyntax, including `odd` and `even`.
/// Spec: <https://www.w3.org/TR/css-syntax-3/#anb-microsyntax>
fn parse_nth(argument: &str) -> Option<Nth> {
    let compact: String = argument
        .chars()
        .filter(|character| !character.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => return Some(Nth { step: 2, offset: 1 }),
        "even" => return Some(Nth { step: 2, offset: 0 }),
        "" => return None,
        _ => {}
    }
    let Some(n_index) = compact.find('n') else {
        return compact.parse::<i32>().ok().map(|offset| Nth { step: 0, offset });
    };
    let step_text = compact.get(..n_index)?;
    let step = match step_text {
        "" | "+" => 1,
        "-" => -1,
        other => other.parse::<i32>().ok()?,
    };
    let offset_text = compact.get(n_index.saturating_add(1)..)?;
    let offset = if offset_text.is_empty() {
        0
    } else {
        if !offset_text.starts_with(['+', '-']) {
            return None;
        }
        offset_text.trim_start_matches('+').parse::<i32>().ok()?
    };
    Some(Nth { step, offset })
}

/// Split `input` on `separator` where it appears outside quotes, brackets and parentheses.
///
/// Returns each part with its byte offset in `input`. Parts are not trimmed.
pub fn split_top_level(input: &str, separator: char) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, character) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, character) {
            (_, '\\') => escaped = true,
            (Some(open), current) if current == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(character),
            (None, '(' | '[') => depth = depth.saturating_add(1),
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, current) if current == separator && depth == 0 => {
                parts.push((start, input.get(start..index).unwrap_or_default()));
                start = index.saturating_add(current.len_utf8());
            }
            (None, _) => {}
        }
    }
    parts.push((start, input.get(start..).unwrap_or_default()));
    parts
}

/// Parse a selector list from CSS text.
/// Spec: Section 3, 4, 5–8, 11
///
/// # Errors
/// Returns a [`SelectorError`] for any selector outside the supported grammar, including empty
/// list items.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    parse_list_at(input, 0)
}

/// Parse a list whose text starts at `base` in the caller's input.
fn parse_list_at(input: &str, base: usize) -> Result<SelectorList, SelectorError> {
    let mut list = SelectorList::default();
    for (offset, part) in split_top_level(input, ',') {
        let leading = part.len().saturating_sub(part.trim_start().len());
        let position = base.saturating_add(offset).saturating_add(leading);
        list.selectors
            .push(parse_complex_at(part.trim(), position)?);
    }
    Ok(list)
}

/// Parse one complex selector.
/// Spec: Section 11 — Combinators; Section 5–8 — simple selectors
///
/// # Errors
/// Returns a [`SelectorError`] for empty input, dangling combinators or invalid simple selectors.
pub fn parse_complex_selector(input: &str) -> Result<ComplexSelector, SelectorError> {
    parse_complex_at(input, 0)
}

fn parse_complex_at(input: &str, base: usize) -> Result<ComplexSelector, SelectorError> {
    let mut tokens = SelectorTokenizer::new(input, base);
    let mut current = CompoundSelector::default();
    let mut first: Option<CompoundSelector> = None;
    let mut rest: Vec<(Combinator, CompoundSelector)> = Vec::new();
    // Combinator between the last flushed compound and `current`, plus whether it was written out.
    let mut pending: Option<(Combinator, bool)> = None;

    while let Some(token) = tokens.next_token()? {
        match token {
            Tok::DescendantWS => {
                if !current.simples.is_empty() {
                    flush(&mut first, &mut rest, &mut pending, take(&mut current));
                    pending = Some((Combinator::Descendant, false));
                }
            }
            Tok::Combinator(comb) => {
                if !current.simples.is_empty() {
                    flush(&mut first, &mut rest, &mut pending, take(&mut current));
                    pending = Some((comb, true));
                } else if matches!(pending, Some((_, false))) {
                    pending = Some((comb, true));
                } else {
                    return Err(tokens.error(SelectorErrorKind::DanglingCombinator));
                }
            }
            Tok::Simple(simple) => current.simples.push(simple),
        }
    }

    if current.simples.is_empty() {
        if first.is_none() {
            return Err(tokens.error(SelectorErrorKind::Empty));
        }
        if matches!(pending, Some((_, true))) {
            return Err(tokens.error(SelectorErrorKind::DanglingCombinator));
        }
    } else {
        flush(&mut first, &mut rest, &mut pending, current);
    }

    Ok(ComplexSelector {
        first: first.unwrap_or_default(),
        rest,
    })
}

/// Append a finished compound to the selector being built.
fn flush(
    first: &mut Option<CompoundSelector>,
    rest: &mut Vec<(Combinator, CompoundSelector)>,
    pending: &mut Option<(Combinator, bool)>,
    compound: CompoundSelector,
) {
    if first.is_none() {
        *first = Some(compound);
        return;
    }
    let combinator = pending.take().map_or(Combinator::Descendant, |(comb, _)| comb);
    rest.push((combinator, compound));
}
