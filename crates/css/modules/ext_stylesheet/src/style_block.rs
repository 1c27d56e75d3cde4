//! Declaration block parsing.
//!
//! Declarations are read with `cssparser` so strings, `url(...)` and function arguments keep
//! their `;` and `:` characters. Values are kept as raw text.

use crate::error::{StyleBlockError, StyleBlockErrorKind as ErrorKind};
use cssparser::{Parser, ParserInput, Token};
use indexmap::IndexMap;

/// Rule debugging level from the `debug` pseudo-property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DebugMode {
    #[default]
    Off,
    /// `debug: true`: report timings for this rule.
    On,
    /// `debug: global`: report timings for every rule.
    Global,
}

/// A parsed declaration block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleBlock {
    /// Property to value, in first-seen order. Later duplicates overwrite the value.
    pub styles: IndexMap<String, String>,
    pub debug: DebugMode,
    pub remove: bool,
}

struct RawDeclaration {
    property: String,
    property_at: usize,
    value: String,
    value_at: usize,
}

/// Parse the inside of a `{ ... }` block.
///
/// # Errors
/// Returns the first malformed declaration, a comment, a nested block, an invalid `debug` or
/// `remove` value, a repeated `remove`, or `remove` mixed with other declarations.
pub fn parse_style_block(body: &str) -> Result<StyleBlock, StyleBlockError> {
    let mut input = ParserInput::new(body);
    let mut parser = Parser::new(&mut input);
    let mut block = StyleBlock::default();
    let mut remove_at = None;
    while let Some(declaration) = next_declaration(&mut parser, body)? {
        match declaration.property.as_str() {
            "debug" => {
                block.debug = match declaration.value.as_str() {
                    "true" => DebugMode::On,
                    "global" => DebugMode::Global,
                    _ => {
                        return Err(StyleBlockError::new(
                            ErrorKind::InvalidDebugValue(declaration.value),
                            declaration.value_at,
                        ));
                    }
                };
            }
            "remove" => {
                if declaration.value != "true" {
                    return Err(StyleBlockError::new(
                        ErrorKind::InvalidRemoveValue(declaration.value),
                        declaration.value_at,
                    ));
                }
                if remove_at.is_some() {
                    return Err(StyleBlockError::new(
                        ErrorKind::DuplicateRemove,
                        declaration.property_at,
                    ));
                }
                block.remove = true;
                remove_at = Some(declaration.property_at);
            }
            _ => {
                block.styles.insert(declaration.property, declaration.value);
            }
        }
    }
    if let Some(position) = remove_at
        && !block.styles.is_empty()
    {
        return Err(StyleBlockError::new(ErrorKind::RemoveWithStyles, position));
    }
    Ok(block)
}

fn next_declaration(
    parser: &mut Parser<'_, '_>,
    body: &str,
) -> Result<Option<RawDeclaration>, StyleBlockError> {
    let (property, property_at) = loop {
        let at = parser.position().byte_index();
        let Ok(token) = parser.next_including_whitespace_and_comments().cloned() else {
            return Ok(None);
        };
        match token {
            Token::WhiteSpace(_) | Token::Semicolon => {}
            Token::Ident(name) => break (property_name(&name), at),
            other => {
                let end = parser.position().byte_index();
                return Err(structural_error(&other, body, at, end));
            }
        }
    };

    let colon_at = loop {
        let at = parser.position().byte_index();
        match parser.next_including_whitespace_and_comments().cloned() {
            Ok(Token::WhiteSpace(_)) => {}
            Ok(Token::Colon) => break at,
            Ok(Token::Comment(_)) => {
                return Err(StyleBlockError::new(ErrorKind::Comment, at));
            }
            Ok(Token::CurlyBracketBlock | Token::CloseCurlyBracket) => {
                return Err(StyleBlockError::new(ErrorKind::NestedBlock, at));
            }
            Ok(_) | Err(_) => {
                return Err(StyleBlockError::new(ErrorKind::MissingColon(property), at));
            }
        }
    };

    let mut value_start = None;
    let mut value_end = body.len();
    loop {
        let at = parser.position().byte_index();
        let Ok(token) = parser.next_including_whitespace_and_comments().cloned() else {
            break;
        };
        let end = parser.position().byte_index();
        match token {
            Token::Semicolon => {
                value_end = at;
                break;
            }
            Token::WhiteSpace(_) => {}
            Token::QuotedString(_) if !is_terminated(body.get(at..end).unwrap_or_default()) => {
                return Err(StyleBlockError::new(ErrorKind::UnterminatedQuote, at));
            }
            Token::Comment(_)
            | Token::CurlyBracketBlock
            | Token::CloseCurlyBracket
            | Token::BadString(_) => return Err(structural_error(&token, body, at, end)),
            _ => {
                value_start.get_or_insert(at);
            }
        }
    }

    let Some(start) = value_start else {
        return Err(StyleBlockError::new(ErrorKind::MissingValue(property), colon_at));
    };
    let raw = body.get(start..value_end).unwrap_or_default();
    let value = strip_important(raw);
    if value.is_empty() {
        return Err(StyleBlockError::new(ErrorKind::MissingValue(property), colon_at));
    }
    Ok(Some(RawDeclaration {
        property,
        property_at,
        value: value.to_owned(),
        value_at: start,
    }))
}

/// Custom properties keep their case; everything else is ASCII case-insensitive.
fn property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_owned()
    } else {
        name.to_ascii_lowercase()
    }
}

fn structural_error(token: &Token<'_>, body: &str, at: usize, end: usize) -> StyleBlockError {
    let kind = match token {
        Token::Comment(_) => ErrorKind::Comment,
        Token::CurlyBracketBlock | Token::CloseCurlyBracket => ErrorKind::NestedBlock,
        Token::BadString(_) => ErrorKind::UnterminatedQuote,
        Token::QuotedString(_) if !is_terminated(body.get(at..end).unwrap_or_default()) => {
            ErrorKind::UnterminatedQuote
        }
        _ => ErrorKind::UnexpectedToken(body.get(at..end).unwrap_or_default().to_owned()),
    };
    StyleBlockError::new(kind, at)
}

/// `cssparser` closes strings at end of input; the raw text tells whether the quote was there.
fn is_terminated(raw: &str) -> bool {
    let mut chars = raw.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        return false;
    };
    open == close && !chars.as_str().ends_with('\\')
}

/// Drop a trailing `!important`; every applied value is committed as important anyway.
fn strip_important(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(bang) = trimmed.rfind('!') else {
        return trimmed;
    };
    let tail = trimmed.get(bang.saturating_add(1)..).unwrap_or_default().trim();
    if tail.eq_ignore_ascii_case("important") {
        trimmed.get(..bang).unwrap_or_default().trim_end()
    } else {
        trimmed
    }
}
