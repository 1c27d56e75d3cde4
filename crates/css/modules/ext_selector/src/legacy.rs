//! Legacy attribute syntax: `[-ext-name="arg"]` is rewritten as `:name(arg)`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static LEGACY_OPEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\[-ext-([a-zA-Z][a-zA-Z-]*)=(["'])"#).ok());

/// Rewrite every legacy extended attribute in `text`. Text without one is borrowed unchanged.
///
/// Both quote styles are accepted; an escaped quote inside the value is unescaped. A legacy
/// attribute that never closes is left as written for the parser to reject.
pub fn convert_legacy_syntax(text: &str) -> Cow<'_, str> {
    let Some(pattern) = LEGACY_OPEN.as_ref() else {
        return Cow::Borrowed(text);
    };
    if !pattern.is_match(text) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for captures in pattern.captures_iter(text) {
        let (Some(whole), Some(name), Some(quote)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        if whole.start() < cursor {
            continue;
        }
        let quote_char = quote.as_str().chars().next().unwrap_or('"');
        let value_start = whole.end();
        let Some((value, close_end)) = scan_value(text, value_start, quote_char) else {
            continue;
        };
        out.push_str(text.get(cursor..whole.start()).unwrap_or_default());
        out.push(':');
        out.push_str(&name.as_str().to_ascii_lowercase());
        out.push('(');
        out.push_str(&value);
        out.push(')');
        cursor = close_end;
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    Cow::Owned(out)
}

/// Read a quoted value starting at `start` up to the closing `quote]`. Returns the unescaped
/// value and the byte index after `]`.
fn scan_value(text: &str, start: usize, quote: char) -> Option<(String, usize)> {
    let rest = text.get(start..)?;
    let mut value = String::new();
    let mut chars = rest.char_indices();
    while let Some((index, character)) = chars.next() {
        if character == '\\' {
            let (_, escaped) = chars.next()?;
            if escaped != quote {
                value.push('\\');
            }
            value.push(escaped);
            continue;
        }
        if character == quote {
            let after = rest.get(index.saturating_add(1)..)?;
            if after.starts_with(']') {
                return Some((value, start.saturating_add(index).saturating_add(2)));
            }
        }
        value.push(character);
    }
    None
}
