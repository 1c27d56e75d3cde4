//! CSS Style Attributes — style="..." attribute processing.
//! Spec: <https://www.w3.org/TR/css-style-attr/>
//!
//! Hosts use this crate to read and rewrite inline declarations without losing the
//! declarations they do not touch. Values are split with quote and parenthesis balancing so a
//! `;` inside `url(...)` or a string never terminates a declaration.

#![forbid(unsafe_code)]

use core::fmt;

/// A single CSS declaration parsed from a style attribute.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name normalized to ASCII lowercase. Custom properties keep their case.
    pub property: String,
    /// Raw value trimmed of surrounding ASCII whitespace, without the `!important` suffix.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

impl fmt::Display for Declaration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(formatter, "{}: {} !important;", self.property, self.value)
        } else {
            write!(formatter, "{}: {};", self.property, self.value)
        }
    }
}

/// Ordered inline style of one element.
///
/// Setting an existing property replaces it in place, so the serialized order stays stable
/// across repeated writes of the same declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineStyle {
    /// Declarations in source order; property names are unique.
    declarations: Vec<Declaration>,
}

impl InlineStyle {
    /// Parse the value of a `style` attribute. A missing attribute is an empty style.
    pub fn from_attribute(attribute: Option<&str>) -> Self {
        let mut style = Self::default();
        for declaration in parse_style_attribute(attribute.unwrap_or_default()) {
            style.set(&declaration.property, &declaration.value, declaration.important);
        }
        style
    }

    /// Look up a declaration by property name.
    pub fn get(&self, property: &str) -> Option<&Declaration> {
        let wanted = normalize_property(property);
        self.declarations
            .iter()
            .find(|declaration| declaration.property == wanted)
    }

    /// Set or replace a declaration.
    pub fn set(&mut self, property: &str, value: &str, important: bool) {
        let normalized = normalize_property(property);
        let value_text = value.trim_matches(is_ascii_whitespace).to_owned();
        if let Some(existing) = self
            .declarations
            .iter_mut()
            .find(|declaration| declaration.property == normalized)
        {
            existing.value = value_text;
            existing.important = important;
            return;
        }
        self.declarations.push(Declaration {
            property: normalized,
            value: value_text,
            important,
        });
    }

    /// Remove a declaration, returning it if it was present.
    pub fn remove(&mut self, property: &str) -> Option<Declaration> {
        let wanted = normalize_property(property);
        let index = self
            .declarations
            .iter()
            .position(|declaration| declaration.property == wanted)?;
        Some(self.declarations.remove(index))
    }

    /// Declarations in order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// True when no declarations remain.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize back into attribute text, e.g. `color: red !important; display: none;`.
    pub fn to_css_text(&self) -> String {
        let parts: Vec<String> = self
            .declarations
            .iter()
            .map(ToString::to_string)
            .collect();
        parts.join(" ")
    }
}

/// Parse the value of a `style` attribute into a list of declarations.
///
/// Items are separated by `;` outside quotes and parentheses. Each item is split on its first
/// colon. Items without a colon, an empty property, or an empty value are skipped, which is
/// the error recovery browsers apply to inline styles.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn parse_style_attribute(input: &str) -> Vec<Declaration> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<Declaration> = Vec::new();
    for raw_item in split_declarations(input) {
        let item = raw_item.trim_matches(is_ascii_whitespace);
        if item.is_empty() {
            continue;
        }
        let Some((raw_prop, raw_value)) = item.split_once(':') else {
            continue;
        };
        let property_text = raw_prop.trim_matches(is_ascii_whitespace);
        let (value_text, important) = split_important(raw_value);
        if property_text.is_empty() || value_text.is_empty() {
            continue;
        }
        out.push(Declaration {
            property: normalize_property(property_text),
            value: value_text.to_owned(),
            important,
        });
    }
    out
}

/// Split declaration text on `;` while honoring quotes, escapes and parentheses.
pub fn split_declarations(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut paren_depth = 0usize;
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
            (None, '(') => paren_depth = paren_depth.saturating_add(1),
            (None, ')') => paren_depth = paren_depth.saturating_sub(1),
            (None, ';') if paren_depth == 0 => {
                parts.push(input.get(start..index).unwrap_or_default());
                start = index.saturating_add(1);
            }
            (None, _) => {}
        }
    }
    parts.push(input.get(start..).unwrap_or_default());
    parts
}

/// Strip a trailing `!important` from a raw value.
fn split_important(raw_value: &str) -> (&str, bool) {
    let trimmed = raw_value.trim_matches(is_ascii_whitespace);
    if let Some(position) = trimmed.rfind('!')
        && let Some(suffix) = trimmed.get(position.saturating_add(1)..)
        && suffix
            .trim_matches(is_ascii_whitespace)
            .eq_ignore_ascii_case("important")
    {
        let head = trimmed.get(..position).unwrap_or_default();
        return (head.trim_matches(is_ascii_whitespace), true);
    }
    (trimmed, false)
}

/// ASCII whitespace per CSS Syntax (TAB, LF, FF, CR, SPACE).
///
/// Spec: <https://www.w3.org/TR/css-syntax-3/#whitespace>
const fn is_ascii_whitespace(character: char) -> bool {
    matches!(
        character,
        '\u{0009}' | '\u{000A}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

/// Lowercase a property name; custom properties (`--x`) are case-sensitive and kept.
fn normalize_property(text: &str) -> String {
    let trimmed = text.trim_matches(is_ascii_whitespace);
    if trimmed.starts_with("--") {
        return trimmed.to_owned();
    }
    trimmed.to_ascii_lowercase()
}
