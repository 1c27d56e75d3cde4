use core::error::Error;
use core::fmt;
use css_ext_selector::SelectorParseError;

/// Why a declaration block failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleBlockErrorKind {
    /// `property value` with no `:` between them.
    MissingColon(String),
    /// `property:` followed by nothing.
    MissingValue(String),
    /// Something other than a property name where a declaration starts.
    UnexpectedToken(String),
    UnterminatedQuote,
    /// `debug` only accepts `true` and `global`.
    InvalidDebugValue(String),
    /// `remove` only accepts `true`.
    InvalidRemoveValue(String),
    /// `remove: true` next to real declarations.
    RemoveWithStyles,
    /// A second `remove` declaration in one block.
    DuplicateRemove,
    Comment,
    NestedBlock,
}

/// A declaration block failure and the byte position inside the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleBlockError {
    pub kind: StyleBlockErrorKind,
    pub position: usize,
}

impl StyleBlockError {
    pub const fn new(kind: StyleBlockErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for StyleBlockError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StyleBlockErrorKind::MissingColon(property) => {
                write!(formatter, "missing ':' after '{property}'")
            }
            StyleBlockErrorKind::MissingValue(property) => {
                write!(formatter, "missing value for '{property}'")
            }
            StyleBlockErrorKind::UnexpectedToken(text) => {
                write!(formatter, "unexpected '{text}'")
            }
            StyleBlockErrorKind::UnterminatedQuote => formatter.write_str("unterminated quote"),
            StyleBlockErrorKind::InvalidDebugValue(value) => {
                write!(formatter, "invalid debug value '{value}'")
            }
            StyleBlockErrorKind::InvalidRemoveValue(value) => {
                write!(formatter, "invalid remove value '{value}'")
            }
            StyleBlockErrorKind::RemoveWithStyles => {
                formatter.write_str("'remove' cannot be combined with other declarations")
            }
            StyleBlockErrorKind::DuplicateRemove => {
                formatter.write_str("'remove' may only be declared once")
            }
            StyleBlockErrorKind::Comment => formatter.write_str("comments are not allowed"),
            StyleBlockErrorKind::NestedBlock => {
                formatter.write_str("nested blocks are not allowed")
            }
        }?;
        write!(formatter, " at position {}", self.position)
    }
}

impl Error for StyleBlockError {}

/// What went wrong with one stylesheet rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StylesheetErrorKind {
    Selector(SelectorParseError),
    Block(StyleBlockError),
    /// `{` without a matching `}`.
    UnclosedBlock,
    /// A selector with no block that is not a `:remove()` selector.
    MissingBlock,
    /// A removing rule and a styling rule share a selector.
    RemoveConflict,
}

/// A rule failure together with the rule text it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StylesheetError {
    pub kind: StylesheetErrorKind,
    pub rule: String,
}

impl StylesheetError {
    pub fn new(kind: StylesheetErrorKind, rule: &str) -> Self {
        Self {
            kind,
            rule: rule.trim().to_owned(),
        }
    }
}

impl fmt::Display for StylesheetError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StylesheetErrorKind::Selector(err) => write!(formatter, "invalid selector: {err}"),
            StylesheetErrorKind::Block(err) => write!(formatter, "invalid style block: {err}"),
            StylesheetErrorKind::UnclosedBlock => formatter.write_str("unclosed style block"),
            StylesheetErrorKind::MissingBlock => formatter.write_str("missing style block"),
            StylesheetErrorKind::RemoveConflict => {
                formatter.write_str("a removing rule cannot share its selector with a styling rule")
            }
        }?;
        write!(formatter, " in rule '{}'", self.rule)
    }
}

impl Error for StylesheetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            StylesheetErrorKind::Selector(err) => Some(err),
            StylesheetErrorKind::Block(err) => Some(err),
            StylesheetErrorKind::UnclosedBlock
            | StylesheetErrorKind::MissingBlock
            | StylesheetErrorKind::RemoveConflict => None,
        }
    }
}
