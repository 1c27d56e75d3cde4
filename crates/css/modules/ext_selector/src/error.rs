use core::error::Error;
use core::fmt;

/// Why an extended selector failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorParseErrorKind {
    /// No selector where one is required.
    Empty,
    /// A pseudo-class that is neither extended nor a supported standard one.
    UnknownPseudoClass(String),
    /// `:` not followed by a name.
    MissingPseudoName,
    /// An extended pseudo-class written without `(...)`.
    MissingArgument(String),
    /// An extended pseudo-class argument that does not validate.
    InvalidPseudoArgument { name: String, reason: String },
    /// `[` without `]`, or a stray `]`.
    UnbalancedBracket,
    /// `(` without `)`, or a stray parenthesis.
    UnbalancedParenthesis,
    UnterminatedQuote,
    UnterminatedRegex,
    /// `/* ... */` is not allowed in selectors.
    Comment,
    /// `@media` and friends.
    AtRule,
    /// A combinator with nothing on one side, two in a row, or a leading one where the context
    /// does not allow it.
    MisplacedCombinator,
    /// `::name`.
    PseudoElement(String),
    /// `:remove()` that is not last, repeated, nested, or not on every selector of a list.
    MisplacedRemove,
    UnexpectedCharacter(char),
    /// A regular fragment the standard selector engine rejects.
    InvalidStandardSelector(String),
}

/// A parse failure with the byte position it was detected at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorParseError {
    pub kind: SelectorParseErrorKind,
    pub position: usize,
}

impl SelectorParseError {
    pub const fn new(kind: SelectorParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for SelectorParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SelectorParseErrorKind::Empty => formatter.write_str("empty selector"),
            SelectorParseErrorKind::UnknownPseudoClass(name) => {
                write!(formatter, "unknown pseudo-class ':{name}'")
            }
            SelectorParseErrorKind::MissingPseudoName => {
                formatter.write_str("missing pseudo-class name")
            }
            SelectorParseErrorKind::MissingArgument(name) => {
                write!(formatter, "':{name}' requires an argument")
            }
            SelectorParseErrorKind::InvalidPseudoArgument { name, reason } => {
                write!(formatter, "invalid argument for ':{name}': {reason}")
            }
            SelectorParseErrorKind::UnbalancedBracket => formatter.write_str("unbalanced bracket"),
            SelectorParseErrorKind::UnbalancedParenthesis => {
                formatter.write_str("unbalanced parenthesis")
            }
            SelectorParseErrorKind::UnterminatedQuote => formatter.write_str("unterminated quote"),
            SelectorParseErrorKind::UnterminatedRegex => formatter.write_str("unterminated regexp"),
            SelectorParseErrorKind::Comment => formatter.write_str("comments are not allowed"),
            SelectorParseErrorKind::AtRule => formatter.write_str("at-rules are not allowed"),
            SelectorParseErrorKind::MisplacedCombinator => {
                formatter.write_str("misplaced combinator")
            }
            SelectorParseErrorKind::PseudoElement(name) => {
                write!(formatter, "pseudo-element '::{name}' is not allowed")
            }
            SelectorParseErrorKind::MisplacedRemove => {
                formatter.write_str("':remove()' must end every selector of the list, once")
            }
            SelectorParseErrorKind::UnexpectedCharacter(character) => {
                write!(formatter, "unexpected character '{character}'")
            }
            SelectorParseErrorKind::InvalidStandardSelector(message) => {
                write!(formatter, "invalid standard selector: {message}")
            }
        }?;
        write!(formatter, " at position {}", self.position)
    }
}

impl Error for SelectorParseError {}
