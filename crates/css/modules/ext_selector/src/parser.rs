//! Extended selector parser.
//!
//! The input is tokenized with [`SELECTOR_MARKS`] and walked as a state machine. Regular text
//! accumulates into standard fragments; attribute brackets and pseudo-class arguments are
//! consumed by sub-scanners that track bracket and parenthesis depth, quotes and regex
//! literals. Relative pseudo-class arguments are parsed recursively with their own context.

use core::mem;

use crate::ast::{
    AbsoluteExtendedSelector, Combinator, RegularSelector, RelativeExtendedSelector,
    RelativeKind, Selector, SelectorList, SelectorStep, SimpleSelectorNode,
};
use crate::error::{SelectorParseError, SelectorParseErrorKind as ErrorKind};
use crate::legacy::convert_legacy_syntax;
use crate::pseudo::{self, ExtendedKind};
use crate::tokenizer::{Token, TokenKind, is_selector_whitespace, tokenize_selector};
use log::trace;

/// Where a list is being parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListContext {
    TopLevel,
    /// `:has()` argument: a leading combinator is allowed.
    Relative,
    /// `:is()` / `:not()` argument.
    Nested,
}

/// Argument scanner state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArgState {
    Plain,
    Quoted(char),
    Regex,
}

/// Parse an extended selector list. Legacy `[-ext-name="arg"]` attributes are rewritten first,
/// so error positions refer to the rewritten text.
///
/// # Errors
/// Returns the first syntax or validation error with its byte position.
pub fn parse_selector_list(text: &str) -> Result<SelectorList, SelectorParseError> {
    let converted = convert_legacy_syntax(text);
    let list = parse_list_at(&converted, 0, ListContext::TopLevel)?;
    let removing = list.selectors.iter().filter(|selector| selector.remove).count();
    if removing != 0 && removing != list.selectors.len() {
        return Err(SelectorParseError::new(ErrorKind::MisplacedRemove, 0));
    }
    trace!("parsed extended selector `{text}` into {} selector(s)", list.selectors.len());
    Ok(list)
}

fn parse_list_at(
    source: &str,
    base: usize,
    context: ListContext,
) -> Result<SelectorList, SelectorParseError> {
    let tokens = tokenize_selector(source);
    let mut starts = Vec::with_capacity(tokens.len());
    let mut offset = 0usize;
    for token in &tokens {
        starts.push(offset);
        offset = offset.saturating_add(token.value.len());
    }
    ListParser {
        source,
        base,
        context,
        tokens,
        starts,
        index: 0,
        selectors: Vec::new(),
        current: SelectorBuilder::default(),
    }
    .parse()
}

/// The selector being built.
#[derive(Default)]
struct SelectorBuilder {
    steps: Vec<SelectorStep>,
    nodes: Vec<SimpleSelectorNode>,
    regular: String,
    regular_start: usize,
    pending: Option<Combinator>,
    /// `pending` was written explicitly (`>`, `+`, `~`) rather than implied by whitespace.
    explicit: bool,
    remove: bool,
}

impl SelectorBuilder {
    fn has_compound(&self) -> bool {
        !self.regular.is_empty() || !self.nodes.is_empty()
    }
}

struct ListParser<'input> {
    source: &'input str,
    base: usize,
    context: ListContext,
    tokens: Vec<Token<'input>>,
    starts: Vec<usize>,
    index: usize,
    selectors: Vec<Selector>,
    current: SelectorBuilder,
}

impl<'input> ListParser<'input> {
    fn error(&self, kind: ErrorKind, local: usize) -> SelectorParseError {
        SelectorParseError::new(kind, self.base.saturating_add(local))
    }

    /// Byte offset of token `index` within `source`.
    fn local_position(&self, index: usize) -> usize {
        self.starts.get(index).copied().unwrap_or(self.source.len())
    }

    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.index).copied()
    }

    fn bump(&mut self) -> Option<(Token<'input>, usize)> {
        let token = self.peek()?;
        let at = self.local_position(self.index);
        self.index = self.index.saturating_add(1);
        Some((token, at))
    }

    fn parse(mut self) -> Result<SelectorList, SelectorParseError> {
        while let Some((token, at)) = self.bump() {
            if self.current.remove && !(token.is_whitespace() || token.is_mark(',')) {
                return Err(self.error(ErrorKind::MisplacedRemove, at));
            }
            let Some(mark) = token.mark() else {
                self.push_word(token.value, at)?;
                continue;
            };
            match mark {
                ws if is_selector_whitespace(ws) => self.push_whitespace()?,
                '>' => self.push_combinator(Combinator::Child, at)?,
                '+' => self.push_combinator(Combinator::NextSibling, at)?,
                '~' => self.push_combinator(Combinator::SubsequentSibling, at)?,
                ',' => self.finish_selector(at)?,
                '[' => self.consume_attribute(at)?,
                ':' => self.consume_pseudo(at)?,
                '\\' => self.consume_escape(at),
                '/' => {
                    let kind = if self
                        .peek()
                        .is_some_and(|next| next.value.starts_with('*'))
                    {
                        ErrorKind::Comment
                    } else {
                        ErrorKind::UnexpectedCharacter('/')
                    };
                    return Err(self.error(kind, at));
                }
                ']' => return Err(self.error(ErrorKind::UnbalancedBracket, at)),
                '(' | ')' => return Err(self.error(ErrorKind::UnbalancedParenthesis, at)),
                other => return Err(self.error(ErrorKind::UnexpectedCharacter(other), at)),
            }
        }
        self.finish_selector(self.source.len())?;
        Ok(SelectorList {
            selectors: self.selectors,
        })
    }

    fn start_regular(&mut self, at: usize) {
        if self.current.regular.is_empty() {
            self.current.regular_start = at;
        }
    }

    fn push_word(&mut self, word: &str, at: usize) -> Result<(), SelectorParseError> {
        if !self.current.has_compound() && word.starts_with('@') {
            return Err(self.error(ErrorKind::AtRule, at));
        }
        self.start_regular(at);
        self.current.regular.push_str(word);
        Ok(())
    }

    fn consume_escape(&mut self, at: usize) {
        self.start_regular(at);
        self.current.regular.push('\\');
        if let Some((next, _)) = self.bump() {
            self.current.regular.push_str(next.value);
        }
    }

    fn push_whitespace(&mut self) -> Result<(), SelectorParseError> {
        if self.current.has_compound() {
            self.flush_compound()?;
            self.current.pending = Some(Combinator::Descendant);
            self.current.explicit = false;
        }
        Ok(())
    }

    fn push_combinator(
        &mut self,
        combinator: Combinator,
        at: usize,
    ) -> Result<(), SelectorParseError> {
        let had_compound = self.current.has_compound();
        self.flush_compound()?;
        if self.current.explicit {
            return Err(self.error(ErrorKind::MisplacedCombinator, at));
        }
        let leading = !had_compound && self.current.steps.is_empty();
        if leading && self.context != ListContext::Relative {
            return Err(self.error(ErrorKind::MisplacedCombinator, at));
        }
        self.current.pending = Some(combinator);
        self.current.explicit = true;
        Ok(())
    }

    /// Move the regular buffer into the compound, validating it as standard CSS.
    fn flush_regular(&mut self) -> Result<(), SelectorParseError> {
        if self.current.regular.is_empty() {
            return Ok(());
        }
        let text = mem::take(&mut self.current.regular);
        if let Err(err) = css_selectors::parse_complex_selector(&text) {
            let position = self.current.regular_start.saturating_add(err.position);
            return Err(self.error(ErrorKind::InvalidStandardSelector(err.to_string()), position));
        }
        self.current
            .nodes
            .push(SimpleSelectorNode::Regular(RegularSelector { text }));
        Ok(())
    }

    /// Close the current compound into a step.
    fn flush_compound(&mut self) -> Result<(), SelectorParseError> {
        self.flush_regular()?;
        if self.current.nodes.is_empty() {
            return Ok(());
        }
        let mut nodes = mem::take(&mut self.current.nodes);
        if !matches!(nodes.first(), Some(SimpleSelectorNode::Regular(_))) {
            nodes.insert(0, SimpleSelectorNode::Regular(RegularSelector::default()));
        }
        let combinator = self.current.pending.take().unwrap_or_default();
        self.current.explicit = false;
        self.current.steps.push(SelectorStep { combinator, nodes });
        Ok(())
    }

    fn finish_selector(&mut self, at: usize) -> Result<(), SelectorParseError> {
        self.flush_compound()?;
        if self.current.explicit {
            return Err(self.error(ErrorKind::MisplacedCombinator, at));
        }
        if self.current.steps.is_empty() {
            return Err(self.error(ErrorKind::Empty, at));
        }
        let finished = mem::take(&mut self.current);
        self.selectors.push(Selector {
            steps: finished.steps,
            remove: finished.remove,
        });
        Ok(())
    }

    /// `[...]`, copied verbatim into the regular buffer.
    fn consume_attribute(&mut self, open_at: usize) -> Result<(), SelectorParseError> {
        self.start_regular(open_at);
        self.current.regular.push('[');
        let mut quote: Option<char> = None;
        while let Some((token, _)) = self.bump() {
            self.current.regular.push_str(token.value);
            match (quote, token.mark()) {
                (_, Some('\\')) => {
                    if let Some((escaped, _)) = self.bump() {
                        self.current.regular.push_str(escaped.value);
                    }
                }
                (Some(open), Some(mark)) if mark == open => quote = None,
                (None, Some(mark @ ('"' | '\''))) => quote = Some(mark),
                (None, Some(']')) => return Ok(()),
                _ => {}
            }
        }
        let kind = if quote.is_some() {
            ErrorKind::UnterminatedQuote
        } else {
            ErrorKind::UnbalancedBracket
        };
        Err(self.error(kind, open_at))
    }

    fn consume_pseudo(&mut self, colon_at: usize) -> Result<(), SelectorParseError> {
        let Some((token, _)) = self.bump() else {
            return Err(self.error(ErrorKind::MissingPseudoName, colon_at));
        };
        if token.is_mark(':') {
            let name = self
                .peek()
                .filter(|next| next.kind == TokenKind::Word)
                .map(|next| next.value.to_owned())
                .unwrap_or_default();
            return Err(self.error(ErrorKind::PseudoElement(name), colon_at));
        }
        if token.kind != TokenKind::Word {
            return Err(self.error(ErrorKind::MissingPseudoName, colon_at));
        }
        let word = token.value;
        let name_len = word
            .find(|character: char| {
                !(character.is_ascii_alphanumeric() || matches!(character, '-' | '_'))
            })
            .unwrap_or(word.len());
        let name = word.get(..name_len).unwrap_or_default().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.error(ErrorKind::MissingPseudoName, colon_at));
        }
        let has_rest = name_len < word.len();
        let has_paren = !has_rest && self.peek().is_some_and(|next| next.is_mark('('));

        if let Some(kind) = ExtendedKind::from_name(&name) {
            if !has_paren {
                return Err(self.error(ErrorKind::MissingArgument(name), colon_at));
            }
            let Some((_, open_at)) = self.bump() else {
                return Err(self.error(ErrorKind::MissingArgument(name), colon_at));
            };
            let (arg, arg_at) =
                self.consume_argument(open_at, kind.regex_openers(), kind.tracks_quotes())?;
            return self.push_extended(kind, name, arg, arg_at, colon_at);
        }
        if !css_selectors::is_standard_pseudo_class(&name) {
            return Err(self.error(ErrorKind::UnknownPseudoClass(name), colon_at));
        }
        self.start_regular(colon_at);
        self.current.regular.push(':');
        self.current.regular.push_str(word);
        if has_paren && let Some((_, open_at)) = self.bump() {
            let (arg, _) = self.consume_argument(open_at, None, true)?;
            self.current.regular.push('(');
            self.current.regular.push_str(arg);
            self.current.regular.push(')');
        }
        Ok(())
    }

    /// Consume a parenthesized argument whose `(` is at `open_at`. Returns the raw argument
    /// text and its offset.
    fn consume_argument(
        &mut self,
        open_at: usize,
        regex_openers: Option<&[char]>,
        quotes: bool,
    ) -> Result<(&'input str, usize), SelectorParseError> {
        let source = self.source;
        let arg_start = self.local_position(self.index);
        let mut depth = 1usize;
        let mut state = ArgState::Plain;
        while let Some((token, at)) = self.bump() {
            let Some(mark) = token.mark() else {
                continue;
            };
            match state {
                ArgState::Regex => match mark {
                    '\\' => self.index = self.index.saturating_add(1),
                    '/' => state = ArgState::Plain,
                    _ => {}
                },
                ArgState::Quoted(quote) => match mark {
                    '\\' => self.index = self.index.saturating_add(1),
                    closing if closing == quote => state = ArgState::Plain,
                    _ => {}
                },
                ArgState::Plain => match mark {
                    '\\' => self.index = self.index.saturating_add(1),
                    '"' | '\'' if quotes => state = ArgState::Quoted(mark),
                    '(' => depth = depth.saturating_add(1),
                    ')' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            let arg = source.get(arg_start..at).unwrap_or_default();
                            return Ok((arg, arg_start));
                        }
                    }
                    '/' if regex_openers.is_some_and(|openers| {
                        let before = source.get(arg_start..at).unwrap_or_default();
                        before
                            .trim_end()
                            .chars()
                            .last()
                            .is_none_or(|last| openers.contains(&last))
                    }) =>
                    {
                        state = ArgState::Regex;
                    }
                    _ => {}
                },
            }
        }
        let kind = match state {
            ArgState::Regex => ErrorKind::UnterminatedRegex,
            ArgState::Quoted(_) => ErrorKind::UnterminatedQuote,
            ArgState::Plain => ErrorKind::UnbalancedParenthesis,
        };
        Err(self.error(kind, open_at))
    }

    fn push_extended(
        &mut self,
        kind: ExtendedKind,
        name: String,
        arg: &str,
        arg_at: usize,
        colon_at: usize,
    ) -> Result<(), SelectorParseError> {
        match kind {
            ExtendedKind::Remove => {
                if self.context != ListContext::TopLevel || !arg.trim().is_empty() {
                    return Err(self.error(ErrorKind::MisplacedRemove, colon_at));
                }
                self.current.remove = true;
                Ok(())
            }
            ExtendedKind::Relative(relative) => {
                let (inner, skipped) = strip_scope(arg);
                let inner_context = if relative == RelativeKind::Has {
                    ListContext::Relative
                } else {
                    ListContext::Nested
                };
                let nested_base = self.base.saturating_add(arg_at).saturating_add(skipped);
                let list = parse_list_at(inner, nested_base, inner_context)?;
                if relative != RelativeKind::Has && list.is_regular() {
                    // Plain `:is()`/`:not()` stay in the standard fragment.
                    self.start_regular(colon_at);
                    self.current.regular.push(':');
                    self.current.regular.push_str(&name);
                    self.current.regular.push('(');
                    self.current.regular.push_str(arg);
                    self.current.regular.push(')');
                    return Ok(());
                }
                self.flush_regular()?;
                self.current.nodes.push(SimpleSelectorNode::RelativeExtended(
                    RelativeExtendedSelector {
                        name,
                        kind: relative,
                        list: Box::new(list),
                    },
                ));
                Ok(())
            }
            ExtendedKind::Contains
            | ExtendedKind::MatchesCss(_)
            | ExtendedKind::MatchesAttr
            | ExtendedKind::MatchesProperty
            | ExtendedKind::Xpath
            | ExtendedKind::NthAncestor
            | ExtendedKind::Upward => {
                let pseudo = pseudo::parse_absolute(kind, arg).map_err(|reason| {
                    self.error(
                        ErrorKind::InvalidPseudoArgument {
                            name: name.clone(),
                            reason,
                        },
                        arg_at,
                    )
                })?;
                self.flush_regular()?;
                self.current.nodes.push(SimpleSelectorNode::AbsoluteExtended(
                    AbsoluteExtendedSelector {
                        name,
                        raw_arg: arg.to_owned(),
                        pseudo,
                    },
                ));
                Ok(())
            }
        }
    }
}

/// Strip a leading `:scope` from a relative argument. Returns the rest and how many bytes were
/// skipped.
fn strip_scope(arg: &str) -> (&str, usize) {
    let trimmed = arg.trim_start();
    let leading = arg.len().saturating_sub(trimmed.len());
    let Some(prefix) = trimmed.get(..6) else {
        return (arg, 0);
    };
    if !prefix.eq_ignore_ascii_case(":scope") {
        return (arg, 0);
    }
    let rest = trimmed.get(6..).unwrap_or_default();
    if rest
        .chars()
        .next()
        .is_some_and(|next| next.is_ascii_alphanumeric() || matches!(next, '-' | '_' | '('))
    {
        return (arg, 0);
    }
    (rest, leading.saturating_add(6))
}
