//! Mark/word tokenizer.
//!
//! Every character is either a one-character mark or part of a word, and a word is the longest
//! run of non-mark characters. Quotes and escapes are not tracked here; callers that care keep
//! that state themselves. Concatenating the token values always yields the input.

/// Token class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A single character from the mark alphabet.
    Mark,
    /// A maximal run of non-mark characters.
    Word,
}

/// One token, borrowing its text from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token<'input> {
    pub kind: TokenKind,
    pub value: &'input str,
}

impl Token<'_> {
    /// The mark character, or `None` for words.
    pub fn mark(&self) -> Option<char> {
        match self.kind {
            TokenKind::Mark => self.value.chars().next(),
            TokenKind::Word => None,
        }
    }

    /// True for a mark token equal to `character`.
    pub fn is_mark(&self, character: char) -> bool {
        self.mark() == Some(character)
    }

    /// True for a whitespace mark.
    pub fn is_whitespace(&self) -> bool {
        self.mark().is_some_and(is_selector_whitespace)
    }
}

/// Whitespace as CSS defines it.
pub const fn is_selector_whitespace(character: char) -> bool {
    matches!(character, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// The mark alphabet the selector parser tokenizes with.
pub const SELECTOR_MARKS: &[char] = &[
    ' ', '\t', '\n', '\r', '\x0c', '>', '+', '~', ',', '[', ']', '(', ')', ':', '"', '\'', '\\',
    '/', '{', '}',
];

/// Split `input` into mark and word tokens using `marks` as the mark alphabet.
pub fn tokenize<'input>(input: &'input str, marks: &[char]) -> Vec<Token<'input>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    for (index, character) in input.char_indices() {
        if !marks.contains(&character) {
            word_start.get_or_insert(index);
            continue;
        }
        if let Some(start) = word_start.take() {
            tokens.push(Token {
                kind: TokenKind::Word,
                value: input.get(start..index).unwrap_or_default(),
            });
        }
        let end = index.saturating_add(character.len_utf8());
        tokens.push(Token {
            kind: TokenKind::Mark,
            value: input.get(index..end).unwrap_or_default(),
        });
    }
    if let Some(start) = word_start {
        tokens.push(Token {
            kind: TokenKind::Word,
            value: input.get(start..).unwrap_or_default(),
        });
    }
    tokens
}

/// Tokenize with [`SELECTOR_MARKS`].
pub fn tokenize_selector(input: &str) -> Vec<Token<'_>> {
    tokenize(input, SELECTOR_MARKS)
}
