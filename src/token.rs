//! Positions, token kinds and tokens shared by every lexer in this crate.
use std::fmt;
use std::sync::Arc;

/// A location in the input stream.
///
/// All coordinates count runes (Unicode scalar values), not bytes. `offset`
/// starts at 0, `line` and `column` start at 1. Consuming a `'\n'` increments
/// `line` and resets `column` to 1; consuming any other rune increments
/// `column`. Every consumed rune increments `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// Name of the input, if any. Shared so that positions stay cheap to
    /// clone while tokens are produced in bulk.
    pub filename: Option<Arc<str>>,
    /// Rune offset from the start of the input, starting at 0.
    pub offset: usize,
    /// Line number, starting at 1.
    pub line: usize,
    /// Column within the line in runes, starting at 1.
    pub column: usize,
}

impl Position {
    /// Creates a position at the start of an unnamed input.
    pub fn start() -> Self {
        Position {
            filename: None,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Creates a position with the given coordinates and no filename.
    pub fn at(offset: usize, line: usize, column: usize) -> Self {
        Position {
            filename: None,
            offset,
            line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filename) = &self.filename {
            write!(f, "{}:{}:{}", filename, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// An opaque, integer-like token tag.
///
/// Lexer authors define their own kinds using non-negative values. Negative
/// values are reserved by the runtime: [`TokenKind::EOF`] terminates every
/// token stream, and [`ScanLexer`][crate::ScanLexer] emits the remaining
/// reserved kinds. Punctuation tokens produced by `ScanLexer` use the rune's
/// numeric value as their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenKind(pub i32);

impl TokenKind {
    /// End of input. The final token of every stream has this kind.
    pub const EOF: TokenKind = TokenKind(-1);
    /// An identifier, as classified by [`ScanLexer`][crate::ScanLexer].
    pub const IDENT: TokenKind = TokenKind(-2);
    /// An integer literal.
    pub const INT: TokenKind = TokenKind(-3);
    /// A floating point literal.
    pub const FLOAT: TokenKind = TokenKind(-4);
    /// A character literal, quotes included.
    pub const CHAR: TokenKind = TokenKind(-5);
    /// A string literal, quotes included.
    pub const STRING: TokenKind = TokenKind(-6);
    /// A raw (backquoted) string literal, quotes included.
    pub const RAW_STRING: TokenKind = TokenKind(-7);
    /// A line or block comment.
    pub const COMMENT: TokenKind = TokenKind(-8);

    /// The kind used for a single-rune punctuation token.
    pub const fn from_rune(rune: char) -> TokenKind {
        TokenKind(rune as i32)
    }
}

/// A classified substring of the input together with its source span.
///
/// `value` is the literal text matched. `start` is the position of its first
/// rune and `end` the position immediately after its last rune. Tokens of
/// kind [`TokenKind::EOF`] have an empty value and `start == end`, the read
/// position at the end of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token's kind.
    pub kind: TokenKind,
    /// The matched text.
    pub value: String,
    /// Position of the first rune of the token.
    pub start: Position,
    /// Position immediately after the last rune of the token.
    pub end: Position,
}

impl Token {
    /// Creates the EOF token for a stream ending at `pos`.
    pub fn eof_at(pos: Position) -> Token {
        Token {
            kind: TokenKind::EOF,
            value: String::new(),
            start: pos.clone(),
            end: pos,
        }
    }

    /// Returns whether this token terminates the stream.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EOF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "{}: <EOF>", self.start)
        } else {
            write!(f, "{}: {}", self.start, self.value)
        }
    }
}
