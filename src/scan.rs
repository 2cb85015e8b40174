//! A ready-made lexer for source-code-like input.
use std::io::Read;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::lexer::Lexer;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

/// A [`Lexer`] that tokenizes source-code-like input without any
/// user-defined states.
///
/// It skips whitespace and produces tokens with the reserved kinds
/// [`TokenKind::IDENT`], [`TokenKind::INT`], [`TokenKind::FLOAT`],
/// [`TokenKind::CHAR`], [`TokenKind::STRING`], [`TokenKind::RAW_STRING`] and
/// [`TokenKind::COMMENT`]. Any other rune becomes a single-rune punctuation
/// token whose kind is the rune's numeric value, so a parser can match
/// `token.kind == TokenKind::from_rune('(')`.
///
/// Malformed literals (an unterminated string, a comment that never closes)
/// record a sticky error; all tokens after that are EOF.
pub struct ScanLexer<'a> {
    scanner: Scanner<'a>,
    error: Option<Error>,
}

impl<'a> ScanLexer<'a> {
    /// Creates a lexer reading from `read`.
    pub fn new(read: impl Read + Send + 'a) -> Self {
        Self::from_scanner(Scanner::from_read(read))
    }

    /// Creates a lexer over an already configured [`Scanner`].
    pub fn from_scanner(scanner: Scanner<'a>) -> Self {
        ScanLexer {
            scanner,
            error: None,
        }
    }

    fn eof_token(&self) -> Token {
        Token::eof_at(self.scanner.pos())
    }

    fn first_error(&self) -> Option<&Error> {
        self.scanner.error().or(self.error.as_ref())
    }

    fn record_error(&mut self, err: Error) -> Token {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.eof_token()
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while matches!(self.scanner.peek(), Some(rune) if pred(rune)) {
            self.scanner.advance();
        }
    }

    fn scan_number(&mut self) -> Token {
        let first = self.scanner.peek();
        self.scanner.advance();

        if first == Some('0') && matches!(self.scanner.peek(), Some('x' | 'X')) {
            self.scanner.advance();
            self.eat_while(|c| c.is_ascii_hexdigit());
            return self.scanner.emit(TokenKind::INT);
        }

        // A leading '.' means the integer part was empty.
        let mut is_float = first == Some('.');
        self.eat_while(|c| c.is_ascii_digit());

        if !is_float && self.scanner.peek() == Some('.') {
            is_float = true;
            self.scanner.advance();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.scanner.peek(), Some('e' | 'E')) {
            is_float = true;
            self.scanner.advance();
            if matches!(self.scanner.peek(), Some('+' | '-')) {
                self.scanner.advance();
            }
            self.eat_while(|c| c.is_ascii_digit());
        }

        if is_float {
            self.scanner.emit(TokenKind::FLOAT)
        } else {
            self.scanner.emit(TokenKind::INT)
        }
    }

    /// Scans a quote-delimited literal with backslash escapes. The opening
    /// quote has already been consumed.
    fn scan_quoted(&mut self, quote: char, kind: TokenKind, what: &str) -> Token {
        loop {
            match self.scanner.peek() {
                Some(rune) if rune == quote => {
                    self.scanner.advance();
                    return self.scanner.emit(kind);
                }
                Some('\\') => {
                    self.scanner.advance();
                    self.scanner.advance();
                }
                Some('\n') | None => {
                    let pos = self.scanner.cursor();
                    return self.record_error(Error::syntax(
                        format!("{what} literal not terminated"),
                        pos,
                    ));
                }
                Some(_) => {
                    self.scanner.advance();
                }
            }
        }
    }

    fn scan_raw_string(&mut self) -> Token {
        // Raw strings run to the closing backquote and may span lines.
        match self.scanner.find(&["`"]) {
            Some(_) => {
                self.scanner.advance();
                self.scanner.emit(TokenKind::RAW_STRING)
            }
            None => {
                let pos = self.scanner.cursor();
                self.record_error(Error::syntax("raw string literal not terminated", pos))
            }
        }
    }

    fn scan_comment_or_punct(&mut self) -> Token {
        let lookahead: String = self.scanner.peek_n(2).iter().collect();
        self.scanner.advance();
        match lookahead.as_str() {
            "//" => {
                self.eat_while(|c| c != '\n');
                self.scanner.emit(TokenKind::COMMENT)
            }
            "/*" => {
                self.scanner.advance();
                match self.scanner.find(&["*/"]) {
                    Some(_) => {
                        self.scanner.advance_n(2);
                        self.scanner.emit(TokenKind::COMMENT)
                    }
                    None => {
                        let pos = self.scanner.cursor();
                        self.record_error(Error::syntax("comment not terminated", pos))
                    }
                }
            }
            _ => self.scanner.emit(TokenKind::from_rune('/')),
        }
    }
}

impl Lexer for ScanLexer<'_> {
    fn next_token(&mut self, cx: &CancelToken) -> Token {
        if self.first_error().is_some() {
            return self.eof_token();
        }
        if cx.is_canceled() {
            return self.record_error(Error::Canceled);
        }

        while matches!(self.scanner.peek(), Some(rune) if rune.is_whitespace()) {
            self.scanner.discard();
        }

        let Some(rune) = self.scanner.peek() else {
            return self.eof_token();
        };

        match rune {
            c if c.is_alphabetic() || c == '_' => {
                self.eat_while(|c| c.is_alphanumeric() || c == '_');
                self.scanner.emit(TokenKind::IDENT)
            }
            '0'..='9' => self.scan_number(),
            '.' => {
                if matches!(self.scanner.peek_n(2).get(1), Some(c) if c.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.scanner.advance();
                    self.scanner.emit(TokenKind::from_rune('.'))
                }
            }
            '\'' => {
                self.scanner.advance();
                self.scan_quoted('\'', TokenKind::CHAR, "char")
            }
            '"' => {
                self.scanner.advance();
                self.scan_quoted('"', TokenKind::STRING, "string")
            }
            '`' => {
                self.scanner.advance();
                self.scan_raw_string()
            }
            '/' => self.scan_comment_or_punct(),
            c => {
                self.scanner.advance();
                self.scanner.emit(TokenKind::from_rune(c))
            }
        }
    }

    fn error(&self) -> Option<&Error> {
        self.first_error()
    }

    fn into_error(self) -> Option<Error> {
        self.scanner.into_error().or(self.error)
    }
}
