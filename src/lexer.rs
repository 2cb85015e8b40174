//! The lexer state machine and the token stream interface it implements.
use std::collections::VecDeque;
use std::io::Read;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::scanner::Scanner;
use crate::token::{Position, Token, TokenKind};

/// A stream of tokens ending in a token of kind [`TokenKind::EOF`].
///
/// `next_token` never returns nothing: at end of input, after an error, or
/// after cancellation it returns EOF tokens carrying the stream's end
/// position, so consumers can always report *where* the input stopped.
pub trait Lexer {
    /// Returns the next token from the input.
    fn next_token(&mut self, cx: &CancelToken) -> Token;

    /// Returns the first non-EOF error the lexer encountered, if any.
    ///
    /// Errors are sticky: once set, the error persists for the lifetime of
    /// the lexer and all further tokens are EOF.
    fn error(&self) -> Option<&Error>;

    /// Consumes the lexer, returning the first non-EOF error if any.
    fn into_error(self) -> Option<Error>
    where
        Self: Sized;
}

/// One state of a lexer state machine.
///
/// A state consumes input through the [`StateLexer`] passed to it, emits
/// zero or more tokens, and names its successor. Returning `Ok(None)`
/// finishes the stream normally; returning an error records it on the lexer
/// and ends the stream with EOF tokens.
///
/// The boxed receiver lets a state hand itself back as its own successor
/// without cloning.
pub trait LexState: Send {
    /// Processes input and returns the next state, or `None` when lexing is
    /// finished.
    fn run(
        self: Box<Self>,
        cx: &CancelToken,
        lx: &mut StateLexer<'_>,
    ) -> Result<Option<Box<dyn LexState>>, Error>;
}

struct LexFn<F>(F);

impl<F> LexState for LexFn<F>
where
    F: FnMut(&CancelToken, &mut StateLexer<'_>) -> Result<Option<Box<dyn LexState>>, Error>
        + Send
        + 'static,
{
    fn run(
        mut self: Box<Self>,
        cx: &CancelToken,
        lx: &mut StateLexer<'_>,
    ) -> Result<Option<Box<dyn LexState>>, Error> {
        (self.0)(cx, lx)
    }
}

/// Adapts a plain function (or closure) into a [`LexState`].
pub fn lex_fn<F>(f: F) -> Box<dyn LexState>
where
    F: FnMut(&CancelToken, &mut StateLexer<'_>) -> Result<Option<Box<dyn LexState>>, Error>
        + Send
        + 'static,
{
    Box::new(LexFn(f))
}

/// A lexer driven by user-defined [`LexState`]s over a [`Scanner`].
///
/// States interact with the input through the scanner operations re-exposed
/// here and queue tokens with [`emit`][Self::emit]. The runtime dequeues
/// tokens in emission order and runs the current state only when the queue
/// is empty. Once a state returns `None`, an error occurs, or the
/// cancellation token fires, the stream ends and every further call yields
/// an EOF token positioned at the read head.
pub struct StateLexer<'a> {
    scanner: Scanner<'a>,
    state: Option<Box<dyn LexState>>,
    pending: VecDeque<Token>,
    error: Option<Error>,
}

impl<'a> StateLexer<'a> {
    /// Creates a lexer reading from `read`, starting in `initial`.
    pub fn new(read: impl Read + Send + 'a, initial: Box<dyn LexState>) -> Self {
        Self::from_scanner(Scanner::from_read(read), initial)
    }

    /// Creates a lexer over an already configured [`Scanner`].
    pub fn from_scanner(scanner: Scanner<'a>, initial: Box<dyn LexState>) -> Self {
        StateLexer {
            scanner,
            state: Some(initial),
            pending: VecDeque::new(),
            error: None,
        }
    }

    /// Returns the position of the read head.
    pub fn pos(&self) -> Position {
        self.scanner.pos()
    }

    /// Returns the position of the token cursor.
    pub fn cursor(&self) -> Position {
        self.scanner.cursor()
    }

    /// Returns the current line of the read head (one-based).
    pub fn line(&self) -> usize {
        self.scanner.line()
    }

    /// Returns the current column of the read head (one-based).
    pub fn column(&self) -> usize {
        self.scanner.column()
    }

    /// Returns the contents of the token builder.
    pub fn token(&self) -> &str {
        self.scanner.token()
    }

    /// Returns the width in runes of the token being built.
    pub fn width(&self) -> usize {
        self.scanner.width()
    }

    /// Returns the next rune without advancing, or `None` at end of input.
    pub fn peek(&mut self) -> Option<char> {
        self.scanner.peek()
    }

    /// Returns up to `n` runes of lookahead without advancing.
    pub fn peek_n(&mut self, n: usize) -> &[char] {
        self.scanner.peek_n(n)
    }

    /// Advances one rune, appending it to the token builder.
    pub fn next_rune(&mut self) -> Option<char> {
        self.scanner.next_rune()
    }

    /// Advances one rune into the token builder; returns whether it did.
    pub fn advance(&mut self) -> bool {
        self.scanner.advance()
    }

    /// Advances up to `n` runes into the token builder.
    pub fn advance_n(&mut self, n: usize) -> usize {
        self.scanner.advance_n(n)
    }

    /// Discards the next rune, advancing the token cursor.
    pub fn discard(&mut self) -> bool {
        self.scanner.discard()
    }

    /// Discards up to `n` runes, advancing the token cursor.
    pub fn discard_n(&mut self, n: usize) -> usize {
        self.scanner.discard_n(n)
    }

    /// Searches for one of `candidates`, keeping the runes passed over.
    pub fn find<'q>(&mut self, candidates: &[&'q str]) -> Option<&'q str> {
        self.scanner.find(candidates)
    }

    /// Searches for one of `candidates`, discarding the runes passed over.
    pub fn discard_to<'q>(&mut self, candidates: &[&'q str]) -> Option<&'q str> {
        self.scanner.discard_to(candidates)
    }

    /// Drops the pending token text and restarts the token at the read head.
    pub fn ignore(&mut self) {
        self.scanner.ignore();
    }

    /// Emits the token built since the last token boundary and queues it for
    /// the consumer. Zero-width tokens are constructed and returned but not
    /// queued.
    pub fn emit(&mut self, kind: TokenKind) -> Token {
        let token = self.scanner.emit(kind);
        if !token.value.is_empty() {
            self.pending.push_back(token.clone());
        }
        token
    }

    fn eof_token(&self) -> Token {
        Token::eof_at(self.scanner.pos())
    }

    fn first_error(&self) -> Option<&Error> {
        self.scanner.error().or(self.error.as_ref())
    }

    fn record_error(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl Lexer for StateLexer<'_> {
    fn next_token(&mut self, cx: &CancelToken) -> Token {
        if self.first_error().is_some() {
            return self.eof_token();
        }

        while self.pending.is_empty() {
            if cx.is_canceled() {
                self.record_error(Error::Canceled);
                return self.eof_token();
            }
            let Some(state) = self.state.take() else {
                break;
            };
            match state.run(cx, self) {
                Ok(next) => self.state = next,
                Err(err) => {
                    self.record_error(err);
                    return self.eof_token();
                }
            }
            if self.first_error().is_some() {
                return self.eof_token();
            }
        }

        // EOF tokens stay queued so that they are returned again on every
        // subsequent call.
        if let Some(front) = self.pending.front() {
            if front.is_eof() {
                return front.clone();
            }
        }
        if let Some(token) = self.pending.pop_front() {
            return token;
        }
        self.eof_token()
    }

    fn error(&self) -> Option<&Error> {
        self.first_error()
    }

    fn into_error(self) -> Option<Error> {
        self.scanner.into_error().or(self.error)
    }
}
