//! The error model shared by scanners, lexers, parsers and the driver.
use std::io;

use thiserror::Error;

use crate::token::{Position, Token};

/// A syntax error with a message and the source location it refers to.
///
/// Lex and parse states are expected to wrap whatever goes wrong with the
/// position of the offending token, so that a user staring at a large input
/// can find the problem.
#[derive(Error, Debug)]
#[error("{msg}: {pos}")]
pub struct SyntaxError {
    /// Description of what was expected or found.
    pub msg: String,
    /// Where the problem was found.
    pub pos: Position,
}

/// Any error surfaced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An IO error from the underlying reader, including invalid UTF-8.
    #[error("error reading input: {0}")]
    Io(#[from] io::Error),
    /// A syntax error reported by a lex or parse state.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// The input ended where a state required further tokens.
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(Position),
    /// The shared [`CancelToken`][crate::CancelToken] was canceled.
    #[error("canceled")]
    Canceled,
}

impl Error {
    /// Creates a syntax error at the given position.
    pub fn syntax(msg: impl Into<String>, pos: Position) -> Error {
        Error::Syntax(SyntaxError {
            msg: msg.into(),
            pos,
        })
    }

    /// Creates a syntax error naming an unexpected token.
    ///
    /// EOF tokens produce an [`Error::UnexpectedEof`] instead, so states can
    /// use this for any token that does not fit.
    pub fn unexpected_token(token: &Token) -> Error {
        if token.is_eof() {
            Error::UnexpectedEof(token.start.clone())
        } else {
            Error::syntax(
                format!("unexpected token {:?}", token.value),
                token.start.clone(),
            )
        }
    }

    /// Returns whether this error is a cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}
