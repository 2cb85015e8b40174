//! Lexstrom is a collection of utilities for writing hand-rolled lexers and
//! parsers over character streams.
//!
//! It is not a parser generator and defines no grammar language. Instead it
//! provides the runtime that hand-written lexical analyzers and
//! recursive-descent or Pratt parsers tend to need, for a particular
//! combination of constraints:
//!
//! * _Streaming_: input is consumed through a buffered rune scanner over any
//!   [`Read`][std::io::Read] instance, so inputs need not fit in memory and
//!   line-buffered interactive input stays usable. Lookahead is served
//!   zero-copy out of the scanner's decoded buffer.
//!
//! * _Explicit state machines_: a lexer is a chain of [`LexState`]s, each
//!   consuming input, emitting tokens and naming its successor; a parser is
//!   a LIFO stack of [`ParseState`]s editing a generic [`Tree`] through a
//!   movable cursor node. Both come with adapters ([`lex_fn`], [`parse_fn`])
//!   so that states without data can be plain functions.
//!
//! * _Position-aware error reporting_: every token carries start and end
//!   [`Position`]s counted in runes, EOF is a value rather than an error
//!   (the final token of every stream is [`TokenKind::EOF`] with a real end
//!   position), and the error types are built to carry source locations, so
//!   a parser can always say *where* the input went wrong.
//!
//! * _Coupled, cancelable execution_: [`lex_parse`] runs a lexer and a
//!   parser concurrently, streaming tokens through a bounded queue in
//!   strict emission order, with a shared [`CancelToken`] and a single
//!   composed error. A [`Lexer`] is also a [`TokenSource`], so the two can
//!   just as well be coupled synchronously without a queue.
//!
//! ## Writing a lexer
//!
//! Lex states work against the two-cursor model of the [`Scanner`]: the
//! *read head* is where the next rune is read, the *token cursor* marks the
//! start of the token being built. Advancing appends runes to the token,
//! discarding drops them and moves both cursors, and
//! [`emit`][StateLexer::emit] cuts a [`Token`] spanning the two cursors:
//!
//! ```rust
//! use lexstrom::{lex_fn, CancelToken, Error, LexState, Lexer, StateLexer, TokenKind};
//!
//! const WORD: TokenKind = TokenKind(1);
//!
//! fn lex_words(
//!     _cx: &CancelToken,
//!     lx: &mut StateLexer<'_>,
//! ) -> Result<Option<Box<dyn LexState>>, Error> {
//!     match lx.peek() {
//!         Some(c) if c.is_whitespace() => {
//!             lx.emit(WORD);
//!             lx.discard();
//!         }
//!         Some(_) => {
//!             lx.advance();
//!         }
//!         None => {
//!             lx.emit(WORD);
//!             return Ok(None);
//!         }
//!     }
//!     Ok(Some(lex_fn(lex_words)))
//! }
//!
//! let cx = CancelToken::new();
//! let mut lexer = StateLexer::new(&b"two words"[..], lex_fn(lex_words));
//! assert_eq!(lexer.next_token(&cx).value, "two");
//! assert_eq!(lexer.next_token(&cx).value, "words");
//! assert!(lexer.next_token(&cx).is_eof());
//! ```
//!
//! ## Writing a parser
//!
//! Parse states pull tokens with [`Parser::next`]/[`Parser::peek`] and grow
//! the tree with [`Parser::push`], [`Parser::node`] and [`Parser::climb`];
//! [`Parser::push_state`] schedules the states that should run next. The
//! driver returns a [`ParseOutcome`] that always carries the tree — partial
//! on failure — together with the first error.
#![warn(missing_docs)]

mod cancel;
mod driver;
mod error;
mod lexer;
mod parser;
mod scan;
mod scanner;
mod token;
mod tree;

pub use cancel::CancelToken;
pub use driver::lex_parse;
pub use error::{Error, SyntaxError};
pub use lexer::{lex_fn, LexState, Lexer, StateLexer};
pub use parser::{parse_fn, ParseOutcome, ParseState, Parser, Step, TokenSource};
pub use scan::ScanLexer;
pub use scanner::Scanner;
pub use token::{Position, Token, TokenKind};
pub use tree::{NodeId, Tree};
