//! Couples a lexer and a parser running concurrently.
use std::sync::mpsc;
use std::thread;

use crate::cancel::CancelToken;
use crate::lexer::Lexer;
use crate::parser::{ParseOutcome, ParseState, Parser, TokenSource};
use crate::token::{Position, Token};

/// Capacity of the token queue between the lexer and the parser.
const TOKEN_QUEUE_CAPACITY: usize = 1024;

/// A [`TokenSource`] dequeuing from the driver's token queue.
struct QueueSource {
    rx: mpsc::Receiver<Token>,
    end: Position,
}

impl TokenSource for QueueSource {
    fn next_token(&mut self, _cx: &CancelToken) -> Token {
        match self.rx.recv() {
            Ok(token) => {
                self.end = token.end.clone();
                token
            }
            // The producer is gone; the stream ends where the last token
            // ended.
            Err(_) => Token::eof_at(self.end.clone()),
        }
    }
}

/// Runs `lexer` and a parser started in `initial` concurrently, streaming
/// tokens through a bounded queue, and returns the parse tree.
///
/// The lexer runs on its own thread and enqueues tokens in emission order,
/// up to and including the EOF token. The parser runs on the calling
/// thread. When the parser returns — successfully or not — the driver
/// cancels a token derived from `cx` and stops receiving, so a lexer still
/// mid-stream winds down promptly.
///
/// The returned [`ParseOutcome`] carries the parser's error if it failed.
/// If the parser succeeded but the lexer failed with something other than
/// cancellation, the lexer's error is surfaced instead. Cancelling `cx`
/// stops both sides and yields [`Error::Canceled`][crate::Error::Canceled]
/// with the partial tree.
pub fn lex_parse<V, L>(
    cx: &CancelToken,
    lexer: L,
    initial: Box<dyn ParseState<V>>,
) -> ParseOutcome<V>
where
    V: Default,
    L: Lexer + Send,
{
    let local = cx.child();
    let (tx, rx) = mpsc::sync_channel(TOKEN_QUEUE_CAPACITY);

    thread::scope(|scope| {
        let pump = scope.spawn({
            let local = local.clone();
            let mut lexer = lexer;
            move || {
                loop {
                    let token = lexer.next_token(&local);
                    let is_eof = token.is_eof();
                    if tx.send(token).is_err() || is_eof {
                        break;
                    }
                }
                lexer.into_error()
            }
        });

        let source = QueueSource {
            rx,
            end: Position::default(),
        };
        let mut outcome = Parser::new(source, initial).parse(&local);

        // The parser is done; shut the lexer down. Dropping the receiver
        // (it lived inside the parser) already unblocked any pending send.
        local.cancel();
        let lex_error = match pump.join() {
            Ok(error) => error,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        if outcome.error.is_none() {
            if let Some(err) = lex_error {
                if !err.is_canceled() {
                    outcome.error = Some(err);
                }
            }
        }
        outcome
    })
}
