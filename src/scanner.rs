//! A buffered rune scanner with two cursors: a read head and a token start.
use std::io::{self, BufReader, Cursor, Read};
use std::mem;

use crate::error::Error;
use crate::token::{Position, Token, TokenKind};

/// Minimum number of runes requested from the decoder when a lookahead
/// request exceeds the buffered amount. Amortizes refills for callers that
/// peek a single rune at a time.
const MIN_LOOKAHEAD: usize = 16;

/// Number of consumed runes after which the lookahead buffer is realigned.
const REALIGN_LIMIT: usize = 4 << 10;

/// A rune-oriented view of a byte stream, optimized for hand-rolled lexers.
///
/// The scanner maintains two cursors into the input: the *read head*, which
/// is the position of the next rune to be read, and the *token cursor*,
/// which marks the start of the token currently being built. Runes consumed
/// with [`advance`][Self::advance] or [`next_rune`][Self::next_rune] are
/// appended to an internal token builder; runes consumed with
/// [`discard`][Self::discard] are dropped and move the token cursor along
/// with the read head. [`emit`][Self::emit] turns the builder into a
/// [`Token`] spanning both cursors.
///
/// Like the buffered readers it is modeled on, the scanner reads the input
/// in chunks and serves lookahead requests zero-copy out of a decoded rune
/// buffer. It never issues more read requests than needed to satisfy the
/// current request, so line-buffered interactive input stays usable.
///
/// Error handling is deferred: a read failure or invalid UTF-8 discovered
/// while refilling does not invalidate the runes decoded before the error
/// point. Only once the lookahead is exhausted does the error surface, and
/// from then on it is sticky: every operation behaves as if the input had
/// ended, and the first error stays retrievable through
/// [`error`][Self::error]. Reaching the end of input is not an error.
pub struct Scanner<'a> {
    read: Box<dyn Read + Send + 'a>,
    /// Decoded lookahead; `runes[pos..]` is the unconsumed window.
    runes: Vec<char>,
    pos: usize,
    /// Raw bytes read but not yet decoded. Outside of `refill` this holds at
    /// most an incomplete trailing UTF-8 sequence.
    bytes: Vec<u8>,
    complete: bool,
    /// Error discovered during a refill, not yet reached by the cursor.
    pending_error: Option<Error>,
    /// Error surfaced once the lookahead before it was exhausted.
    error: Option<Error>,
    read_pos: Position,
    token_start: Position,
    token: String,
    chunk_size: usize,
}

impl<'a> Scanner<'a> {
    const DEFAULT_CHUNK_SIZE: usize = 8 << 10;

    /// Creates a scanner for the data of a [`Read`] instance.
    ///
    /// If the instance is a [`BufReader`], prefer
    /// [`from_buf_reader`][Self::from_buf_reader] to avoid double buffering.
    pub fn from_read(read: impl Read + Send + 'a) -> Self {
        Scanner {
            read: Box::new(read),
            runes: Vec::new(),
            pos: 0,
            bytes: Vec::new(),
            complete: false,
            pending_error: None,
            error: None,
            read_pos: Position::start(),
            token_start: Position::start(),
            token: String::new(),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Creates a scanner for the data of a [`BufReader`], absorbing any
    /// already buffered contents instead of discarding them.
    pub fn from_buf_reader(buf_reader: BufReader<impl Read + Send + 'a>) -> Self {
        let buffered = buf_reader.buffer().to_vec();
        if buffered.is_empty() {
            Self::from_read(buf_reader.into_inner())
        } else {
            Self::from_read(Cursor::new(buffered).chain(buf_reader.into_inner()))
        }
    }

    /// Sets the number of bytes requested from the reader at once.
    ///
    /// This is an upper bound on individual read requests; the underlying
    /// reader may return less.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(4);
    }

    /// Qualifies every position produced from now on with a filename.
    ///
    /// Call this before scanning; positions already handed out are not
    /// updated.
    pub fn set_filename(&mut self, filename: impl Into<std::sync::Arc<str>>) {
        let filename = filename.into();
        self.read_pos.filename = Some(filename.clone());
        self.token_start.filename = Some(filename);
    }

    /// Returns the position of the read head.
    pub fn pos(&self) -> Position {
        self.read_pos.clone()
    }

    /// Returns the position of the token cursor, the start of the token
    /// currently being built.
    pub fn cursor(&self) -> Position {
        self.token_start.clone()
    }

    /// Returns the current line of the read head (one-based).
    pub fn line(&self) -> usize {
        self.read_pos.line
    }

    /// Returns the current column of the read head (one-based).
    pub fn column(&self) -> usize {
        self.read_pos.column
    }

    /// Returns the contents of the token builder.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the width in runes of the token currently being built.
    pub fn width(&self) -> usize {
        self.read_pos.offset - self.token_start.offset
    }

    /// Returns the first non-EOF error the scanner has run into, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Consumes the scanner, returning the first non-EOF error if any.
    pub fn into_error(self) -> Option<Error> {
        self.error
    }

    /// Returns the next rune without advancing, or `None` at end of input
    /// or after a sticky error.
    pub fn peek(&mut self) -> Option<char> {
        self.peek_n(1).first().copied()
    }

    /// Returns up to `n` runes of lookahead without advancing.
    ///
    /// Returns fewer runes at end of input without signaling an error. The
    /// slice borrows the scanner's internal buffer and is invalidated by the
    /// next operation.
    pub fn peek_n(&mut self, n: usize) -> &[char] {
        if self.error.is_some() {
            return &[];
        }
        self.fill(n);
        let avail = self.available();
        &self.runes[self.pos..self.pos + avail.min(n)]
    }

    /// Advances the read head by one rune, appending it to the token
    /// builder, and returns it. Returns `None` at end of input or after a
    /// sticky error.
    pub fn next_rune(&mut self) -> Option<char> {
        if self.error.is_some() {
            return None;
        }
        self.fill(1);
        if self.available() == 0 {
            return None;
        }
        let rune = self.runes[self.pos];
        self.consume_buffered(1, true);
        Some(rune)
    }

    /// Advances the read head by one rune, appending it to the token
    /// builder. Returns whether a rune was actually consumed.
    pub fn advance(&mut self) -> bool {
        self.advance_n(1) == 1
    }

    /// Advances the read head by up to `n` runes, appending them to the
    /// token builder, and returns the number actually consumed.
    pub fn advance_n(&mut self, n: usize) -> usize {
        self.consume(n, true)
    }

    /// Discards the next rune: the read head and the token cursor both
    /// advance and the token builder is reset. Returns whether a rune was
    /// actually consumed.
    pub fn discard(&mut self) -> bool {
        self.discard_n(1) == 1
    }

    /// Discards up to `n` runes, advancing the token cursor to the new read
    /// position, and returns the number actually consumed.
    pub fn discard_n(&mut self, n: usize) -> usize {
        self.consume(n, false)
    }

    /// Resets the token cursor to the read position and clears the builder,
    /// dropping whatever was consumed since the last token boundary.
    pub fn ignore(&mut self) {
        self.token.clear();
        self.token_start = self.read_pos.clone();
    }

    /// Emits the token between the token cursor and the read head.
    ///
    /// The builder is cleared and the token cursor advances to the read
    /// position, so the next token starts here.
    pub fn emit(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            kind,
            value: mem::take(&mut self.token),
            start: self.token_start.clone(),
            end: self.read_pos.clone(),
        };
        self.token_start = self.read_pos.clone();
        token
    }

    /// Advances the read head until one of `candidates` appears as a prefix
    /// at the read position, appending the runes passed over to the token
    /// builder. The token cursor does not move.
    ///
    /// Returns the candidate found, or `None` when the input ends first (or
    /// the candidate set is empty). On `None` the runes scanned remain in
    /// the builder.
    pub fn find<'q>(&mut self, candidates: &[&'q str]) -> Option<&'q str> {
        self.search(candidates, true)
    }

    /// Like [`find`][Self::find], but the runes preceding the match are
    /// discarded: the token cursor advances to the match position.
    pub fn discard_to<'q>(&mut self, candidates: &[&'q str]) -> Option<&'q str> {
        self.search(candidates, false)
    }

    fn search<'q>(&mut self, candidates: &[&'q str], keep: bool) -> Option<&'q str> {
        let max_len = candidates
            .iter()
            .map(|q| q.chars().count())
            .max()
            .unwrap_or(0);
        if max_len == 0 {
            return None;
        }

        loop {
            if self.error.is_some() {
                return None;
            }
            self.fill(max_len.max(MIN_LOOKAHEAD));
            let avail = self.available();
            if avail == 0 {
                return None;
            }

            // Offsets that can be ruled out this round. Before the input is
            // complete only the first `avail - max_len + 1` offsets have a
            // full window behind them; a candidate straddling the buffer end
            // must be re-checked after the next refill.
            let checkable = if self.complete {
                avail
            } else {
                avail - max_len + 1
            };

            let mut found = None;
            'scan: for i in 0..checkable {
                for q in candidates {
                    if runes_start_with(&self.runes[self.pos + i..], q) {
                        found = Some((*q, i));
                        break 'scan;
                    }
                }
            }

            match found {
                Some((q, i)) => {
                    self.consume(i, keep);
                    return Some(q);
                }
                None => {
                    self.consume(checkable, keep);
                }
            }
        }
    }

    /// Consumes up to `n` buffered-or-readable runes, keeping or discarding.
    fn consume(&mut self, n: usize, keep: bool) -> usize {
        if self.error.is_some() {
            return 0;
        }
        let mut consumed = 0;
        while consumed < n {
            self.fill(n - consumed);
            let avail = self.available();
            if avail == 0 {
                break;
            }
            let take = avail.min(n - consumed);
            self.consume_buffered(take, keep);
            consumed += take;
        }
        if !keep {
            self.ignore();
        }
        consumed
    }

    /// Returns the number of unconsumed buffered runes, surfacing a pending
    /// error once the lookahead before it has been exhausted.
    fn available(&mut self) -> usize {
        let avail = self.runes.len() - self.pos;
        if avail == 0 && self.error.is_none() {
            self.error = self.pending_error.take();
        }
        avail
    }

    /// Consumes `take` runes that are already buffered, updating position
    /// counters and, when keeping, the token builder.
    fn consume_buffered(&mut self, take: usize, keep: bool) {
        for &rune in &self.runes[self.pos..self.pos + take] {
            self.read_pos.offset += 1;
            if rune == '\n' {
                self.read_pos.line += 1;
                self.read_pos.column = 1;
            } else {
                self.read_pos.column += 1;
            }
            if keep {
                self.token.push(rune);
            }
        }
        self.pos += take;
    }

    /// Tries to buffer at least `want` unconsumed runes, stopping early at
    /// end of input or on error.
    fn fill(&mut self, want: usize) {
        while self.runes.len() - self.pos < want && !self.complete {
            self.refill();
        }
    }

    /// Reads one chunk from the underlying reader and decodes it.
    fn refill(&mut self) {
        // Realign the lookahead buffer once enough has been consumed.
        if self.pos >= REALIGN_LIMIT {
            self.runes.drain(..self.pos);
            self.pos = 0;
        }

        let start = self.bytes.len();
        self.bytes.resize(start + self.chunk_size, 0);

        // A single successful read per refill keeps line-buffered input
        // responsive; only `Interrupted` is retried.
        let n = loop {
            match self.read.read(&mut self.bytes[start..]) {
                Ok(n) => {
                    // Load bearing: `n` is trusted below but Read
                    // implementations aren't.
                    assert!(n <= self.chunk_size, "invariant of std::io::Read violated");
                    break n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.bytes.truncate(start);
                    self.set_io_error(err);
                    return;
                }
            }
        };
        self.bytes.truncate(start + n);

        if n == 0 {
            self.complete = true;
            if !self.bytes.is_empty() {
                // The stream ended inside a UTF-8 sequence.
                self.bytes.clear();
                self.set_io_error(invalid_utf8());
            }
            return;
        }

        self.decode();
    }

    /// Decodes the valid UTF-8 prefix of `bytes` into the rune buffer,
    /// leaving at most an incomplete trailing sequence behind.
    fn decode(&mut self) {
        match std::str::from_utf8(&self.bytes) {
            Ok(decoded) => {
                self.runes.extend(decoded.chars());
                self.bytes.clear();
            }
            Err(err) => {
                let valid = err.valid_up_to();
                // The prefix was just validated.
                let decoded = unsafe { std::str::from_utf8_unchecked(&self.bytes[..valid]) };
                self.runes.extend(decoded.chars());
                if err.error_len().is_some() {
                    self.bytes.clear();
                    self.set_io_error(invalid_utf8());
                } else {
                    self.bytes.drain(..valid);
                }
            }
        }
    }

    fn set_io_error(&mut self, err: io::Error) {
        self.complete = true;
        if self.pending_error.is_none() && self.error.is_none() {
            self.pending_error = Some(Error::Io(err));
        }
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        "stream did not contain valid UTF-8",
    )
}

fn runes_start_with(runes: &[char], s: &str) -> bool {
    let mut runes = runes.iter();
    s.chars().all(|c| runes.next() == Some(&c))
}
