//! The parser state machine: a LIFO stack of states editing a [`Tree`].
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::lexer::Lexer;
use crate::token::{Position, Token};
use crate::tree::{NodeId, Tree};

/// Anything a parser can pull tokens from.
///
/// The source must always terminate with a token of kind
/// [`TokenKind::EOF`][crate::TokenKind::EOF] carrying the end position, and
/// keep returning it once reached. Every [`Lexer`] is a `TokenSource`, which
/// couples a lexer and a parser synchronously without a queue;
/// [`lex_parse`][crate::lex_parse] couples them through a bounded queue
/// instead.
pub trait TokenSource {
    /// Returns the next token.
    fn next_token(&mut self, cx: &CancelToken) -> Token;
}

impl<L: Lexer> TokenSource for L {
    fn next_token(&mut self, cx: &CancelToken) -> Token {
        Lexer::next_token(self, cx)
    }
}

/// What a [`ParseState`] asks the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep driving the state stack.
    Continue,
    /// Stop parsing successfully, regardless of remaining states.
    Done,
}

/// One state of a parser state machine.
///
/// States run off a stack owned by the [`Parser`]: the driver pops the top
/// state and runs it; a state schedules further work by pushing states with
/// [`Parser::push_state`]. Parsing ends when the stack is empty, when a
/// state returns [`Step::Done`], or with the first error.
pub trait ParseState<V> {
    /// Processes tokens and edits the tree.
    fn run(&mut self, cx: &CancelToken, p: &mut Parser<'_, V>) -> Result<Step, Error>;
}

struct ParseFn<F>(F);

impl<V, F> ParseState<V> for ParseFn<F>
where
    F: FnMut(&CancelToken, &mut Parser<'_, V>) -> Result<Step, Error>,
{
    fn run(&mut self, cx: &CancelToken, p: &mut Parser<'_, V>) -> Result<Step, Error> {
        (self.0)(cx, p)
    }
}

/// Adapts a plain function (or closure) into a [`ParseState`].
pub fn parse_fn<V, F>(f: F) -> Box<dyn ParseState<V>>
where
    F: FnMut(&CancelToken, &mut Parser<'_, V>) -> Result<Step, Error> + 'static,
{
    Box::new(ParseFn(f))
}

/// The result of driving a parser to completion.
///
/// The tree is always present; when `error` is set it holds whatever was
/// built before the failure, which is useful for diagnostics.
#[derive(Debug)]
pub struct ParseOutcome<V> {
    /// The parse tree, possibly partial.
    pub tree: Tree<V>,
    /// The error that stopped parsing, if any.
    pub error: Option<Error>,
}

impl<V> ParseOutcome<V> {
    /// Converts into a `Result`, dropping the partial tree on error.
    pub fn into_result(self) -> Result<Tree<V>, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.tree),
        }
    }
}

/// A stack-driven parser building a [`Tree`] from a token stream.
///
/// The parser keeps a *cursor node*, the place in the tree where new nodes
/// are added. [`push`][Self::push] adds a child and moves the cursor down,
/// [`node`][Self::node] adds a child in place, [`climb`][Self::climb] moves
/// back up. [`new_node`][Self::new_node] allocates unattached nodes (for
/// bottom-up construction, e.g. by a Pratt expression state) which
/// [`attach`][Self::attach] or [`set_root`][Self::set_root] link into the
/// tree.
///
/// New nodes take their position from the most recently consumed token, or
/// the default position before the first [`next`][Self::next].
pub struct Parser<'a, V> {
    source: Box<dyn TokenSource + 'a>,
    stack: Vec<Box<dyn ParseState<V>>>,
    tree: Tree<V>,
    cursor: NodeId,
    current: Option<Token>,
    peeked: Option<Token>,
}

impl<'a, V: Default> Parser<'a, V> {
    /// Creates a parser reading from `source`, with a default-valued root
    /// node and `initial` as the first state to run.
    pub fn new(source: impl TokenSource + 'a, initial: Box<dyn ParseState<V>>) -> Self {
        let tree = Tree::with_root(V::default());
        let root = tree.root();
        Parser {
            source: Box::new(source),
            stack: vec![initial],
            tree,
            cursor: root,
            current: None,
            peeked: None,
        }
    }
}

impl<'a, V> Parser<'a, V> {
    /// Drives the state stack to completion and returns the tree together
    /// with the first error, if any.
    pub fn parse(mut self, cx: &CancelToken) -> ParseOutcome<V> {
        let error = self.drive(cx).err();
        ParseOutcome {
            tree: self.tree,
            error,
        }
    }

    fn drive(&mut self, cx: &CancelToken) -> Result<(), Error> {
        while let Some(mut state) = self.stack.pop() {
            if cx.is_canceled() {
                return Err(Error::Canceled);
            }
            match state.run(cx, self)? {
                Step::Continue => {}
                Step::Done => break,
            }
        }
        Ok(())
    }

    /// Returns the next token without consuming it. Idempotent until the
    /// next [`next`][Self::next].
    pub fn peek(&mut self, cx: &CancelToken) -> &Token {
        let Parser { peeked, source, .. } = self;
        peeked.get_or_insert_with(|| source.next_token(cx))
    }

    /// Consumes and returns the next token. New nodes created from now on
    /// take this token's start position.
    pub fn next(&mut self, cx: &CancelToken) -> Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.source.next_token(cx),
        };
        self.current = Some(token.clone());
        token
    }

    /// Returns the most recently consumed token, if any.
    pub fn current_token(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn current_pos(&self) -> Position {
        self.current
            .as_ref()
            .map(|token| token.start.clone())
            .unwrap_or_default()
    }

    /// Returns the tree built so far.
    pub fn tree(&self) -> &Tree<V> {
        &self.tree
    }

    /// Returns the root node.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Returns the cursor node: where new children are added.
    pub fn pos(&self) -> NodeId {
        self.cursor
    }

    /// Adds a child under the cursor node, moves the cursor to it and
    /// returns it.
    pub fn push(&mut self, value: V) -> NodeId {
        let id = self.node(value);
        self.cursor = id;
        id
    }

    /// Adds a child under the cursor node without moving the cursor.
    pub fn node(&mut self, value: V) -> NodeId {
        let id = self.tree.add(value, self.current_pos());
        self.tree.attach(self.cursor, id);
        id
    }

    /// Allocates an unattached node at the current token position.
    pub fn new_node(&mut self, value: V) -> NodeId {
        self.tree.add(value, self.current_pos())
    }

    /// Attaches an unattached node as the last child of `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.tree.attach(parent, child);
    }

    /// Moves the cursor to its parent and returns the previous cursor.
    /// A no-op at the root.
    pub fn climb(&mut self) -> NodeId {
        let previous = self.cursor;
        if let Some(parent) = self.tree.parent(previous) {
            self.cursor = parent;
        }
        previous
    }

    /// Replaces the cursor node's value in place, stamping it with the
    /// current token position. The node keeps its children and its place
    /// among its siblings. Returns the previous value.
    pub fn replace(&mut self, value: V) -> V {
        let pos = self.current_pos();
        self.tree.replace(self.cursor, value, pos)
    }

    /// Makes `id` the root of the tree and moves the cursor to it.
    pub fn set_root(&mut self, id: NodeId) {
        self.tree.set_root(id);
        self.cursor = id;
    }

    /// Pushes states onto the state stack so that the first listed state
    /// runs first.
    pub fn push_state<I>(&mut self, states: I)
    where
        I: IntoIterator<Item = Box<dyn ParseState<V>>>,
        I::IntoIter: DoubleEndedIterator,
    {
        for state in states.into_iter().rev() {
            self.stack.push(state);
        }
    }
}
