//! Cooperative cancellation shared between a lexer and a parser.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation flag shared between the tasks of a lex/parse run.
///
/// Cloning a token yields another handle to the same flag. [`child`]
/// derives a token that is canceled when either it or any of its ancestors
/// is canceled; the driver uses this to shut the lexer down when the parser
/// returns without canceling the caller's token.
///
/// Cancellation is sticky and only observed at `next_token` boundaries:
/// a lexer that sees a canceled token records [`Error::Canceled`]
/// [crate::Error::Canceled] and produces EOF tokens from then on, and a
/// parser returns its partial tree with the same error.
///
/// [`child`]: CancelToken::child
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    canceled: AtomicBool,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// Creates a fresh, un-canceled token with no parent.
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Derives a token that is canceled when `self` or the child is.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Requests cancellation. Ancestors are unaffected.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
    }

    /// Returns whether this token or any ancestor has been canceled.
    pub fn is_canceled(&self) -> bool {
        if self.inner.canceled.load(Ordering::Acquire) {
            return true;
        }
        match &self.inner.parent {
            Some(parent) => parent.is_canceled(),
            None => false,
        }
    }
}
