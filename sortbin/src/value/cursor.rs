//! Synchronous map traversal with cooperative cancellation
//!
//! The cursor pulls one entry per [`advance`](MapCursor::advance) call; a
//! consumer that stops caring hands its [`CancelToken`] to whoever decides
//! and the cursor winds down at the next item boundary. No coroutines, no
//! coupled iterators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, ErrorKind};

use super::map::OrderedMap;

/// Requests early termination of a [`MapCursor`].
///
/// Cloneable and thread-safe; cancellation is observed at the next item
/// boundary, never mid-entry.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests termination
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether termination has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A synchronous cursor over an [`OrderedMap`].
///
/// `advance` moves to the next entry and reports whether one is available;
/// `key`/`value` read the current entry. After exhaustion or cancellation
/// the cursor is terminal: further `advance` calls return false.
#[derive(Debug)]
pub struct MapCursor<'a, K, V> {
    iter: indexmap::map::Iter<'a, K, V>,
    current: Option<(&'a K, &'a V)>,
    started: bool,
    finished: bool,
    cancel: CancelToken,
}

impl<'a, K, V> MapCursor<'a, K, V> {
    pub(crate) fn new(map: &'a OrderedMap<K, V>) -> Self {
        Self {
            iter: map.iter(),
            current: None,
            started: false,
            finished: false,
            cancel: CancelToken::new(),
        }
    }

    /// A handle that cancels this cursor at the next item boundary
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Moves to the next entry; false once the cursor is terminal
    pub fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.started = true;
        if self.cancel.is_cancelled() {
            self.current = None;
            self.finished = true;
            return false;
        }
        match self.iter.next() {
            Some(entry) => {
                self.current = Some(entry);
                true
            }
            None => {
                self.current = None;
                self.finished = true;
                false
            }
        }
    }

    /// The current entry's key
    pub fn key(&self) -> Result<&'a K, Error> {
        self.current().map(|(k, _)| k)
    }

    /// The current entry's value
    pub fn value(&self) -> Result<&'a V, Error> {
        self.current().map(|(_, v)| v)
    }

    /// Whether the cursor is terminal
    pub fn done(&self) -> bool {
        self.finished
    }

    fn current(&self) -> Result<(&'a K, &'a V), Error> {
        if !self.started {
            return Err(Error::new(
                ErrorKind::NotReadYet,
                "cursor read before the first advance",
            ));
        }
        self.current
            .ok_or_else(|| Error::new(ErrorKind::AlreadyRead, "cursor is exhausted"))
    }
}
