//! Lazy forward iteration over a prolly tree
//!
//! A [`ProllyIter`] is an explicit state machine driven by [`ProllyIter::next`]
//! and [`ProllyIter::stop`]. It holds a cursor and fetches sibling chunks
//! from the block store only as it reaches them.

use super::{Cursor, Entry, Sequence};
use crate::value::Value;
use crate::{CoreError, Result};
use futures::Stream;
use std::sync::Arc;
use tessera_blockstore::BlockStore;
use tracing::trace;

/// Lifecycle of an iterator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterState {
    /// Created, nothing fetched yet
    Fresh,
    /// Positioned on an entry
    Active,
    /// Ran past the last entry
    Done,
    /// Stopped by the caller
    Cancelled,
}

impl IterState {
    /// Whether `next` will yield nothing more
    pub fn is_terminal(&self) -> bool {
        matches!(self, IterState::Done | IterState::Cancelled)
    }
}

/// One-shot ascending iterator over the entries of a tree
pub struct ProllyIter<S: BlockStore> {
    store: Arc<S>,
    root: Arc<Sequence>,
    start: Option<Value>,
    cursor: Option<Cursor<S>>,
    state: IterState,
}

impl<S: BlockStore> ProllyIter<S> {
    /// Iterator from the first entry not less than `start`, or from the
    /// smallest entry when `start` is `None`
    pub(crate) fn new(store: Arc<S>, root: Arc<Sequence>, start: Option<Value>) -> Self {
        Self {
            store,
            root,
            start,
            cursor: None,
            state: IterState::Fresh,
        }
    }

    pub fn state(&self) -> IterState {
        self.state
    }

    /// Next entry in key order, `None` once finished or stopped
    pub async fn next(&mut self) -> Result<Option<Entry>> {
        match self.state {
            IterState::Done | IterState::Cancelled => return Ok(None),
            IterState::Fresh => {
                let store = Arc::clone(&self.store);
                let root = Arc::clone(&self.root);
                let cursor = match &self.start {
                    Some(key) => Cursor::at_key(store, root, key).await?.0,
                    None => Cursor::leftmost(store, root).await?,
                };
                self.cursor = Some(cursor);
                self.state = IterState::Active;
            }
            IterState::Active => {
                let cursor = self.cursor.as_mut().ok_or_else(|| {
                    CoreError::InvalidState("active iterator without a cursor".to_string())
                })?;
                cursor.advance().await?;
            }
        }

        match self.cursor.as_ref() {
            Some(cursor) if cursor.valid() => Ok(Some(cursor.current()?.clone())),
            _ => {
                trace!("iterator exhausted");
                self.finish(IterState::Done);
                Ok(None)
            }
        }
    }

    /// Cancel the iteration and release the chunks it holds
    pub fn stop(&mut self) -> Result<()> {
        if self.state == IterState::Cancelled {
            return Err(CoreError::InvalidState(
                "iterator already stopped".to_string(),
            ));
        }
        self.finish(IterState::Cancelled);
        Ok(())
    }

    /// Adapt into a stream that ends after the last entry or the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<Entry>> {
        futures::stream::unfold(self, |mut iter| async move {
            match iter.next().await {
                Ok(Some(entry)) => Some((Ok(entry), iter)),
                Ok(None) => None,
                Err(err) => {
                    iter.finish(IterState::Done);
                    Some((Err(err), iter))
                }
            }
        })
    }

    fn finish(&mut self, state: IterState) {
        self.cursor = None;
        self.state = state;
    }
}
