//! Cursors: root-to-leaf paths through a prolly tree
//!
//! A [`Cursor`] is a stack of frames, outermost first, each holding a chunk
//! and an index into it. Frames hold chunks through `Arc`, so cloning a cursor
//! is cheap and yields an independent snapshot that can be moved without
//! disturbing the original.

use super::{Entry, LeafSequence, Sequence};
use crate::value::Value;
use crate::{CoreError, Result};
use cid::Cid;
use std::sync::Arc;
use tessera_blockstore::BlockStore;
use tracing::trace;

/// One level of a cursor path
#[derive(Clone, Debug)]
pub struct Frame {
    /// The chunk at this level
    pub sequence: Arc<Sequence>,
    /// Position within the chunk
    pub index: usize,
}

impl Frame {
    fn child(&self) -> Result<Cid> {
        Ok(self.sequence.as_meta()?.tuple_at(self.index)?.child)
    }
}

/// A path from the root sequence down to one position in a leaf
pub struct Cursor<S: BlockStore> {
    store: Arc<S>,
    frames: Vec<Frame>,
}

impl<S: BlockStore> Clone for Cursor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            frames: self.frames.clone(),
        }
    }
}

impl<S: BlockStore> Cursor<S> {
    /// Descend to the first entry not less than `key`.
    ///
    /// Returns the cursor and whether it landed on an entry equal to `key`.
    /// When `key` is greater than every key the cursor sits past the end of
    /// the last leaf, which is also the insertion point for `key`.
    pub async fn at_key(store: Arc<S>, root: Arc<Sequence>, key: &Value) -> Result<(Self, bool)> {
        let mut frames = Vec::new();
        let mut sequence = root;
        loop {
            let child = match sequence.as_ref() {
                Sequence::Leaf(leaf) => {
                    let index = leaf.search(key);
                    let exact = leaf
                        .entries()
                        .get(index)
                        .is_some_and(|entry| &entry.key == key);
                    frames.push(Frame {
                        sequence: Arc::clone(&sequence),
                        index,
                    });
                    return Ok((Self { store, frames }, exact));
                }
                Sequence::Meta(meta) => {
                    if meta.is_empty() {
                        return Err(CoreError::TreeCorruption(
                            "empty meta sequence".to_string(),
                        ));
                    }
                    let index = meta.search(key).min(meta.len() - 1);
                    let child = meta.tuples()[index].child;
                    frames.push(Frame {
                        sequence: Arc::clone(&sequence),
                        index,
                    });
                    child
                }
            };
            sequence = load(store.as_ref(), &child, &frames).await?;
        }
    }

    /// Descend along the leftmost path to the smallest entry
    pub async fn leftmost(store: Arc<S>, root: Arc<Sequence>) -> Result<Self> {
        Self::edge(store, root, false).await
    }

    /// Descend along the rightmost path to the largest entry
    pub async fn rightmost(store: Arc<S>, root: Arc<Sequence>) -> Result<Self> {
        Self::edge(store, root, true).await
    }

    async fn edge(store: Arc<S>, root: Arc<Sequence>, right: bool) -> Result<Self> {
        let mut cursor = Self {
            store,
            frames: vec![Frame {
                sequence: root,
                index: 0,
            }],
        };
        cursor.settle(0, right)?;
        while !cursor.frames[cursor.frames.len() - 1].sequence.is_leaf() {
            cursor.push_child(right).await?;
        }
        Ok(cursor)
    }

    /// Number of frames, i.e. the height of the tree
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `depth`, where zero is the root
    pub fn frame(&self, depth: usize) -> Result<&Frame> {
        self.frames.get(depth).ok_or(CoreError::OutOfRange {
            index: depth,
            len: self.frames.len(),
        })
    }

    /// The leaf the cursor points into
    pub fn leaf(&self) -> Result<&LeafSequence> {
        self.leaf_frame().sequence.as_leaf()
    }

    /// Position within the current leaf
    pub fn leaf_index(&self) -> usize {
        self.leaf_frame().index
    }

    /// Whether the cursor points at an entry
    pub fn valid(&self) -> bool {
        let frame = self.leaf_frame();
        frame.index < frame.sequence.len()
    }

    /// The entry under the cursor, `OutOfRange` once past the end
    pub fn current(&self) -> Result<&Entry> {
        self.leaf()?.entry_at(self.leaf_index())
    }

    /// Move to the next entry, loading sibling leaves as needed.
    ///
    /// Returns false and parks the cursor past the end when no entry follows.
    pub async fn advance(&mut self) -> Result<bool> {
        let depth = self.frames.len() - 1;
        self.advance_frame(depth).await
    }

    /// Move to the previous entry.
    ///
    /// Returns false and leaves the cursor unchanged at the first entry.
    pub async fn retreat(&mut self) -> Result<bool> {
        let depth = self.frames.len() - 1;
        let mut level = depth;
        loop {
            let frame = &mut self.frames[level];
            if frame.index > 0 {
                frame.index -= 1;
                break;
            }
            if level == 0 {
                return Ok(false);
            }
            level -= 1;
        }
        self.frames.truncate(level + 1);
        while self.frames.len() <= depth {
            self.push_child(true).await?;
        }
        Ok(true)
    }

    /// Move the frame at `depth` to its next item, crossing chunk boundaries
    /// through the ancestors. Frames below `depth` are dropped.
    pub(crate) async fn advance_frame(&mut self, depth: usize) -> Result<bool> {
        self.frames.truncate(depth + 1);
        let mut level = depth;
        loop {
            let frame = &mut self.frames[level];
            if frame.index + 1 < frame.sequence.len() {
                frame.index += 1;
                break;
            }
            if level == 0 {
                let frame = &mut self.frames[depth];
                frame.index = frame.sequence.len();
                return Ok(false);
            }
            level -= 1;
        }
        self.frames.truncate(level + 1);
        while self.frames.len() <= depth {
            self.push_child(false).await?;
        }
        Ok(true)
    }

    /// Move the frame at `depth` to the start of the next chunk on its level.
    pub(crate) async fn next_chunk(&mut self, depth: usize) -> Result<bool> {
        if depth == 0 {
            return Ok(false);
        }
        if !self.advance_frame(depth - 1).await? {
            return Ok(false);
        }
        self.push_child(false).await?;
        Ok(true)
    }

    /// Keep only the frames from the root down to `depth`
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth + 1);
    }

    fn leaf_frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn settle(&mut self, depth: usize, right: bool) -> Result<()> {
        let frame = &mut self.frames[depth];
        if right {
            frame.index = frame.sequence.len().saturating_sub(1);
        }
        if !frame.sequence.is_leaf() && frame.sequence.is_empty() {
            return Err(CoreError::TreeCorruption("empty meta sequence".to_string()));
        }
        Ok(())
    }

    async fn push_child(&mut self, right: bool) -> Result<()> {
        let child = self.leaf_frame().child()?;
        let sequence = load(self.store.as_ref(), &child, &self.frames).await?;
        self.frames.push(Frame { sequence, index: 0 });
        let depth = self.frames.len() - 1;
        self.settle(depth, right)
    }
}

/// Fetch a child chunk and check it carries its parent's type descriptor
async fn load<S: BlockStore>(store: &S, cid: &Cid, path: &[Frame]) -> Result<Arc<Sequence>> {
    trace!(%cid, depth = path.len(), "loading chunk");
    let sequence: Sequence = store.get_ipld(cid).await?;
    if let Some(parent) = path.last() {
        let expected = parent.sequence.element_type();
        if sequence.element_type() != expected {
            return Err(CoreError::TypeMismatch {
                expected: format!("{expected:?}"),
                actual: format!("{:?}", sequence.element_type()),
            });
        }
    }
    Ok(Arc::new(sequence))
}
