//! Canonical tree construction
//!
//! [`TreeBuilder::build`] turns an arbitrary list of entries into the unique
//! tree for that entry set. [`TreeBuilder::splice`] produces the same tree
//! incrementally after a single-entry edit, rewriting only the chunks whose
//! boundaries the edit can move.

use super::chunker::Chunker;
use super::sequence::LevelItem;
use super::{Cursor, Entry, MetaTuple, ProllyConfig, Sequence};
use crate::value::CollectionType;
use crate::{CoreError, Result};
use cid::Cid;
use std::sync::Arc;
use tessera_blockstore::BlockStore;
use tracing::{debug, trace};

/// A chunk that has been written to the block store
#[derive(Clone, Debug)]
pub struct Sealed {
    /// Ref of the stored chunk
    pub cid: Cid,
    /// The chunk itself
    pub sequence: Arc<Sequence>,
}

impl Sealed {
    /// Tuple pointing at this chunk from the level above
    pub fn tuple(&self) -> Result<MetaTuple> {
        let key = self
            .sequence
            .last_key()
            .cloned()
            .ok_or_else(|| CoreError::TreeCorruption("cannot point at an empty chunk".to_string()))?;
        Ok(MetaTuple::new(self.cid, key, self.sequence.num_leaves()))
    }
}

/// Builds and rewrites trees for one collection type and chunking config
pub struct TreeBuilder<S: BlockStore> {
    store: Arc<S>,
    config: ProllyConfig,
    element_type: CollectionType,
}

impl<S: BlockStore> TreeBuilder<S> {
    /// Create a builder, rejecting unusable configurations
    pub fn new(store: Arc<S>, config: ProllyConfig, element_type: CollectionType) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            element_type,
        })
    }

    /// Build the canonical tree for `entries`.
    ///
    /// Entries may arrive in any order; when a key repeats the last entry for
    /// it wins.
    pub async fn build(&self, entries: Vec<Entry>) -> Result<Sealed> {
        for entry in &entries {
            self.element_type.check_entry(entry)?;
        }
        let entries = sort_and_dedup(entries);
        debug!(entries = entries.len(), "building tree");

        let leaves = self.chunk_level(entries).await?;
        self.finish_levels(leaves).await
    }

    /// Persist one chunk
    pub(crate) async fn seal<T: LevelItem>(&self, items: Vec<T>) -> Result<Sealed> {
        let sequence = T::seal(self.element_type, items);
        let cid = self.store.put_ipld(&sequence).await?;
        trace!(%cid, len = sequence.len(), leaf = sequence.is_leaf(), "sealed chunk");
        Ok(Sealed {
            cid,
            sequence: Arc::new(sequence),
        })
    }

    /// Chunk a complete level and persist every chunk
    pub(crate) async fn chunk_level<T: LevelItem>(&self, items: Vec<T>) -> Result<Vec<Sealed>> {
        let mut chunker = Chunker::new(&self.config);
        let mut sealed = Vec::new();
        for item in items {
            let (boundary, size) = item.chunk_input()?;
            if let Some(chunk) = chunker.push(item, &boundary, size) {
                sealed.push(self.seal(chunk).await?);
            }
        }
        if let Some(chunk) = chunker.finish() {
            sealed.push(self.seal(chunk).await?);
        }
        Ok(sealed)
    }

    /// Stack meta levels on top of `level` until a single chunk remains
    pub(crate) async fn finish_levels(&self, mut level: Vec<Sealed>) -> Result<Sealed> {
        loop {
            match level.len() {
                0 => return self.empty().await,
                1 => {
                    let root = level.remove(0);
                    debug!(root = %root.cid, "tree root");
                    return Ok(root);
                }
                n => {
                    let tuples = level
                        .iter()
                        .map(Sealed::tuple)
                        .collect::<Result<Vec<_>>>()?;
                    level = self.chunk_level(tuples).await?;
                    debug!(children = n, chunks = level.len(), "built meta level");
                }
            }
        }
    }

    /// Rewrite the tree after replacing the leaf under `path` with `entries`.
    ///
    /// At each level, starting with the leaves, the items from the start of
    /// the touched chunk onward are re-chunked, reading on through following
    /// chunks until a new boundary coincides with the end of an old chunk.
    /// From there on the old chunks are reused untouched. The tuples for the
    /// replaced run of chunks are then swapped in the parent level, which is
    /// re-chunked the same way, up to the root.
    pub async fn splice(&self, path: &Cursor<S>, entries: Vec<Entry>) -> Result<Sealed> {
        let leaf_depth = path.depth() - 1;
        let resume = path.frame(leaf_depth)?.sequence.len();
        let (mut sealed, mut replaced) = self.rechunk(path, leaf_depth, entries, resume).await?;

        for depth in (0..leaf_depth).rev() {
            let frame = path.frame(depth)?;
            let tuples = frame.sequence.as_meta()?.tuples();
            let mut head = tuples[..frame.index].to_vec();
            for chunk in &sealed {
                head.push(chunk.tuple()?);
            }
            let resume = frame.index + replaced;
            (sealed, replaced) = self.rechunk(path, depth, head, resume).await?;
        }

        let root = self.finish_levels(sealed).await?;
        self.collapse(root).await
    }

    /// Re-chunk one level from the start of the chunk `path` holds at
    /// `depth`. `head` replaces the old items before position `resume`
    /// (counted from that chunk's start); old items from `resume` on follow.
    ///
    /// Returns the new chunks and how many old chunks they replace.
    async fn rechunk<T: LevelItem>(
        &self,
        path: &Cursor<S>,
        depth: usize,
        head: Vec<T>,
        resume: usize,
    ) -> Result<(Vec<Sealed>, usize)> {
        let mut walker = path.clone();
        walker.truncate(depth);

        let mut chunker = Chunker::new(&self.config);
        let mut sealed = Vec::new();
        for item in head {
            let (boundary, size) = item.chunk_input()?;
            if let Some(chunk) = chunker.push(item, &boundary, size) {
                sealed.push(self.seal(chunk).await?);
            }
        }

        let mut start = 0;
        let mut replaced = 0;
        loop {
            let sequence = Arc::clone(&walker.frame(depth)?.sequence);
            let items = T::items(&sequence)?;
            let end = start + items.len();
            replaced += 1;

            for item in items.iter().skip(resume.saturating_sub(start)) {
                let (boundary, size) = item.chunk_input()?;
                if let Some(chunk) = chunker.push(item.clone(), &boundary, size) {
                    sealed.push(self.seal(chunk).await?);
                }
            }

            if end >= resume && chunker.at_boundary() {
                break;
            }
            if !walker.next_chunk(depth).await? {
                break;
            }
            start = end;
        }

        if let Some(chunk) = chunker.finish() {
            sealed.push(self.seal(chunk).await?);
        }
        trace!(depth, replaced, written = sealed.len(), "re-chunked level");
        Ok((sealed, replaced))
    }

    /// Drop meta roots with a single child, matching where a full build stops
    async fn collapse(&self, mut root: Sealed) -> Result<Sealed> {
        loop {
            let child = match root.sequence.as_ref() {
                Sequence::Meta(meta) if meta.len() == 1 => meta.tuples()[0].child,
                _ => return Ok(root),
            };
            let sequence: Sequence = self.store.get_ipld(&child).await?;
            root = Sealed {
                cid: child,
                sequence: Arc::new(sequence),
            };
        }
    }

    /// Persisted empty root for this collection type
    pub async fn empty(&self) -> Result<Sealed> {
        self.seal(Vec::<Entry>::new()).await
    }
}

/// Sort by key, keeping the last entry written for each key
fn sort_and_dedup(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    let mut result: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match result.last_mut() {
            Some(last) if last.key == entry.key => *last = entry,
            _ => result.push(entry),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueType};
    use tessera_blockstore::MemoryBlockStore;

    fn int_map() -> CollectionType {
        CollectionType::map(ValueType::Int, ValueType::Int)
    }

    fn small_config() -> ProllyConfig {
        ProllyConfig::default()
            .with_boundary_bits(2)
            .with_chunk_entries(2, 8)
    }

    fn builder(store: &Arc<MemoryBlockStore>, config: ProllyConfig) -> TreeBuilder<MemoryBlockStore> {
        TreeBuilder::new(Arc::clone(store), config, int_map()).unwrap()
    }

    fn entries(range: std::ops::Range<i64>) -> Vec<Entry> {
        range.map(|i| Entry::new(i, i * 10)).collect()
    }

    #[test]
    fn test_sort_and_dedup_keeps_last() {
        let sorted = sort_and_dedup(vec![
            Entry::new(3, 1),
            Entry::new(1, 1),
            Entry::new(3, 2),
            Entry::new(2, 1),
            Entry::new(3, 3),
        ]);
        assert_eq!(
            sorted,
            vec![Entry::new(1, 1), Entry::new(2, 1), Entry::new(3, 3)]
        );
    }

    #[tokio::test]
    async fn test_empty_build_is_stored_empty_leaf() {
        let store = Arc::new(MemoryBlockStore::new());
        let root = builder(&store, ProllyConfig::default())
            .build(Vec::new())
            .await
            .unwrap();

        assert!(root.sequence.is_leaf());
        assert!(root.sequence.is_empty());
        assert!(store.has_block(&root.cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_single_chunk_is_not_wrapped() {
        let store = Arc::new(MemoryBlockStore::new());
        let config = ProllyConfig::default().with_chunk_entries(16, 64);
        let root = builder(&store, config).build(entries(0..5)).await.unwrap();

        assert!(root.sequence.is_leaf());
        assert_eq!(root.sequence.len(), 5);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_large_keys_keep_meta_chunks_bounded() {
        let store = Arc::new(MemoryBlockStore::new());
        let ty = CollectionType::map(ValueType::String, ValueType::Int);
        let config = ProllyConfig::default();
        let big_keys: Vec<Entry> = (0..300i64)
            .map(|i| Entry::new(format!("{i:05}{}", "k".repeat(40_000)), i))
            .collect();

        let root = TreeBuilder::new(Arc::clone(&store), config.clone(), ty)
            .unwrap()
            .build(big_keys)
            .await
            .unwrap();
        assert_eq!(root.sequence.num_leaves(), 300);

        // Every chunk stops at the first item past the byte limit
        let mut level = vec![root.cid];
        while !level.is_empty() {
            let mut next = Vec::new();
            for cid in level {
                let size = store.block_size(&cid).await.unwrap() as usize;
                assert!(size < config.max_chunk_bytes + 2 * 41_000, "chunk of {size} bytes");
                let sequence: Sequence = store.get_ipld(&cid).await.unwrap();
                if let Sequence::Meta(meta) = sequence {
                    next.extend(meta.tuples().iter().map(|t| t.child));
                }
            }
            level = next;
        }
    }

    #[tokio::test]
    async fn test_build_produces_multiple_levels() {
        let store = Arc::new(MemoryBlockStore::new());
        let root = builder(&store, small_config())
            .build(entries(0..200))
            .await
            .unwrap();

        assert!(!root.sequence.is_leaf());
        assert_eq!(root.sequence.num_leaves(), 200);
        assert_eq!(root.sequence.last_key(), Some(&Value::from(199)));
        assert!(root.sequence.len() >= 2);
        assert_eq!(root.cid, root.sequence.cid().unwrap());
    }

    #[tokio::test]
    async fn test_build_rejects_wrong_types() {
        let store = Arc::new(MemoryBlockStore::new());
        let result = builder(&store, ProllyConfig::default())
            .build(vec![Entry::new(1, 1), Entry::new("two", 2)])
            .await;

        assert!(matches!(result, Err(CoreError::TypeMismatch { .. })));
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let store = Arc::new(MemoryBlockStore::new());
        let config = ProllyConfig::default().with_chunk_entries(1, 4);
        assert!(TreeBuilder::new(store, config, int_map()).is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_splice_matches_build() {
        let store = Arc::new(MemoryBlockStore::new());
        let builder = builder(&store, small_config());

        let base = builder.build(entries(0..300)).await.unwrap();
        let expected = builder
            .build(entries(0..300).into_iter().filter(|e| e.key != Value::from(150)).collect())
            .await
            .unwrap();

        let key = Value::from(150);
        let (path, exact) = Cursor::at_key(Arc::clone(&store), base.sequence, &key)
            .await
            .unwrap();
        assert!(exact);
        let mut leaf = path.leaf().unwrap().entries().to_vec();
        leaf.remove(path.leaf_index());

        let spliced = builder.splice(&path, leaf).await.unwrap();
        assert_eq!(spliced.cid, expected.cid);
    }
}
