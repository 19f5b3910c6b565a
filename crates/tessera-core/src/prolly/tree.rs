//! Prolly Tree implementation
//!
//! [`ProllyTree`] is an immutable ordered collection. Every mutation returns
//! a new tree that shares all untouched chunks with the old one.

use super::builder::TreeBuilder;
use super::{
    diff_trees, Cursor, Entry, KeyValueChange, LeafSequence, ProllyConfig, ProllyIter, Sequence,
};
use crate::value::{CollectionType, Value};
use crate::Result;
use cid::Cid;
use std::sync::Arc;
use tessera_blockstore::BlockStore;
use tracing::{debug, instrument};

/// An immutable, content-addressed ordered collection
pub struct ProllyTree<S: BlockStore> {
    /// The root chunk
    root: Arc<Sequence>,
    /// Ref of the root chunk
    root_cid: Cid,
    /// Block store holding every chunk below the root
    store: Arc<S>,
    /// Chunking configuration used by mutations
    config: ProllyConfig,
}

impl<S: BlockStore> Clone for ProllyTree<S> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            root_cid: self.root_cid,
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: BlockStore> ProllyTree<S> {
    /// Create a new empty tree
    pub fn new(store: Arc<S>, element_type: CollectionType) -> Result<Self> {
        Self::with_config(store, element_type, ProllyConfig::default())
    }

    /// Create an empty tree with custom configuration
    pub fn with_config(
        store: Arc<S>,
        element_type: CollectionType,
        config: ProllyConfig,
    ) -> Result<Self> {
        let root = Sequence::from(LeafSequence::empty(element_type));
        Self::from_sequence(store, root, config)
    }

    /// Build the canonical tree for `entries`, in any order
    #[instrument(skip(store, entries), fields(entries = entries.len()))]
    pub async fn from_entries(
        store: Arc<S>,
        element_type: CollectionType,
        config: ProllyConfig,
        entries: Vec<Entry>,
    ) -> Result<Self> {
        let builder = TreeBuilder::new(Arc::clone(&store), config.clone(), element_type)?;
        let root = builder.build(entries).await?;
        Ok(Self {
            root: root.sequence,
            root_cid: root.cid,
            store,
            config,
        })
    }

    /// Wrap an existing root chunk.
    ///
    /// The root is not written to the store until [`ProllyTree::flush`]; the
    /// chunks it points at must already be there.
    pub fn from_sequence(store: Arc<S>, root: Sequence, config: ProllyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root_cid: root.cid()?,
            root: Arc::new(root),
            store,
            config,
        })
    }

    /// Load a tree from an existing root CID
    pub async fn load(store: Arc<S>, root_cid: Cid) -> Result<Self> {
        let root: Sequence = store.get_ipld(&root_cid).await?;
        Ok(Self {
            root: Arc::new(root),
            root_cid,
            store,
            config: ProllyConfig::default(),
        })
    }

    /// Get the root CID
    pub fn root_cid(&self) -> &Cid {
        &self.root_cid
    }

    pub fn root(&self) -> &Arc<Sequence> {
        &self.root
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ProllyConfig {
        &self.config
    }

    /// Type descriptor of the collection
    pub fn element_type(&self) -> CollectionType {
        self.root.element_type()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.root.is_leaf() && self.root.is_empty()
    }

    /// Number of entries, read from the root's counts
    pub fn len(&self) -> u64 {
        self.root.num_leaves()
    }

    /// Refs held directly by the root chunk
    pub fn chunks(&self) -> Vec<Cid> {
        self.root.chunks()
    }

    /// Number of levels from the root down to the leaves
    pub async fn height(&self) -> Result<usize> {
        Ok(self.leftmost().await?.depth())
    }

    /// Get the entry stored under `key`
    #[instrument(skip(self))]
    pub async fn get_entry(&self, key: &Value) -> Result<Option<Entry>> {
        let (cursor, exact) = self.seek(key).await?;
        if exact {
            Ok(Some(cursor.current()?.clone()))
        } else {
            Ok(None)
        }
    }

    /// Get a value by key
    pub async fn get(&self, key: &Value) -> Result<Option<Value>> {
        Ok(self.get_entry(key).await?.and_then(|entry| entry.value))
    }

    /// Check whether `key` is present
    #[instrument(skip(self))]
    pub async fn has(&self, key: &Value) -> Result<bool> {
        Ok(self.seek(key).await?.1)
    }

    /// Entry with the smallest key
    pub async fn first(&self) -> Result<Option<Entry>> {
        let cursor = self.leftmost().await?;
        cursor.valid().then(|| cursor.current().cloned()).transpose()
    }

    /// Entry with the largest key
    pub async fn last(&self) -> Result<Option<Entry>> {
        let cursor = Cursor::rightmost(Arc::clone(&self.store), Arc::clone(&self.root)).await?;
        cursor.valid().then(|| cursor.current().cloned()).transpose()
    }

    /// Visit every entry in ascending key order
    pub async fn for_each<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Entry),
    {
        let mut cursor = self.leftmost().await?;
        while cursor.valid() {
            visit(cursor.current()?);
            cursor.advance().await?;
        }
        Ok(())
    }

    /// Collect all entries in order
    pub async fn entries(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::with_capacity(self.len() as usize);
        self.for_each(|entry| entries.push(entry.clone())).await?;
        Ok(entries)
    }

    /// Lazy iterator from the smallest entry
    pub fn iter(&self) -> ProllyIter<S> {
        ProllyIter::new(Arc::clone(&self.store), Arc::clone(&self.root), None)
    }

    /// Lazy iterator from the first entry not less than `key`
    pub fn iter_at(&self, key: impl Into<Value>) -> ProllyIter<S> {
        ProllyIter::new(
            Arc::clone(&self.store),
            Arc::clone(&self.root),
            Some(key.into()),
        )
    }

    /// Insert or replace an entry, returning the new tree
    #[instrument(skip(self, entry), fields(key = ?entry.key))]
    pub async fn set(&self, entry: Entry) -> Result<Self> {
        self.element_type().check_entry(&entry)?;
        let (path, exact) = self.seek(&entry.key).await?;
        if exact && path.current()? == &entry {
            return Ok(self.clone());
        }

        let index = path.leaf_index();
        let mut entries = path.leaf()?.entries().to_vec();
        if exact {
            entries[index] = entry;
        } else {
            entries.insert(index, entry);
        }
        self.splice(&path, entries).await
    }

    /// Remove a key, returning the new tree
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &Value) -> Result<Self> {
        self.element_type().check_key(key)?;
        let (path, exact) = self.seek(key).await?;
        if !exact {
            return Ok(self.clone());
        }

        let mut entries = path.leaf()?.entries().to_vec();
        entries.remove(path.leaf_index());
        self.splice(&path, entries).await
    }

    /// Key-level changes from this tree to `other`
    pub async fn diff(&self, other: &Self) -> Result<Vec<KeyValueChange>> {
        diff_trees(self, other).await
    }

    /// Write the root chunk to the store and return its CID
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<Cid> {
        let cid = self.store.put_ipld(self.root.as_ref()).await?;
        debug!(%cid, "flushed root");
        Ok(cid)
    }

    /// Get statistics about the tree
    pub async fn stats(&self) -> Result<TreeStats> {
        Ok(TreeStats {
            is_leaf: self.root.is_leaf(),
            height: self.height().await?,
            root_len: self.root.len(),
            entries: self.len(),
        })
    }

    async fn seek(&self, key: &Value) -> Result<(Cursor<S>, bool)> {
        Cursor::at_key(Arc::clone(&self.store), Arc::clone(&self.root), key).await
    }

    async fn leftmost(&self) -> Result<Cursor<S>> {
        Cursor::leftmost(Arc::clone(&self.store), Arc::clone(&self.root)).await
    }

    async fn splice(&self, path: &Cursor<S>, entries: Vec<Entry>) -> Result<Self> {
        let builder = TreeBuilder::new(
            Arc::clone(&self.store),
            self.config.clone(),
            self.element_type(),
        )?;
        let root = builder.splice(path, entries).await?;
        debug!(root = %root.cid, "rewrote tree");
        Ok(Self {
            root: root.sequence,
            root_cid: root.cid,
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        })
    }
}

impl<S: BlockStore> std::fmt::Debug for ProllyTree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProllyTree")
            .field("root_cid", &self.root_cid)
            .field("len", &self.len())
            .finish()
    }
}

/// Tree statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub is_leaf: bool,
    pub height: usize,
    pub root_len: usize,
    pub entries: u64,
}
