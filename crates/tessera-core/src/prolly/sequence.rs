//! Prolly Tree sequence types
//!
//! Every chunk of a tree is one [`Sequence`]: either a [`LeafSequence`] of
//! entries or a [`MetaSequence`] of tuples pointing at child chunks.

use crate::value::{cid_serde, encode_entry, ref_of, CollectionType, Value};
use crate::{CoreError, Result};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_blockstore::encode_ipld;

/// A key with its value (maps) or a bare key (sets)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The key
    pub key: Value,
    /// The value, absent for set elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Entry {
    /// Create a map entry
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a set element
    pub fn element(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Split a map entry into its key and value
    pub fn into_pair(self) -> Result<(Value, Value)> {
        match self.value {
            Some(value) => Ok((self.key, value)),
            None => Err(CoreError::TreeCorruption(format!(
                "map entry {:?} has no value",
                self.key
            ))),
        }
    }
}

/// A pointer to a child chunk one level down
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTuple {
    /// The child chunk
    #[serde(with = "cid_serde")]
    pub child: Cid,
    /// Largest key reachable under the child
    pub key: Value,
    /// Number of entries in the child's subtree
    pub count: u64,
}

impl MetaTuple {
    /// Create a tuple for a child chunk
    pub fn new(child: Cid, key: impl Into<Value>, count: u64) -> Self {
        Self {
            child,
            key: key.into(),
            count,
        }
    }
}

/// A sorted run of entries stored inline in one chunk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSequence {
    element_type: CollectionType,
    entries: Vec<Entry>,
}

impl LeafSequence {
    /// Create a leaf from entries strictly increasing by key
    pub fn new(element_type: CollectionType, entries: Vec<Entry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].key < w[1].key));
        Self {
            element_type,
            entries,
        }
    }

    /// Create an empty leaf
    pub fn empty(element_type: CollectionType) -> Self {
        Self::new(element_type, Vec::new())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn entry_at(&self, index: usize) -> Result<&Entry> {
        self.entries.get(index).ok_or(CoreError::OutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Index of the first entry with a key not less than `key`
    pub fn search(&self, key: &Value) -> usize {
        self.entries.partition_point(|entry| &entry.key < key)
    }

    /// Refs held directly by entries, key before value
    pub fn chunks(&self) -> Vec<Cid> {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(&entry.key).chain(entry.value.as_ref()))
            .filter_map(|value| value.as_cid().copied())
            .collect()
    }
}

/// A run of tuples describing one tree level
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSequence {
    element_type: CollectionType,
    tuples: Vec<MetaTuple>,
}

impl MetaSequence {
    /// Create a meta sequence from tuples strictly increasing by key
    pub fn new(element_type: CollectionType, tuples: Vec<MetaTuple>) -> Self {
        debug_assert!(tuples.windows(2).all(|w| w[0].key < w[1].key));
        Self {
            element_type,
            tuples,
        }
    }

    pub fn tuples(&self) -> &[MetaTuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Tuple at `index`
    pub fn tuple_at(&self, index: usize) -> Result<&MetaTuple> {
        self.tuples.get(index).ok_or(CoreError::OutOfRange {
            index,
            len: self.tuples.len(),
        })
    }

    /// Index of the first tuple whose boundary key is not less than `key`
    pub fn search(&self, key: &Value) -> usize {
        self.tuples.partition_point(|tuple| &tuple.key < key)
    }

    /// Child refs in tuple order
    pub fn chunks(&self) -> Vec<Cid> {
        self.tuples.iter().map(|tuple| tuple.child).collect()
    }
}

/// One chunk of a prolly tree
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
    Leaf(LeafSequence),
    Meta(MetaSequence),
}

impl Sequence {
    pub fn len(&self) -> usize {
        match self {
            Sequence::Leaf(leaf) => leaf.len(),
            Sequence::Meta(meta) => meta.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Sequence::Leaf(_))
    }

    /// Type descriptor carried by this chunk
    pub fn element_type(&self) -> CollectionType {
        match self {
            Sequence::Leaf(leaf) => leaf.element_type,
            Sequence::Meta(meta) => meta.element_type,
        }
    }

    /// Refs held directly by this chunk, one level down only
    pub fn chunks(&self) -> Vec<Cid> {
        match self {
            Sequence::Leaf(leaf) => leaf.chunks(),
            Sequence::Meta(meta) => meta.chunks(),
        }
    }

    /// Number of entries in this chunk's subtree
    pub fn num_leaves(&self) -> u64 {
        match self {
            Sequence::Leaf(leaf) => leaf.len() as u64,
            Sequence::Meta(meta) => meta.tuples.iter().map(|tuple| tuple.count).sum(),
        }
    }

    /// Largest key in this chunk's subtree
    pub fn last_key(&self) -> Option<&Value> {
        match self {
            Sequence::Leaf(leaf) => leaf.entries.last().map(|entry| &entry.key),
            Sequence::Meta(meta) => meta.tuples.last().map(|tuple| &tuple.key),
        }
    }

    /// Index of the first item whose key is not less than `key`
    pub fn search(&self, key: &Value) -> usize {
        match self {
            Sequence::Leaf(leaf) => leaf.search(key),
            Sequence::Meta(meta) => meta.search(key),
        }
    }

    pub fn as_leaf(&self) -> Result<&LeafSequence> {
        match self {
            Sequence::Leaf(leaf) => Ok(leaf),
            Sequence::Meta(_) => Err(CoreError::TreeCorruption(
                "expected leaf sequence, found meta sequence".to_string(),
            )),
        }
    }

    pub fn as_meta(&self) -> Result<&MetaSequence> {
        match self {
            Sequence::Meta(meta) => Ok(meta),
            Sequence::Leaf(_) => Err(CoreError::TreeCorruption(
                "expected meta sequence, found leaf sequence".to_string(),
            )),
        }
    }

    /// Canonical encoded bytes of this chunk
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(encode_ipld(self)?)
    }

    /// Content ref of this chunk, equal to the CID the block store assigns it
    pub fn cid(&self) -> Result<Cid> {
        Ok(ref_of(&self.encode()?))
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("is_leaf", &self.is_leaf())
            .field("len", &self.len())
            .field("last_key", &self.last_key())
            .finish()
    }
}

impl From<LeafSequence> for Sequence {
    fn from(leaf: LeafSequence) -> Self {
        Sequence::Leaf(leaf)
    }
}

impl From<MetaSequence> for Sequence {
    fn from(meta: MetaSequence) -> Self {
        Sequence::Meta(meta)
    }
}

/// Items making up one tree level: entries at the leaves, tuples above
pub(crate) trait LevelItem: Clone + Send + Sync + 'static {
    /// The items of a chunk at this level
    fn items(sequence: &Sequence) -> Result<&[Self]>;

    /// Wrap a run of items into a chunk
    fn seal(element_type: CollectionType, items: Vec<Self>) -> Sequence;

    /// Bytes the boundary decision hashes, and the item's encoded size
    fn chunk_input(&self) -> Result<(Vec<u8>, usize)>;
}

impl LevelItem for Entry {
    fn items(sequence: &Sequence) -> Result<&[Self]> {
        Ok(sequence.as_leaf()?.entries())
    }

    fn seal(element_type: CollectionType, items: Vec<Self>) -> Sequence {
        Sequence::Leaf(LeafSequence::new(element_type, items))
    }

    fn chunk_input(&self) -> Result<(Vec<u8>, usize)> {
        let encoded = encode_entry(self)?;
        let size = encoded.len();
        Ok((encoded, size))
    }
}

impl LevelItem for MetaTuple {
    fn items(sequence: &Sequence) -> Result<&[Self]> {
        Ok(sequence.as_meta()?.tuples())
    }

    fn seal(element_type: CollectionType, items: Vec<Self>) -> Sequence {
        Sequence::Meta(MetaSequence::new(element_type, items))
    }

    fn chunk_input(&self) -> Result<(Vec<u8>, usize)> {
        // Keys can be large, so size the whole tuple
        Ok((self.child.to_bytes(), encode_ipld(self)?.len()))
    }
}
