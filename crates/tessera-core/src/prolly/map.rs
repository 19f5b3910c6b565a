//! Ordered map front over [`ProllyTree`]

use super::{diff_trees, Entry, KeyValueChange, ProllyConfig, ProllyIter, ProllyTree};
use crate::value::{CollectionKind, CollectionType, Value, ValueType};
use crate::{CoreError, Result};
use cid::Cid;
use std::sync::Arc;
use tessera_blockstore::BlockStore;

/// An immutable ordered map from keys to values
pub struct ProllyMap<S: BlockStore> {
    tree: ProllyTree<S>,
}

impl<S: BlockStore> Clone for ProllyMap<S> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<S: BlockStore> ProllyMap<S> {
    /// Create an empty map
    pub fn new(store: Arc<S>, key: ValueType, value: ValueType) -> Result<Self> {
        Self::with_config(store, key, value, ProllyConfig::default())
    }

    /// Create an empty map with custom chunking
    pub fn with_config(
        store: Arc<S>,
        key: ValueType,
        value: ValueType,
        config: ProllyConfig,
    ) -> Result<Self> {
        let tree = ProllyTree::with_config(store, CollectionType::map(key, value), config)?;
        Ok(Self { tree })
    }

    /// Build a map from pairs in any order; the last pair for a key wins
    pub async fn from_pairs<K, V>(
        store: Arc<S>,
        key: ValueType,
        value: ValueType,
        config: ProllyConfig,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        let entries = pairs.into_iter().map(|(k, v)| Entry::new(k, v)).collect();
        let tree =
            ProllyTree::from_entries(store, CollectionType::map(key, value), config, entries)
                .await?;
        Ok(Self { tree })
    }

    /// Load a map from its root CID
    pub async fn load(store: Arc<S>, root_cid: Cid) -> Result<Self> {
        Self::from_tree(ProllyTree::load(store, root_cid).await?)
    }

    /// Wrap a tree, checking that it holds a map
    pub fn from_tree(tree: ProllyTree<S>) -> Result<Self> {
        let element_type = tree.element_type();
        if element_type.kind != CollectionKind::Map {
            return Err(CoreError::TypeMismatch {
                expected: "map".to_string(),
                actual: format!("{:?}", element_type.kind),
            });
        }
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &ProllyTree<S> {
        &self.tree
    }

    pub fn into_tree(self) -> ProllyTree<S> {
        self.tree
    }

    pub fn root_cid(&self) -> &Cid {
        self.tree.root_cid()
    }

    pub fn element_type(&self) -> CollectionType {
        self.tree.element_type()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn len(&self) -> u64 {
        self.tree.len()
    }

    pub fn chunks(&self) -> Vec<Cid> {
        self.tree.chunks()
    }

    /// Get a value by key
    pub async fn get(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        self.tree.get(&key.into()).await
    }

    pub async fn has(&self, key: impl Into<Value>) -> Result<bool> {
        self.tree.has(&key.into()).await
    }

    /// Pair with the smallest key
    pub async fn first(&self) -> Result<Option<(Value, Value)>> {
        self.tree.first().await?.map(Entry::into_pair).transpose()
    }

    /// Pair with the largest key
    pub async fn last(&self) -> Result<Option<(Value, Value)>> {
        self.tree.last().await?.map(Entry::into_pair).transpose()
    }

    /// Visit every pair in ascending key order
    pub async fn for_each<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Value, &Value),
    {
        let mut missing = None;
        self.tree
            .for_each(|entry| match &entry.value {
                Some(value) => visit(&entry.key, value),
                None => {
                    missing.get_or_insert_with(|| entry.key.clone());
                }
            })
            .await?;
        match missing {
            Some(key) => Err(CoreError::TreeCorruption(format!(
                "map entry {key:?} has no value"
            ))),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> ProllyIter<S> {
        self.tree.iter()
    }

    pub fn iter_at(&self, key: impl Into<Value>) -> ProllyIter<S> {
        self.tree.iter_at(key)
    }

    /// Insert or replace a value, returning the new map
    pub async fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Self> {
        let tree = self.tree.set(Entry::new(key, value)).await?;
        Ok(Self { tree })
    }

    /// Remove a key, returning the new map
    pub async fn remove(&self, key: impl Into<Value>) -> Result<Self> {
        let tree = self.tree.remove(&key.into()).await?;
        Ok(Self { tree })
    }

    /// Key-level changes from this map to `other`
    pub async fn diff(&self, other: &Self) -> Result<Vec<KeyValueChange>> {
        diff_trees(&self.tree, &other.tree).await
    }

    pub async fn flush(&self) -> Result<Cid> {
        self.tree.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prolly::ProllySet;
    use crate::value::ref_of;
    use tessera_blockstore::MemoryBlockStore;

    async fn letters(store: &Arc<MemoryBlockStore>) -> ProllyMap<MemoryBlockStore> {
        ProllyMap::from_pairs(
            Arc::clone(store),
            ValueType::String,
            ValueType::Bool,
            ProllyConfig::default(),
            [("k", true), ("a", false)],
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_map_leaf_basics() {
        let store = Arc::new(MemoryBlockStore::new());
        let map = letters(&store).await;

        assert!(map.has("a").await.unwrap());
        assert!(!map.has("z").await.unwrap());
        assert_eq!(map.get("a").await.unwrap(), Some(false.into()));
        assert_eq!(map.get("b").await.unwrap(), None);
        assert_eq!(
            map.first().await.unwrap(),
            Some((Value::from("a"), Value::from(false)))
        );
        assert!(!map.is_empty());

        let empty =
            ProllyMap::new(Arc::clone(&store), ValueType::String, ValueType::Bool).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.first().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_map_for_each() {
        let store = Arc::new(MemoryBlockStore::new());
        let map = letters(&store).await;

        let mut visited = Vec::new();
        map.for_each(|k, v| {
            visited.push(k.clone());
            visited.push(v.clone());
        })
        .await
        .unwrap();
        assert_eq!(
            visited,
            vec![Value::from("a"), false.into(), "k".into(), true.into()]
        );
    }

    #[tokio::test]
    async fn test_map_chunks_lists_refs() {
        let store = Arc::new(MemoryBlockStore::new());
        let refs: Vec<Cid> = (0u8..4).map(|i| ref_of(&[i])).collect();
        let map = ProllyMap::from_pairs(
            Arc::clone(&store),
            ValueType::Ref,
            ValueType::Ref,
            ProllyConfig::default(),
            [(refs[0], refs[1]), (refs[2], refs[3])],
        )
        .await
        .unwrap();

        let mut pairs = vec![(refs[0], refs[1]), (refs[2], refs[3])];
        pairs.sort_by(|a, b| Value::from(a.0).cmp(&Value::from(b.0)));
        let expected: Vec<Cid> = pairs.into_iter().flat_map(|(k, v)| [k, v]).collect();
        assert_eq!(map.chunks(), expected);
    }

    #[tokio::test]
    async fn test_map_set_remove() {
        let store = Arc::new(MemoryBlockStore::new());
        let map = letters(&store).await;

        let updated = map.set("m", true).await.unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(map.len(), 2);

        let restored = updated.remove("m").await.unwrap();
        assert_eq!(restored.root_cid(), map.root_cid());
    }

    #[tokio::test]
    async fn test_load_rejects_sets() {
        let store = Arc::new(MemoryBlockStore::new());
        let set = ProllySet::new(Arc::clone(&store), ValueType::Int)
            .unwrap()
            .insert(1)
            .await
            .unwrap();

        let result = ProllyMap::load(store, *set.root_cid()).await;
        assert!(matches!(result, Err(CoreError::TypeMismatch { .. })));
    }
}
