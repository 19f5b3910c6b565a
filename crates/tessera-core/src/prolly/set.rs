//! Ordered set front over [`ProllyTree`]

use super::{Entry, ProllyConfig, ProllyIter, ProllyTree};
use crate::value::{CollectionKind, CollectionType, Value, ValueType};
use crate::{CoreError, Result};
use cid::Cid;
use std::sync::Arc;
use tessera_blockstore::BlockStore;

/// An immutable ordered set of keys
pub struct ProllySet<S: BlockStore> {
    tree: ProllyTree<S>,
}

impl<S: BlockStore> Clone for ProllySet<S> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<S: BlockStore> ProllySet<S> {
    /// Create an empty set
    pub fn new(store: Arc<S>, element: ValueType) -> Result<Self> {
        Self::with_config(store, element, ProllyConfig::default())
    }

    pub fn with_config(store: Arc<S>, element: ValueType, config: ProllyConfig) -> Result<Self> {
        let tree = ProllyTree::with_config(store, CollectionType::set(element), config)?;
        Ok(Self { tree })
    }

    /// Build a set from values in any order
    pub async fn from_values<K: Into<Value>>(
        store: Arc<S>,
        element: ValueType,
        config: ProllyConfig,
        values: impl IntoIterator<Item = K>,
    ) -> Result<Self> {
        let entries = values.into_iter().map(Entry::element).collect();
        let tree =
            ProllyTree::from_entries(store, CollectionType::set(element), config, entries).await?;
        Ok(Self { tree })
    }

    /// Load a set from its root CID
    pub async fn load(store: Arc<S>, root_cid: Cid) -> Result<Self> {
        let tree = ProllyTree::load(store, root_cid).await?;
        let element_type = tree.element_type();
        if element_type.kind != CollectionKind::Set {
            return Err(CoreError::TypeMismatch {
                expected: "set".to_string(),
                actual: format!("{:?}", element_type.kind),
            });
        }
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &ProllyTree<S> {
        &self.tree
    }

    pub fn root_cid(&self) -> &Cid {
        self.tree.root_cid()
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

    pub async fn has(&self, value: impl Into<Value>) -> Result<bool> {
        self.tree.has(&value.into()).await
    }

    pub async fn first(&self) -> Result<Option<Value>> {
        Ok(self.tree.first().await?.map(|entry| entry.key))
    }

    pub async fn last(&self) -> Result<Option<Value>> {
        Ok(self.tree.last().await?.map(|entry| entry.key))
    }

    /// Visit every value in ascending order
    pub async fn for_each<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Value),
    {
        self.tree.for_each(|entry| visit(&entry.key)).await
    }

    pub fn iter(&self) -> ProllyIter<S> {
        self.tree.iter()
    }

    pub fn iter_at(&self, value: impl Into<Value>) -> ProllyIter<S> {
        self.tree.iter_at(value)
    }

    /// Add a value, returning the new set
    pub async fn insert(&self, value: impl Into<Value>) -> Result<Self> {
        let tree = self.tree.set(Entry::element(value)).await?;
        Ok(Self { tree })
    }

    /// Remove a value, returning the new set
    pub async fn remove(&self, value: impl Into<Value>) -> Result<Self> {
        let tree = self.tree.remove(&value.into()).await?;
        Ok(Self { tree })
    }

    pub async fn flush(&self) -> Result<Cid> {
        self.tree.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_blockstore::MemoryBlockStore;

    #[tokio::test]
    async fn test_set_basics() {
        let store = Arc::new(MemoryBlockStore::new());
        let set = ProllySet::from_values(
            Arc::clone(&store),
            ValueType::String,
            ProllyConfig::default(),
            ["k", "a", "e", "a"],
        )
        .await
        .unwrap();

        assert_eq!(set.len(), 3);
        assert!(set.has("e").await.unwrap());
        assert!(!set.has("b").await.unwrap());
        assert_eq!(set.first().await.unwrap(), Some("a".into()));
        assert_eq!(set.last().await.unwrap(), Some("k".into()));

        let mut seen = Vec::new();
        set.for_each(|v| seen.push(v.clone())).await.unwrap();
        assert_eq!(seen, vec![Value::from("a"), "e".into(), "k".into()]);
    }

    #[tokio::test]
    async fn test_insert_order_independence() {
        let store = Arc::new(MemoryBlockStore::new());
        let config = ProllyConfig::default().with_boundary_bits(2).with_chunk_entries(2, 6);

        let mut set = ProllySet::with_config(Arc::clone(&store), ValueType::Int, config.clone())
            .unwrap();
        for i in [7, 3, 9, 1, 0, 5, 8, 2, 6, 4] {
            set = set.insert(i * 11).await.unwrap();
        }
        let bulk = ProllySet::from_values(
            Arc::clone(&store),
            ValueType::Int,
            config,
            (0..10).map(|i| i * 11),
        )
        .await
        .unwrap();

        assert_eq!(set.root_cid(), bulk.root_cid());
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_type() {
        let store = Arc::new(MemoryBlockStore::new());
        let set = ProllySet::new(store, ValueType::Int).unwrap();
        assert!(matches!(
            set.insert("x").await,
            Err(CoreError::TypeMismatch { .. })
        ));
    }
}
