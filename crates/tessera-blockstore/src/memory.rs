//! In-memory block store for testing and caching

use crate::cid_utils::{create_cid, CidCodec};
use crate::{decode_ipld, encode_ipld, BlockStore, BlockStoreError, Result, MAX_BLOCK_SIZE};
use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use dashmap::DashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

/// An in-memory block store
#[derive(Clone, Default)]
pub struct MemoryBlockStore {
    blocks: Arc<DashMap<Cid, Bytes>>,
}

impl MemoryBlockStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            blocks: Arc::new(DashMap::new()),
        }
    }

    /// Get the number of blocks stored
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Clear all blocks
    pub fn clear(&self) {
        self.blocks.clear();
    }

    fn insert(&self, data: Bytes, codec: CidCodec) -> Result<Cid> {
        if data.len() > MAX_BLOCK_SIZE {
            return Err(BlockStoreError::BlockTooLarge {
                size: data.len(),
                max: MAX_BLOCK_SIZE,
            });
        }
        let cid = create_cid(&data, codec);
        // Identical bytes hash to the same CID, so a repeated put is a no-op.
        self.blocks.entry(cid).or_insert(data);
        trace!(%cid, "stored block");
        Ok(cid)
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put_block(&self, data: &[u8]) -> Result<Cid> {
        self.insert(Bytes::copy_from_slice(data), CidCodec::Raw)
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes> {
        self.blocks
            .get(cid)
            .map(|entry| entry.value().clone())
            .ok_or(BlockStoreError::NotFound(*cid))
    }

    async fn has_block(&self, cid: &Cid) -> Result<bool> {
        Ok(self.blocks.contains_key(cid))
    }

    async fn delete_block(&self, cid: &Cid) -> Result<()> {
        self.blocks.remove(cid);
        Ok(())
    }

    async fn block_size(&self, cid: &Cid) -> Result<u64> {
        self.blocks
            .get(cid)
            .map(|entry| entry.value().len() as u64)
            .ok_or(BlockStoreError::NotFound(*cid))
    }

    async fn put_ipld<T: serde::Serialize + Send + Sync>(&self, data: &T) -> Result<Cid> {
        let bytes = encode_ipld(data)?;
        self.insert(Bytes::from(bytes), CidCodec::DagCbor)
    }

    async fn get_ipld<T: serde::de::DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        let bytes = self.get_block(cid).await?;
        decode_ipld(&bytes)
    }
}

/// LRU-cached wrapper around any block store
pub struct CachedBlockStore<S: BlockStore> {
    inner: S,
    cache: Arc<parking_lot::Mutex<lru::LruCache<Cid, Bytes>>>,
}

impl<S: BlockStore> CachedBlockStore<S> {
    /// Create a new cached store with the given capacity (at least one block)
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Arc::new(parking_lot::Mutex::new(lru::LruCache::new(capacity))),
        }
    }

    /// Access the wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached blocks
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }
}

#[async_trait]
impl<S: BlockStore> BlockStore for CachedBlockStore<S> {
    async fn put_block(&self, data: &[u8]) -> Result<Cid> {
        let cid = self.inner.put_block(data).await?;
        self.cache.lock().put(cid, Bytes::copy_from_slice(data));
        Ok(cid)
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes> {
        if let Some(data) = self.cache.lock().get(cid) {
            return Ok(data.clone());
        }

        let data = self.inner.get_block(cid).await?;
        self.cache.lock().put(*cid, data.clone());
        Ok(data)
    }

    async fn has_block(&self, cid: &Cid) -> Result<bool> {
        if self.cache.lock().contains(cid) {
            return Ok(true);
        }
        self.inner.has_block(cid).await
    }

    async fn delete_block(&self, cid: &Cid) -> Result<()> {
        self.cache.lock().pop(cid);
        self.inner.delete_block(cid).await
    }

    async fn block_size(&self, cid: &Cid) -> Result<u64> {
        if let Some(data) = self.cache.lock().get(cid) {
            return Ok(data.len() as u64);
        }
        self.inner.block_size(cid).await
    }

    async fn put_ipld<T: serde::Serialize + Send + Sync>(&self, data: &T) -> Result<Cid> {
        let bytes = encode_ipld(data)?;
        let cid = self.inner.put_ipld(data).await?;
        self.cache.lock().put(cid, Bytes::from(bytes));
        Ok(cid)
    }

    async fn get_ipld<T: serde::de::DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        let bytes = self.get_block(cid).await?;
        decode_ipld(&bytes)
    }
}
