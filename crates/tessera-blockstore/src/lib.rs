//! # Tessera Blockstore
//!
//! Content-addressed chunk storage for the Tessera value store.
//!
//! This crate provides:
//! - **Block operations**: Put, get, and delete immutable blocks by CID
//! - **CID generation**: Content identifiers using BLAKE3 multihashes
//! - **Memory store**: A concurrent in-memory store for tests and embedding
//! - **Caching**: In-memory LRU cache for hot blocks
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Prolly Tree / Application       │
//! ├─────────────────────────────────────────┤
//! │            BlockStore Trait             │
//! ├────────────────────┬────────────────────┤
//! │  CachedBlockStore  │  MemoryBlockStore  │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_blockstore::{BlockStore, MemoryBlockStore};
//!
//! let store = MemoryBlockStore::new();
//! let cid = store.put_block(&data).await?;
//! let retrieved = store.get_block(&cid).await?;
//! ```

pub mod cid_utils;
pub mod error;
pub mod memory;

pub use cid_utils::{create_cid, parse_cid, verify_cid, CidCodec};
pub use error::{BlockStoreError, Result};
pub use memory::{CachedBlockStore, MemoryBlockStore};

pub use cid::Cid;

use async_trait::async_trait;
use bytes::Bytes;

/// Maximum block size (1 MB)
pub const MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Trait for content-addressed block storage backends.
///
/// Implementations must be safe for concurrent use: many readers and writers
/// may share one store. Putting identical bytes twice yields the same CID.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block and return its CID
    async fn put_block(&self, data: &[u8]) -> Result<Cid>;

    /// Retrieve a block by CID
    async fn get_block(&self, cid: &Cid) -> Result<Bytes>;

    /// Check if a block exists
    async fn has_block(&self, cid: &Cid) -> Result<bool>;

    /// Delete a block
    async fn delete_block(&self, cid: &Cid) -> Result<()>;

    /// Get block size without retrieving content
    async fn block_size(&self, cid: &Cid) -> Result<u64>;

    /// Encode a value as DAG-CBOR and store it
    async fn put_ipld<T: serde::Serialize + Send + Sync>(&self, data: &T) -> Result<Cid>;

    /// Retrieve and deserialize DAG-CBOR data
    async fn get_ipld<T: serde::de::DeserializeOwned>(&self, cid: &Cid) -> Result<T>;
}

/// Encode a value to canonical DAG-CBOR bytes
pub fn encode_ipld<T: serde::Serialize + ?Sized>(data: &T) -> Result<Vec<u8>> {
    let bytes = serde_ipld_dagcbor::to_vec(data)
        .map_err(|e| BlockStoreError::Serialization(e.to_string()))?;
    if bytes.len() > MAX_BLOCK_SIZE {
        return Err(BlockStoreError::BlockTooLarge {
            size: bytes.len(),
            max: MAX_BLOCK_SIZE,
        });
    }
    Ok(bytes)
}

/// Decode DAG-CBOR bytes
pub fn decode_ipld<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| BlockStoreError::Deserialization(e.to_string()))
}
