//! # Tessera
//!
//! Content-addressed prolly tree maps and sets.
//!
//! This crate re-exports the block store and the prolly tree core so that
//! applications can depend on one package.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera::{MemoryBlockStore, ProllyMap, ValueType};
//!
//! let store = Arc::new(MemoryBlockStore::new());
//! let map = ProllyMap::new(store, ValueType::String, ValueType::Int)?;
//! let map = map.set("answer", 42).await?;
//! assert_eq!(map.get("answer").await?, Some(42.into()));
//! ```

pub use tessera_blockstore::{BlockStore, BlockStoreError, CachedBlockStore, Cid, MemoryBlockStore};
pub use tessera_core::prolly::{
    apply_changes, diff_trees, ChangeType, IterState, KeyValueChange, TreeStats,
};
pub use tessera_core::{
    CollectionKind, CollectionType, CoreError, Cursor, Entry, ProllyConfig,
    ProllyIter, ProllyMap, ProllySet, ProllyTree, Result, Sequence, Value, ValueType,
};
