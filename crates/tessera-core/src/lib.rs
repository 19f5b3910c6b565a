//! # Tessera Core
//!
//! Core storage engine for the Tessera content-addressed value store.
//!
//! This crate provides:
//! - **Values**: A small closed value model with a canonical total order
//! - **Prolly Trees**: Content-defined chunked B-trees whose shape depends
//!   only on their contents, never on insertion history
//! - **Maps and Sets**: Immutable ordered collections with structural sharing
//! - **Diffs**: Key-level change lists between two collection versions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         ProllyMap / ProllySet           │
//! ├─────────────────────────────────────────┤
//! │   ProllyTree   │  Cursor  │  ProllyIter │
//! ├─────────────────────────────────────────┤
//! │  TreeBuilder   │  Chunker │  Sequences  │
//! ├─────────────────────────────────────────┤
//! │           BlockStore                    │
//! └─────────────────────────────────────────┘
//! ```

pub mod error;
pub mod prolly;
pub mod value;

pub use error::{CoreError, Result};
pub use prolly::{
    Cursor, Entry, LeafSequence, MetaSequence, MetaTuple, ProllyConfig, ProllyIter, ProllyMap,
    ProllySet, ProllyTree, Sequence,
};
pub use value::{CollectionKind, CollectionType, Value, ValueType};

/// Version of the chunk format
pub const STORAGE_VERSION: &str = "1.0.0";
