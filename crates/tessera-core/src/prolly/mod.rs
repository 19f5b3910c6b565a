//! Prolly Tree implementation
//!
//! Prolly Trees (Probabilistic B-Trees) combine properties of B-Trees and Merkle Trees:
//! - Content-defined chunk boundaries, so the same entry set always yields the same tree
//! - O(log n) lookups, inserts, and deletes
//! - Structural sharing between versions through content-addressed chunks
//! - Cheap diffs: equal subtrees have equal refs

mod builder;
mod chunker;
mod cursor;
mod diff;
mod hash;
mod iter;
mod map;
mod sequence;
mod set;
mod tree;

pub use builder::{Sealed, TreeBuilder};
pub use chunker::{Chunker, ProllyConfig};
pub use cursor::{Cursor, Frame};
pub use diff::{apply_changes, diff_trees, ChangeType, KeyValueChange};
pub use hash::BoundaryHasher;
pub use iter::{IterState, ProllyIter};
pub use map::ProllyMap;
pub use sequence::{Entry, LeafSequence, MetaSequence, MetaTuple, Sequence};
pub use set::ProllySet;
pub use tree::{ProllyTree, TreeStats};

/// Default boundary pattern bits (average chunk of 32 items)
pub const DEFAULT_BOUNDARY_BITS: u8 = 5;

/// Default minimum items per chunk
pub const DEFAULT_MIN_CHUNK_ENTRIES: usize = 2;

/// Default maximum items per chunk
pub const DEFAULT_MAX_CHUNK_ENTRIES: usize = 256;

/// Default maximum encoded bytes per chunk
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 64 * 1024;
