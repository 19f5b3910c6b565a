//! Content-defined chunking of ordered item streams
//!
//! The chunker decides, after each appended item, whether the chunk in
//! progress closes. The decision only looks at the items pushed since the
//! last boundary, so two streams that agree on a run of items following a
//! boundary cut that run into the same chunks.

use super::{
    BoundaryHasher, DEFAULT_BOUNDARY_BITS, DEFAULT_MAX_CHUNK_BYTES, DEFAULT_MAX_CHUNK_ENTRIES,
    DEFAULT_MIN_CHUNK_ENTRIES,
};
use crate::{CoreError, Result};

/// Configuration for Prolly Tree chunking
///
/// Changing any of these values changes every content hash the tree
/// produces, so they must stay fixed for a given deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProllyConfig {
    /// Boundary bits for chunking (average chunk is `2^bits` items past the minimum)
    pub boundary_bits: u8,
    /// No chunk closes before holding this many items, except at stream end
    pub min_chunk_entries: usize,
    /// A chunk is forced closed at this many items
    pub max_chunk_entries: usize,
    /// A chunk past the minimum is forced closed once its items encode to this many bytes
    pub max_chunk_bytes: usize,
}

impl Default for ProllyConfig {
    fn default() -> Self {
        Self {
            boundary_bits: DEFAULT_BOUNDARY_BITS,
            min_chunk_entries: DEFAULT_MIN_CHUNK_ENTRIES,
            max_chunk_entries: DEFAULT_MAX_CHUNK_ENTRIES,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }
}

impl ProllyConfig {
    /// Set the boundary bits
    pub fn with_boundary_bits(mut self, bits: u8) -> Self {
        self.boundary_bits = bits;
        self
    }

    /// Set the minimum and maximum chunk entry counts
    pub fn with_chunk_entries(mut self, min: usize, max: usize) -> Self {
        self.min_chunk_entries = min;
        self.max_chunk_entries = max;
        self
    }

    /// Set the byte limit for a chunk
    pub fn with_max_chunk_bytes(mut self, bytes: usize) -> Self {
        self.max_chunk_bytes = bytes;
        self
    }

    /// Check the configuration is usable.
    ///
    /// A minimum of two items per chunk guarantees every tree level has fewer
    /// chunks than the level below, so building always terminates.
    pub fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.boundary_bits) {
            return Err(CoreError::Configuration(format!(
                "boundary bits must be between 1 and 31, got {}",
                self.boundary_bits
            )));
        }
        if self.min_chunk_entries < 2 {
            return Err(CoreError::Configuration(format!(
                "minimum chunk entries must be at least 2, got {}",
                self.min_chunk_entries
            )));
        }
        if self.max_chunk_entries < self.min_chunk_entries {
            return Err(CoreError::Configuration(format!(
                "maximum chunk entries {} is below minimum {}",
                self.max_chunk_entries, self.min_chunk_entries
            )));
        }
        if self.max_chunk_bytes == 0 {
            return Err(CoreError::Configuration(
                "maximum chunk bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Splits a stream of items into content-defined chunks
#[derive(Debug)]
pub struct Chunker<T> {
    hasher: BoundaryHasher,
    min_entries: usize,
    max_entries: usize,
    max_bytes: usize,
    pending: Vec<T>,
    pending_bytes: usize,
}

impl<T> Chunker<T> {
    /// Create a chunker for a validated configuration
    pub fn new(config: &ProllyConfig) -> Self {
        Self {
            hasher: BoundaryHasher::new(config.boundary_bits),
            min_entries: config.min_chunk_entries,
            max_entries: config.max_chunk_entries,
            max_bytes: config.max_chunk_bytes,
            pending: Vec::new(),
            pending_bytes: 0,
        }
    }

    /// Append an item, returning the chunk it closes.
    ///
    /// `boundary` is hashed for the boundary decision; `size` is what the item
    /// adds to the encoded chunk.
    pub fn push(&mut self, item: T, boundary: &[u8], size: usize) -> Option<Vec<T>> {
        self.pending.push(item);
        self.pending_bytes += size;

        let count = self.pending.len();
        let boundary = count >= self.max_entries
            || (count >= self.min_entries
                && (self.pending_bytes >= self.max_bytes || self.hasher.is_boundary(boundary)));

        if boundary {
            self.pending_bytes = 0;
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    /// True when no items are pending, i.e. right after a boundary
    pub fn at_boundary(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of items in the chunk in progress
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Close the final chunk at stream end
    pub fn finish(self) -> Option<Vec<T>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}
