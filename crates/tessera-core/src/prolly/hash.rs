//! Hash utilities for Prolly Tree boundaries

/// Hasher for determining chunk boundaries
///
/// A boundary falls after an item when the low `boundary_bits` bits of the
/// BLAKE3 digest of its encoded bytes are all zero, so on average one item in
/// `2^boundary_bits` closes a chunk.
#[derive(Clone, Debug)]
pub struct BoundaryHasher {
    /// Number of trailing zero bits required for boundary
    boundary_bits: u8,
    /// Mask for boundary detection
    boundary_mask: u32,
}

impl BoundaryHasher {
    /// Create a new boundary hasher, `boundary_bits` must be in `1..=31`
    pub fn new(boundary_bits: u8) -> Self {
        let boundary_mask = (1u32 << boundary_bits) - 1;
        Self {
            boundary_bits,
            boundary_mask,
        }
    }

    /// Check if an encoded item creates a boundary
    pub fn is_boundary(&self, data: &[u8]) -> bool {
        let hash = blake3::hash(data);
        let hash_bytes = hash.as_bytes();

        let lower_bits = u32::from_le_bytes([
            hash_bytes[0],
            hash_bytes[1],
            hash_bytes[2],
            hash_bytes[3],
        ]);

        (lower_bits & self.boundary_mask) == 0
    }

    /// Get the expected average chunk size in items
    pub fn expected_node_size(&self) -> usize {
        1 << self.boundary_bits
    }
}

impl Default for BoundaryHasher {
    fn default() -> Self {
        Self::new(super::DEFAULT_BOUNDARY_BITS)
    }
}
