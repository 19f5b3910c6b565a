//! Block store errors

use cid::Cid;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockStoreError>;

/// Failures of a content-addressed block store
#[derive(Error, Debug)]
pub enum BlockStoreError {
    /// No block is stored under this CID
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// A CID string failed to parse
    #[error("invalid CID: {0}")]
    InvalidCid(String),

    /// Blocks above `MAX_BLOCK_SIZE` are refused at write time
    #[error("block too large: {size} bytes exceeds maximum {max} bytes")]
    BlockTooLarge { size: usize, max: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}
