//! Error types for the tessera-core crate

use cid::Cid;
use tessera_blockstore::BlockStoreError;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core storage operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced chunk is missing from the block store
    #[error("chunk not found: {0}")]
    NotFound(Cid),

    /// Cursor or index access beyond sequence bounds
    #[error("index {index} out of range for sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Iterator used after it was finished or cancelled
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Element type disagrees with the collection's declared type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Tree corruption detected
    #[error("tree corruption: {0}")]
    TreeCorruption(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Block store error
    #[error("block store error: {0}")]
    BlockStore(BlockStoreError),
}

impl From<BlockStoreError> for CoreError {
    fn from(err: BlockStoreError) -> Self {
        match err {
            BlockStoreError::NotFound(cid) => CoreError::NotFound(cid),
            BlockStoreError::Serialization(msg) => CoreError::Serialization(msg),
            BlockStoreError::Deserialization(msg) => CoreError::Deserialization(msg),
            other => CoreError::BlockStore(other),
        }
    }
}
