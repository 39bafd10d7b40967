//! Resolution error taxonomy.
//!
//! Every error raised inside a pipeline stage or command handler is one of these; they are
//! caught and logged at the handler boundary and never reach the requester.

use embedding::EmbeddingError;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Malformed administrator command (missing keyword, response or id).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rule id or pending correlation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Embedding/similarity service unreachable or non-2xx.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Embedding dimension invalid.
    #[error("Format error: {0}")]
    Format(String),

    /// Database statement failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for ResolveError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ResolveError::NotFound(what),
            StorageError::Database(msg) | StorageError::Decode(msg) => ResolveError::Storage(msg),
        }
    }
}

impl From<EmbeddingError> for ResolveError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::Transport(msg) => ResolveError::Transport(msg),
            EmbeddingError::Format(msg) => ResolveError::Format(msg),
        }
    }
}
