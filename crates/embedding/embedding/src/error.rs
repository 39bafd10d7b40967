//! Embedding gateway errors.

use thiserror::Error;

/// Errors returned by an [`crate::EmbeddingService`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Service unreachable, timed out, or answered with a non-2xx status.
    #[error("Embedding transport error: {0}")]
    Transport(String),
    /// The service answered but the payload is unusable (bad JSON, unsupported dimension).
    #[error("Embedding format error: {0}")]
    Format(String),
}
