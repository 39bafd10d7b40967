//! # Text Embeddings
//!
//! This crate defines the embedding gateway the resolution engine consumes: the
//! [`EmbeddingService`] trait, the typed [`Embedding`] vector (384 or 768 floats), the language
//! hint used both for the remote model and the similarity threshold, and the big-endian blob codec
//! used by the message log.

use async_trait::async_trait;

mod config;
mod error;
mod language;
mod vector;

pub use config::{EmbeddingConfig, EnvEmbeddingConfig, SimilarityMode};
pub use error::EmbeddingError;
pub use language::Language;
pub use vector::{cosine_similarity, Embedding, LARGE_DIMENSION, SMALL_DIMENSION};

/// Gateway to an embedding/similarity service.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds `text` with the model selected by `language`.
    ///
    /// Fails with [`EmbeddingError::Transport`] when the service cannot be reached and
    /// [`EmbeddingError::Format`] when the returned vector is not 384 or 768 floats long.
    async fn embed(&self, text: &str, language: Language) -> Result<Embedding, EmbeddingError>;

    /// Similarity score in `[0, 1]` between two embeddings of the same dimension.
    ///
    /// Default: local cosine similarity. Implementations may delegate to a remote service.
    async fn similarity(&self, a: &Embedding, b: &Embedding) -> Result<f32, EmbeddingError> {
        if a.dimension() != b.dimension() {
            return Err(EmbeddingError::Format(format!(
                "dimension mismatch: {} vs {}",
                a.dimension(),
                b.dimension()
            )));
        }
        Ok(cosine_similarity(a.as_slice(), b.as_slice()))
    }
}
