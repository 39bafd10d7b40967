//! Typed embedding vector and its storage codec.
//!
//! Only two model dimensions exist; the variant carries the dimension so callers never infer it
//! from a buffer length. Storage format: big-endian IEEE-754 `f32`, 4 bytes per component.

use crate::error::EmbeddingError;

/// Dimension of the small (English) model.
pub const SMALL_DIMENSION: usize = 384;
/// Dimension of the large (Chinese) model.
pub const LARGE_DIMENSION: usize = 768;

/// An embedding of one of the two supported dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    /// 384 floats.
    Small(Vec<f32>),
    /// 768 floats.
    Large(Vec<f32>),
}

impl Embedding {
    /// Wraps a raw vector; any length other than 384 or 768 is a format error.
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        match values.len() {
            SMALL_DIMENSION => Ok(Embedding::Small(values)),
            LARGE_DIMENSION => Ok(Embedding::Large(values)),
            n => Err(EmbeddingError::Format(format!(
                "unsupported embedding dimension {} (expected {} or {})",
                n, SMALL_DIMENSION, LARGE_DIMENSION
            ))),
        }
    }

    /// Decodes a big-endian blob. The byte length must be 384×4 or 768×4.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, EmbeddingError> {
        if bytes.len() % 4 != 0 {
            return Err(EmbeddingError::Format(format!(
                "embedding blob length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let values = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::new(values)
    }

    /// Encodes as a big-endian blob of `dimension() * 4` bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.as_slice()
            .iter()
            .flat_map(|f| f.to_be_bytes())
            .collect()
    }

    pub fn dimension(&self) -> usize {
        self.as_slice().len()
    }

    pub fn as_slice(&self) -> &[f32] {
        match self {
            Embedding::Small(v) | Embedding::Large(v) => v,
        }
    }

    pub fn into_vec(self) -> Vec<f32> {
        match self {
            Embedding::Small(v) | Embedding::Large(v) => v,
        }
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 for empty, mismatched or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 0.5 - 3.25).collect()
    }

    #[test]
    fn test_new_accepts_only_supported_dimensions() {
        assert!(matches!(Embedding::new(vec![0.0; 384]), Ok(Embedding::Small(_))));
        assert!(matches!(Embedding::new(vec![0.0; 768]), Ok(Embedding::Large(_))));
        assert!(matches!(Embedding::new(vec![0.0; 96]), Err(EmbeddingError::Format(_))));
        assert!(matches!(Embedding::new(Vec::new()), Err(EmbeddingError::Format(_))));
    }

    #[test]
    fn test_blob_is_big_endian() {
        let mut values = vec![0.0f32; 384];
        values[0] = 1.0;
        let bytes = Embedding::new(values).unwrap().to_be_bytes();
        assert_eq!(bytes.len(), 384 * 4);
        assert_eq!(&bytes[..4], &[0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_blob_decodes_bit_exact() {
        let original = Embedding::new(ramp(768)).unwrap();
        let decoded = Embedding::from_be_bytes(&original.to_be_bytes()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.dimension(), 768);
    }

    /// A 96-float blob (384 bytes) is not a 384-dimension embedding.
    #[test]
    fn test_blob_of_384_bytes_is_rejected() {
        let bytes = vec![0u8; 384];
        assert!(Embedding::from_be_bytes(&bytes).is_err());
        assert!(Embedding::from_be_bytes(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
