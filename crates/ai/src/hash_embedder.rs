use crate::embeddings::{l2_normalize, ImageEmbedder};
use common::{EmbeddingError, EmbeddingResult};
use sha2::{Digest, Sha256};

/// Deterministic stand-in for a real feature extractor.
///
/// Identical bytes always map to the identical unit vector; different bytes
/// map to effectively unrelated vectors. Nothing is decoded, so visual
/// similarity is not captured. Used by tests and dry runs of the pipeline.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl ImageEmbedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, image_bytes: &[u8]) -> EmbeddingResult<Vec<f32>> {
        if image_bytes.is_empty() {
            return Err(EmbeddingError::Decode {
                reason: "empty input".to_string(),
            });
        }

        let mut embedding = Vec::with_capacity(self.dimension);
        let mut block: u64 = 0;

        // Counter-mode expansion: one digest per 32 components
        while embedding.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(image_bytes);
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();

            for byte in digest.iter() {
                if embedding.len() == self.dimension {
                    break;
                }
                embedding.push((*byte as f32 - 127.5) / 127.5);
            }
            block += 1;
        }

        l2_normalize(&mut embedding)?;
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_unit_vectors() {
        let embedder = HashEmbedder::new(100);
        let a = embedder.embed(b"image-a").unwrap();
        let b = embedder.embed(b"image-a").unwrap();
        let c = embedder.embed(b"image-c").unwrap();

        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_input_rejected() {
        let embedder = HashEmbedder::new(16);
        assert!(matches!(
            embedder.embed(&[]),
            Err(EmbeddingError::Decode { .. })
        ));
    }
}
