use crate::config::{EmbedderKind, EmbeddingConfig};
use crate::hash_embedder::HashEmbedder;
use common::{EmbeddingError, EmbeddingResult};
use std::path::Path;

/// The embedding function: raw image bytes in, vector of fixed dimension out.
///
/// Implementations must be deterministic for identical input and must fail
/// with [`EmbeddingError`] instead of producing a placeholder vector. The
/// returned vector is unit-normalized; callers still validate the norm.
pub trait ImageEmbedder: Send + Sync {
    /// Short name for logs and artifact provenance
    fn name(&self) -> &'static str;

    /// Dimension `D` of every vector this embedder produces
    fn dimension(&self) -> usize;

    fn embed(&self, image_bytes: &[u8]) -> EmbeddingResult<Vec<f32>>;

    fn embed_file(&self, path: &Path) -> EmbeddingResult<Vec<f32>> {
        let bytes = std::fs::read(path).map_err(|source| EmbeddingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.embed(&bytes)
    }
}

/// Build the embedder selected by the configuration
pub fn create_embedder(config: &EmbeddingConfig) -> EmbeddingResult<Box<dyn ImageEmbedder>> {
    config.validate().map_err(|e| EmbeddingError::Config {
        reason: e.to_string(),
    })?;

    match config.kind {
        EmbedderKind::Hash => Ok(Box::new(HashEmbedder::new(config.hash_dimension))),
        #[cfg(feature = "decoders")]
        EmbedderKind::ColorHistogram => Ok(Box::new(crate::histogram::ColorHistogramEmbedder::new(
            config.input_size,
            config.bins_per_channel,
        )?)),
        #[cfg(not(feature = "decoders"))]
        EmbedderKind::ColorHistogram => Err(EmbeddingError::Config {
            reason: "colour histogram embedder requires the `decoders` feature".to_string(),
        }),
    }
}

/// Scale `values` to unit L2 norm in place.
///
/// Components are first divided by the largest magnitude, so squaring can
/// neither overflow to infinity nor underflow to zero.
pub fn l2_normalize(values: &mut [f32]) -> EmbeddingResult<()> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite { index });
    }

    let max_abs = values.iter().fold(0f32, |max, v| max.max(v.abs()));
    if max_abs == 0.0 {
        return Err(EmbeddingError::ZeroVector);
    }
    for v in values.iter_mut() {
        *v /= max_abs;
    }

    // largest component is now exactly 1, so 1 <= norm <= sqrt(len)
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    for v in values.iter_mut() {
        *v /= norm;
    }
    Ok(())
}
