pub mod config;
pub mod embeddings;
pub mod hash_embedder;
#[cfg(feature = "decoders")]
pub mod histogram;

pub use common::{EmbeddingError, EmbeddingResult};
pub use config::{EmbedderKind, EmbeddingConfig};
pub use embeddings::{create_embedder, l2_normalize, ImageEmbedder};
pub use hash_embedder::HashEmbedder;
#[cfg(feature = "decoders")]
pub use histogram::ColorHistogramEmbedder;
