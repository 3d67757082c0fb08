use common::ConfigError;
use serde::{Deserialize, Serialize};

/// Which embedder backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Decoded RGB colour histogram
    ColorHistogram,
    /// SHA-256 of the raw bytes; no decoding, for tests and dry runs
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub kind: EmbedderKind,
    /// Images are resized to `input_size x input_size` before feature extraction
    pub input_size: u32,
    /// Histogram resolution; the vector dimension is `bins_per_channel^3`
    pub bins_per_channel: u32,
    /// Dimension used by the hash embedder
    pub hash_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::ColorHistogram,
            input_size: 224,
            bins_per_channel: 8,
            hash_dimension: 512,
        }
    }
}

impl EmbeddingConfig {
    /// Vector dimension produced by the configured embedder
    pub fn dimension(&self) -> usize {
        match self.kind {
            EmbedderKind::ColorHistogram => (self.bins_per_channel as usize).pow(3),
            EmbedderKind::Hash => self.hash_dimension,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::InvalidValue {
                config_key: "embedding.input_size".to_string(),
                value: "0".to_string(),
                reason: "Input size must be greater than 0".to_string(),
            });
        }
        if !(2..=64).contains(&self.bins_per_channel) {
            return Err(ConfigError::InvalidValue {
                config_key: "embedding.bins_per_channel".to_string(),
                value: self.bins_per_channel.to_string(),
                reason: "Bins per channel must be within 2..=64".to_string(),
            });
        }
        if self.hash_dimension == 0 {
            return Err(ConfigError::InvalidValue {
                config_key: "embedding.hash_dimension".to_string(),
                value: "0".to_string(),
                reason: "Hash dimension must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
