use ai::EmbeddingConfig;
use anyhow::{Context, Result};
use common::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ingestion::IngestionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Where the catalog artifact is published and loaded from
    pub artifact_path: PathBuf,
    /// Directory of catalog images scanned by the build
    pub source_dir: PathBuf,
    /// Where catalog images are mirrored for the presentation layer
    pub static_dir: PathBuf,
    /// Results returned when the caller gives no k
    pub default_top_k: usize,
    pub score_threshold: Option<f32>,
    pub ingestion: IngestionConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("artifacts/catalog.bin"),
            source_dir: PathBuf::from("static/images"),
            static_dir: PathBuf::from("static/images"),
            default_top_k: 6,
            score_threshold: None,
            ingestion: IngestionConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                config_key: "default_top_k".to_string(),
                value: "0".to_string(),
                reason: "Top-k must be greater than 0".to_string(),
            });
        }
        if self.ingestion.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                config_key: "ingestion.batch_size".to_string(),
                value: "0".to_string(),
                reason: "Batch size must be greater than 0".to_string(),
            });
        }
        if self.ingestion.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                config_key: "ingestion.extensions".to_string(),
                value: "[]".to_string(),
                reason: "At least one image extension is required".to_string(),
            });
        }
        if let Some(threshold) = self.score_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    config_key: "score_threshold".to_string(),
                    value: threshold.to_string(),
                    reason: "Cosine similarity threshold must be within -1..=1".to_string(),
                });
            }
        }
        self.embedding.validate()
    }
}

/// Resolves configuration from files, then environment overrides
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_paths: Self::default_config_paths(),
            env_prefix: "LOOKALIKE_".to_string(),
        }
    }

    /// An explicit path; it must exist
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.config_paths.insert(0, path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("lookalike.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("lookalike").join("config.toml"));
        }
        paths
    }

    pub async fn load(&self) -> Result<CatalogConfig> {
        let mut config = CatalogConfig::default();

        for path in &self.config_paths {
            if path.exists() {
                config = Self::load_file(path).await?;
                info!("Loaded configuration from: {}", path.display());
                break;
            }
        }

        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load exactly `path`, failing if it does not exist
    pub async fn load_from(path: &Path) -> Result<CatalogConfig> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                file_path: path.display().to_string(),
            }
            .into());
        }
        ConfigLoader::new().with_path(path.to_path_buf()).load().await
    }

    async fn load_file(path: &Path) -> Result<CatalogConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::ParsingFailed {
                format: "toml".to_string(),
                reason: format!("{}: {}", path.display(), e),
            }
            .into()
        })
    }

    fn apply_env_overrides(&self, config: &mut CatalogConfig) -> Result<()> {
        if let Some(value) = self.env_var("ARTIFACT") {
            debug!("Override artifact_path from environment");
            config.artifact_path = PathBuf::from(value);
        }
        if let Some(value) = self.env_var("SOURCE_DIR") {
            config.source_dir = PathBuf::from(value);
        }
        if let Some(value) = self.env_var("STATIC_DIR") {
            config.static_dir = PathBuf::from(value);
        }
        if let Some(value) = self.env_var("TOP_K") {
            config.default_top_k = value.parse().map_err(|_| ConfigError::EnvVarError {
                var_name: format!("{}TOP_K", self.env_prefix),
                reason: format!("'{}' is not a positive integer", value),
            })?;
        }
        Ok(())
    }

    fn env_var(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", self.env_prefix, key))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::IdentifierStyle;

    #[test]
    fn test_default_config_is_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_top_k, 6);
    }

    #[test]
    fn test_validation_rejects_zero_top_k() {
        let config = CatalogConfig {
            default_top_k: 0,
            ..CatalogConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { config_key, .. }) if config_key == "default_top_k"
        ));
    }

    #[tokio::test]
    async fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookalike.toml");
        std::fs::write(
            &path,
            r#"
artifact_path = "out/catalog.bin"
default_top_k = 3

[ingestion]
batch_size = 2
identifier_style = "source_path"

[embedding]
bins_per_channel = 4
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("LOOKALIKE_TEST_PARTIAL_")
            .with_path(path)
            .load()
            .await
            .unwrap();

        assert_eq!(config.artifact_path, PathBuf::from("out/catalog.bin"));
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.ingestion.batch_size, 2);
        assert_eq!(config.ingestion.identifier_style, IdentifierStyle::SourcePath);
        assert_eq!(config.embedding.dimension(), 64);
        // untouched fields keep defaults
        assert_eq!(config.source_dir, PathBuf::from("static/images"));
    }

    #[tokio::test]
    async fn test_env_overrides() {
        std::env::set_var("LOOKALIKE_TEST_ENV_ARTIFACT", "/tmp/override.bin");
        std::env::set_var("LOOKALIKE_TEST_ENV_TOP_K", "9");

        let config = ConfigLoader {
            config_paths: Vec::new(),
            env_prefix: "LOOKALIKE_TEST_ENV_".to_string(),
        }
        .load()
        .await
        .unwrap();

        assert_eq!(config.artifact_path, PathBuf::from("/tmp/override.bin"));
        assert_eq!(config.default_top_k, 9);
    }

    #[tokio::test]
    async fn test_bad_env_top_k() {
        std::env::set_var("LOOKALIKE_TEST_BAD_TOP_K", "many");
        let result = ConfigLoader {
            config_paths: Vec::new(),
            env_prefix: "LOOKALIKE_TEST_BAD_".to_string(),
        }
        .load()
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from(Path::new("/no/such/lookalike.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "default_top_k = [").unwrap();
        assert!(ConfigLoader::load_from(&path).await.is_err());
    }
}
