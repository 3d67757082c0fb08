use ai::ImageEmbedder;
use common::{CatalogError, CatalogResult, OperationTimer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::store::FeatureStore;
use crate::types::{CatalogEntry, EmbeddingVector};

/// Progress of a catalog build
#[derive(Debug, Clone)]
pub enum IngestionEvent {
    Started { total_files: usize, source: PathBuf },
    FileEmbedded { path: PathBuf, index: usize },
    Completed { entries: usize, duration: Duration },
    Failed { path: PathBuf, error: String },
}

/// How catalog identifiers are derived from image paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStyle {
    /// Bare file name; keeps the catalog portable between hosts
    FileName,
    /// Source directory joined with the file name, as given
    SourcePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Lower-case file extensions treated as images
    pub extensions: Vec<String>,
    /// Images embedded concurrently per batch
    pub batch_size: usize,
    pub identifier_style: IdentifierStyle,
    /// Larger files abort the build (bytes)
    pub max_file_size: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            batch_size: 8,
            identifier_style: IdentifierStyle::FileName,
            max_file_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Offline batch build of a feature store from a directory of images.
///
/// Files are visited non-recursively in lexicographic order so two builds of
/// the same directory produce the same catalog. Any file that cannot be read
/// or embedded aborts the whole build: a partial catalog is never published.
pub struct IngestionPipeline {
    embedder: Arc<dyn ImageEmbedder>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn ImageEmbedder>, config: IngestionConfig) -> Self {
        Self { embedder, config }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub async fn build(&self, source_dir: &Path) -> CatalogResult<FeatureStore> {
        self.build_with_events(source_dir, None).await
    }

    /// Build, then publish the artifact atomically at `artifact_path`
    pub async fn build_and_publish(
        &self,
        source_dir: &Path,
        artifact_path: &Path,
        events_tx: Option<mpsc::UnboundedSender<IngestionEvent>>,
    ) -> CatalogResult<FeatureStore> {
        let store = self.build_with_events(source_dir, events_tx).await?;

        let publish_store = store.clone();
        let target = artifact_path.to_path_buf();
        tokio::task::spawn_blocking(move || publish_store.save(&target))
            .await
            .map_err(|e| CatalogError::Ingestion {
                path: artifact_path.to_path_buf(),
                reason: format!("publish task failed: {}", e),
            })??;

        Ok(store)
    }

    pub async fn build_with_events(
        &self,
        source_dir: &Path,
        events_tx: Option<mpsc::UnboundedSender<IngestionEvent>>,
    ) -> CatalogResult<FeatureStore> {
        let mut timer = OperationTimer::new("catalog_build");
        timer.add_field("source", source_dir.display().to_string());

        let result = self.run(source_dir, events_tx.as_ref()).await;
        if let Ok(store) = &result {
            timer.add_field("entries", store.len());
        }
        timer.finish_with_result(&result);
        result
    }

    async fn run(
        &self,
        source_dir: &Path,
        events_tx: Option<&mpsc::UnboundedSender<IngestionEvent>>,
    ) -> CatalogResult<FeatureStore> {
        let start = Instant::now();
        let emit = |event: IngestionEvent| {
            if let Some(tx) = events_tx {
                let _ = tx.send(event);
            }
        };

        let files = self.collect_files(source_dir)?;
        if files.is_empty() {
            return Err(CatalogError::Ingestion {
                path: source_dir.to_path_buf(),
                reason: "no image files found".to_string(),
            });
        }

        emit(IngestionEvent::Started {
            total_files: files.len(),
            source: source_dir.to_path_buf(),
        });
        info!(
            files = files.len(),
            source = %source_dir.display(),
            embedder = self.embedder.name(),
            "Starting catalog build"
        );

        let mut entries = Vec::with_capacity(files.len());
        let batch_size = self.config.batch_size.max(1);

        for batch in files.chunks(batch_size) {
            let tasks: Vec<_> = batch
                .iter()
                .map(|path| {
                    let embedder = Arc::clone(&self.embedder);
                    let path = path.clone();
                    tokio::task::spawn_blocking(move || embedder.embed_file(&path))
                })
                .collect();

            // join_all keeps batch order
            let results = futures::future::join_all(tasks).await;

            for (path, joined) in batch.iter().zip(results) {
                let outcome = joined
                    .map_err(|e| format!("embedding task failed: {}", e))
                    .and_then(|embedded| embedded.map_err(|e| e.to_string()))
                    .and_then(|raw| self.to_entry(source_dir, path, raw));

                match outcome {
                    Ok(entry) => {
                        debug!(path = %path.display(), identifier = %entry.identifier, "Embedded image");
                        entries.push(entry);
                        emit(IngestionEvent::FileEmbedded {
                            path: path.clone(),
                            index: entries.len(),
                        });
                    }
                    Err(reason) => {
                        error!(path = %path.display(), error = %reason, "Catalog build aborted");
                        emit(IngestionEvent::Failed {
                            path: path.clone(),
                            error: reason.clone(),
                        });
                        return Err(CatalogError::Ingestion {
                            path: path.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        let provenance = std::fs::canonicalize(source_dir).unwrap_or_else(|_| source_dir.to_path_buf());
        let store = FeatureStore::build(entries)?
            .with_provenance(Some(provenance), Some(self.embedder.name().to_string()));

        let duration = start.elapsed();
        emit(IngestionEvent::Completed {
            entries: store.len(),
            duration,
        });
        info!(
            entries = store.len(),
            dimension = store.dimension(),
            version = store.version().get(),
            duration_ms = duration.as_millis() as u64,
            "Catalog build completed"
        );

        Ok(store)
    }

    fn to_entry(&self, source_dir: &Path, path: &Path, raw: Vec<f32>) -> Result<CatalogEntry, String> {
        if raw.len() != self.embedder.dimension() {
            return Err(format!(
                "embedder returned {} components, expected {}",
                raw.len(),
                self.embedder.dimension()
            ));
        }

        let identifier = self.identifier_for(source_dir, path)?;
        let vector = EmbeddingVector::normalized(raw).map_err(|e| e.to_string())?;
        CatalogEntry::new(identifier, vector).map_err(|e| e.to_string())
    }

    fn identifier_for(&self, source_dir: &Path, path: &Path) -> Result<String, String> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| "file name is not valid UTF-8".to_string())?;

        match self.config.identifier_style {
            IdentifierStyle::FileName => Ok(file_name.to_string()),
            IdentifierStyle::SourcePath => source_dir
                .join(file_name)
                .to_str()
                .map(|s| s.replace('\\', "/"))
                .ok_or_else(|| "source path is not valid UTF-8".to_string()),
        }
    }

    /// Image files directly inside `source_dir`, sorted by file name
    pub fn collect_files(&self, source_dir: &Path) -> CatalogResult<Vec<PathBuf>> {
        let read_dir = std::fs::read_dir(source_dir).map_err(|e| CatalogError::Ingestion {
            path: source_dir.to_path_buf(),
            reason: format!("cannot read source directory: {}", e),
        })?;

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CatalogError::io("list source directory", source_dir, e))?;
            let path = entry.path();

            let file_type = entry
                .file_type()
                .map_err(|e| CatalogError::io("stat image", &path, e))?;
            if !file_type.is_file() && !(file_type.is_symlink() && path.is_file()) {
                continue;
            }
            if !self.has_image_extension(&path) {
                continue;
            }

            let size = entry
                .metadata()
                .map_err(|e| CatalogError::io("stat image", &path, e))?
                .len();
            if size > self.config.max_file_size {
                return Err(CatalogError::Ingestion {
                    path,
                    reason: format!(
                        "file is {} bytes, limit is {}",
                        size, self.config.max_file_size
                    ),
                });
            }

            files.push(path);
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.config.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}
