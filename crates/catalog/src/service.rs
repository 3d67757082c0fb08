use ai::ImageEmbedder;
use common::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::health::{CatalogHealth, SearchStats};
use crate::ingestion::{IngestionEvent, IngestionPipeline};
use crate::manager::StoreManager;
use crate::search::{SearchOptions, SimilarityEngine};
use crate::types::{EmbeddingVector, QueryResult, StoreVersion};

/// Operations offered to the serving layer: rebuild, recommend, health.
pub struct RecommenderService {
    manager: Arc<StoreManager>,
    pipeline: IngestionPipeline,
    embedder: Arc<dyn ImageEmbedder>,
    artifact_path: PathBuf,
    default_top_k: usize,
    score_threshold: Option<f32>,
    stats: SearchStats,
}

impl RecommenderService {
    pub fn new(config: &CatalogConfig, embedder: Arc<dyn ImageEmbedder>, manager: Arc<StoreManager>) -> Self {
        Self {
            pipeline: IngestionPipeline::new(Arc::clone(&embedder), config.ingestion.clone()),
            manager,
            embedder,
            artifact_path: config.artifact_path.clone(),
            default_top_k: config.default_top_k,
            score_threshold: config.score_threshold,
            stats: SearchStats::default(),
        }
    }

    /// Create the configured embedder and load the artifact, falling back to
    /// the empty store when it is missing or unreadable
    pub fn from_config(config: &CatalogConfig) -> CatalogResult<Self> {
        let embedder: Arc<dyn ImageEmbedder> = Arc::from(ai::create_embedder(&config.embedding)?);
        let manager = Arc::new(StoreManager::open(&config.artifact_path));

        let store = manager.current();
        if !store.is_empty() && store.dimension() != embedder.dimension() {
            warn!(
                catalog_dimension = store.dimension(),
                embedder_dimension = embedder.dimension(),
                "Catalog was built with a different embedder; queries will fail until it is rebuilt"
            );
        }

        Ok(Self::new(config, embedder, manager))
    }

    pub fn manager(&self) -> &Arc<StoreManager> {
        &self.manager
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Build a new catalog from `source_dir`, publish it, then hot-swap it in
    pub async fn rebuild_catalog(
        &self,
        source_dir: &Path,
        events_tx: Option<mpsc::UnboundedSender<IngestionEvent>>,
    ) -> CatalogResult<StoreVersion> {
        self.pipeline
            .build_and_publish(source_dir, &self.artifact_path, events_tx)
            .await?;
        let version = self.manager.reload(&self.artifact_path)?;
        info!(version = version.get(), "Catalog rebuilt and activated");
        Ok(version)
    }

    /// Re-read the published artifact
    pub fn reload(&self) -> CatalogResult<StoreVersion> {
        self.manager.reload(&self.artifact_path)
    }

    /// Rank the active snapshot against `query`
    pub fn recommend(&self, query: &EmbeddingVector, k: usize) -> CatalogResult<QueryResult> {
        let options = SearchOptions {
            top_k: k,
            score_threshold: self.score_threshold,
        };

        let start = Instant::now();
        let store = self.manager.current();
        let result = SimilarityEngine::query_with_options(&store, query, &options);
        self.stats.record_query(start.elapsed(), result.is_ok());
        result
    }

    /// Embed an uploaded image and rank the catalog against it.
    /// An undecodable image rejects the query.
    pub fn recommend_image(&self, image_bytes: &[u8], k: usize) -> CatalogResult<QueryResult> {
        let query = self
            .embedder
            .embed(image_bytes)
            .map_err(CatalogError::from)
            .and_then(EmbeddingVector::normalized);

        match query {
            Ok(query) => self.recommend(&query, k),
            Err(e) => {
                self.stats.record_query(std::time::Duration::ZERO, false);
                Err(e)
            }
        }
    }

    pub fn health(&self) -> CatalogHealth {
        CatalogHealth::collect(&self.manager.current(), &self.manager.status(), &self.stats)
    }
}
