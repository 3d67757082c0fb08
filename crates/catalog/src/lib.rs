//! Visual-similarity catalog: unit-norm image embeddings, exhaustive
//! cosine ranking, offline catalog builds and hot-swappable snapshots.

pub mod assets;
pub mod config;
pub mod health;
pub mod ingestion;
pub mod manager;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

pub use assets::{mirror_images, MirrorReport};
pub use config::{CatalogConfig, ConfigLoader};
pub use health::{CatalogHealth, HealthStatus, SearchStats};
pub use ingestion::{IdentifierStyle, IngestionConfig, IngestionEvent, IngestionPipeline};
pub use manager::{ManagerStatus, ReloadRecord, StoreManager};
pub use search::{CancellationFlag, SearchOptions, SimilarityEngine, CANCEL_CHECK_INTERVAL};
pub use service::RecommenderService;
pub use store::{FeatureStore, StoreArtifact, ARTIFACT_FORMAT_VERSION, ARTIFACT_MAGIC};
pub use types::{CatalogEntry, EmbeddingVector, QueryResult, ScoredMatch, StoreVersion, NORM_TOLERANCE};

pub use common::{CatalogError, CatalogResult, RecoveryStrategy};
