//! Error taxonomy for the catalog, the embedding contract and configuration.
//!
//! Library code never swallows these: only the store manager is allowed to
//! absorb a load failure into a fallback, and it does so by inspecting
//! [`CatalogError::recovery_strategy`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the feature store, similarity engine and ingestion pipeline
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("Duplicate identifier in catalog: {0}")]
    DuplicateIdentifier(String),

    #[error("Vector is not unit-normalized: norm = {norm}")]
    NotNormalized { norm: f32 },

    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Artifact corrupt: {} - {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Ingestion failed on {}: {reason}", .path.display())]
    Ingestion { path: PathBuf, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Query cancelled after {scanned} of {total} entries")]
    Cancelled { scanned: usize, total: usize },

    #[error("IO error: {operation} on {} - {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CatalogError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CatalogError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize, context: impl Into<String>) -> Self {
        CatalogError::DimensionMismatch {
            expected,
            actual,
            context: context.into(),
        }
    }

    /// How the caller is expected to react to this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            CatalogError::InvalidArgument(_)
            | CatalogError::NotNormalized { .. }
            | CatalogError::Cancelled { .. } => RecoveryStrategy::ReportToCaller,
            CatalogError::DimensionMismatch { .. } => RecoveryStrategy::RebuildCatalog,
            CatalogError::ArtifactNotFound(_)
            | CatalogError::ArtifactCorrupt { .. } => RecoveryStrategy::KeepLastSnapshot,
            CatalogError::DuplicateIdentifier(_)
            | CatalogError::Ingestion { .. }
            | CatalogError::Embedding(_)
            | CatalogError::Io { .. }
            | CatalogError::Serialization(_) => RecoveryStrategy::RetryBuild,
        }
    }

    /// Load-time failures the store manager may absorb into its last good snapshot
    pub fn is_load_failure(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::KeepLastSnapshot)
    }
}

/// Failures of the external embedding function
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Undecodable image input: {reason}")]
    Decode { reason: String },

    #[error("Embedding produced a zero vector")]
    ZeroVector,

    #[error("Embedding produced non-finite component at index {index}")]
    NonFinite { index: usize },

    #[error("Embedder configuration invalid: {reason}")]
    Config { reason: String },

    #[error("Failed to read image input {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config value: {config_key} = '{value}' - {reason}")]
    InvalidValue {
        config_key: String,
        value: String,
        reason: String,
    },

    #[error("Config file not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("Config parsing failed: {format} - {reason}")]
    ParsingFailed { format: String, reason: String },

    #[error("Environment variable error: {var_name} - {reason}")]
    EnvVarError { var_name: String, reason: String },
}

/// Result type aliases for convenience
pub type CatalogResult<T> = Result<T, CatalogError>;
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Caller misuse; never retried automatically
    ReportToCaller,
    /// Query and catalog disagree on the embedding function; rebuild the whole catalog
    RebuildCatalog,
    /// Keep serving the previous snapshot and alert operators
    KeepLastSnapshot,
    /// The offline build failed and may be re-run once the input is fixed
    RetryBuild,
}

impl RecoveryStrategy {
    pub fn hint(&self) -> &'static str {
        match self {
            RecoveryStrategy::ReportToCaller => "check the request arguments",
            RecoveryStrategy::RebuildCatalog => {
                "the catalog was built with a different embedder; rebuild the catalog"
            }
            RecoveryStrategy::KeepLastSnapshot => {
                "the previous catalog snapshot stays active; check the artifact"
            }
            RecoveryStrategy::RetryBuild => "fix or remove the offending input and re-run the build",
        }
    }
}
