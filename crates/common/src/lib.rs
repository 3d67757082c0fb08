pub mod errors;
pub mod structured_logging;

pub use structured_logging::{
    init_structured_logging,
    LoggingConfig,
    StructuredLogEntry,
    ExecutionContext,
    PerformanceMetrics,
    OperationTimer,
};

pub use errors::{
    CatalogError, CatalogResult,
    EmbeddingError, EmbeddingResult,
    ConfigError, ConfigResult,
    RecoveryStrategy,
};
