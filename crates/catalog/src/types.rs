use common::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Accepted deviation of `‖v‖` from 1.0
pub const NORM_TOLERANCE: f32 = 1e-3;

/// Unit-norm feature vector of fixed dimension. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector {
    components: Vec<f32>,
}

impl EmbeddingVector {
    /// Wrap components that are already unit-normalized
    pub fn new(components: Vec<f32>) -> CatalogResult<Self> {
        validate_components(&components)?;

        let norm = l2_norm(&components);
        if (norm - 1.0).abs() >= NORM_TOLERANCE {
            return Err(CatalogError::NotNormalized { norm });
        }

        Ok(Self { components })
    }

    /// Normalize raw embedder output, then wrap it
    pub fn normalized(mut components: Vec<f32>) -> CatalogResult<Self> {
        validate_components(&components)?;
        ai::l2_normalize(&mut components)?;

        let norm = l2_norm(&components);
        if (norm - 1.0).abs() >= NORM_TOLERANCE {
            return Err(CatalogError::NotNormalized { norm });
        }
        Ok(Self { components })
    }

    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[f32] {
        &self.components
    }

    pub fn norm(&self) -> f32 {
        l2_norm(&self.components)
    }

    /// Cosine similarity; both vectors are unit-norm so this is the dot product.
    /// Callers check dimensions first.
    #[inline]
    pub fn dot(&self, other: &EmbeddingVector) -> f32 {
        debug_assert_eq!(self.dimension(), other.dimension());
        self.components
            .iter()
            .zip(other.components.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn into_components(self) -> Vec<f32> {
        self.components
    }
}

fn validate_components(components: &[f32]) -> CatalogResult<()> {
    if components.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "embedding vector must have a positive dimension".to_string(),
        ));
    }
    if let Some(index) = components.iter().position(|v| !v.is_finite()) {
        return Err(CatalogError::InvalidArgument(format!(
            "embedding component {} is not finite",
            index
        )));
    }
    Ok(())
}

fn l2_norm(components: &[f32]) -> f32 {
    components.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// One catalog item: a stable identifier and its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub identifier: String,
    pub vector: EmbeddingVector,
}

impl CatalogEntry {
    pub fn new(identifier: impl Into<String>, vector: EmbeddingVector) -> CatalogResult<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Self { identifier, vector })
    }
}

pub(crate) fn validate_identifier(identifier: &str) -> CatalogResult<()> {
    if identifier.trim().is_empty() {
        return Err(CatalogError::InvalidArgument(
            "catalog identifier must not be empty".to_string(),
        ));
    }
    if identifier.contains('\0') {
        return Err(CatalogError::InvalidArgument(format!(
            "catalog identifier {:?} contains a NUL byte",
            identifier
        )));
    }
    Ok(())
}

/// Build counter of a feature store. Zero is reserved for the empty store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreVersion(pub u64);

static LAST_VERSION: AtomicU64 = AtomicU64::new(0);

impl StoreVersion {
    pub const EMPTY: StoreVersion = StoreVersion(0);

    /// Millisecond build timestamp, strictly increasing within the process
    pub fn next() -> Self {
        let now = chrono::Utc::now().timestamp_millis().max(1) as u64;
        let previous = LAST_VERSION
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(0);
        StoreVersion(now.max(previous + 1))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub identifier: String,
    pub score: f32,
}

impl ScoredMatch {
    /// Last path component of the identifier, as served to the presentation layer
    pub fn file_name(&self) -> &str {
        Path::new(&self.identifier)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.identifier)
    }
}

/// Ranked matches for one query, descending by score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub matches: Vec<ScoredMatch>,
    /// Version of the snapshot the query ran against
    pub store_version: StoreVersion,
}

impl QueryResult {
    pub fn empty(store_version: StoreVersion) -> Self {
        Self {
            matches: Vec::new(),
            store_version,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredMatch> {
        self.matches.iter()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.identifier.as_str()).collect()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.file_name()).collect()
    }
}
