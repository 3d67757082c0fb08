use chrono::{DateTime, TimeZone, Utc};
use common::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{CatalogEntry, EmbeddingVector, StoreVersion};

/// Leading bytes of every catalog artifact
pub const ARTIFACT_MAGIC: [u8; 8] = *b"LKCATLG\0";
/// Bumped whenever the serialized layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Immutable, versioned snapshot of the catalog.
///
/// Entries keep build order. A store is never edited after construction; a
/// refresh produces a new store that replaces this one wholesale.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    entries: Vec<CatalogEntry>,
    dimension: usize,
    version: StoreVersion,
    built_at: Option<DateTime<Utc>>,
    source_dir: Option<PathBuf>,
    embedder: Option<String>,
}

impl FeatureStore {
    /// The degraded "no recommendations" store
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            dimension: 0,
            version: StoreVersion::EMPTY,
            built_at: None,
            source_dir: None,
            embedder: None,
        }
    }

    /// Validate entries and assemble a new store with a fresh version
    pub fn build(entries: Vec<CatalogEntry>) -> CatalogResult<Self> {
        let dimension = validate_entries(&entries)?;

        Ok(Self {
            entries,
            dimension,
            version: StoreVersion::next(),
            built_at: Some(Utc::now()),
            source_dir: None,
            embedder: None,
        })
    }

    /// Record where the entries came from; carried through save/load
    pub fn with_provenance(mut self, source_dir: Option<PathBuf>, embedder: Option<String>) -> Self {
        self.source_dir = source_dir;
        self.embedder = embedder;
        self
    }

    pub fn load(path: &Path) -> CatalogResult<Self> {
        let store = StoreArtifact::read(path)?.into_store(path)?;
        info!(
            path = %path.display(),
            entries = store.len(),
            dimension = store.dimension,
            version = store.version.get(),
            "Loaded catalog artifact"
        );
        Ok(store)
    }

    /// Publish atomically: readers of `path` see the old artifact or the new one, never a partial write
    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        if self.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "refusing to persist an empty catalog".to_string(),
            ));
        }
        StoreArtifact::from_store(self).write_atomic(path)?;
        info!(
            path = %path.display(),
            entries = self.len(),
            version = self.version.get(),
            "Published catalog artifact"
        );
        Ok(())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shared vector dimension; 0 for the empty store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn version(&self) -> StoreVersion {
        self.version
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn embedder(&self) -> Option<&str> {
        self.embedder.as_deref()
    }
}

/// Returns the shared dimension
fn validate_entries(entries: &[CatalogEntry]) -> CatalogResult<usize> {
    let first = entries.first().ok_or_else(|| {
        CatalogError::InvalidArgument("a catalog needs at least one entry".to_string())
    })?;
    let dimension = first.vector.dimension();

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.vector.dimension() != dimension {
            return Err(CatalogError::dimension_mismatch(
                dimension,
                entry.vector.dimension(),
                format!("catalog entry {}", entry.identifier),
            ));
        }
        if !seen.insert(entry.identifier.as_str()) {
            return Err(CatalogError::DuplicateIdentifier(entry.identifier.clone()));
        }
    }

    Ok(dimension)
}

/// On-disk form of a feature store: two parallel sequences plus an explicit
/// dimension and count, serialized with bincode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreArtifact {
    pub magic: [u8; 8],
    pub format_version: u32,
    pub version: u64,
    /// Milliseconds since the Unix epoch
    pub built_at_ms: Option<i64>,
    pub dimension: u64,
    pub count: u64,
    pub source_dir: Option<String>,
    pub embedder: Option<String>,
    pub identifiers: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl StoreArtifact {
    pub fn from_store(store: &FeatureStore) -> Self {
        Self {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            version: store.version.get(),
            built_at_ms: store.built_at.map(|t| t.timestamp_millis()),
            dimension: store.dimension as u64,
            count: store.len() as u64,
            source_dir: store
                .source_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            embedder: store.embedder.clone(),
            identifiers: store.entries.iter().map(|e| e.identifier.clone()).collect(),
            vectors: store
                .entries
                .iter()
                .map(|e| e.vector.components().to_vec())
                .collect(),
        }
    }

    pub fn read(path: &Path) -> CatalogResult<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(CatalogError::io("read artifact", path, e)),
        };

        bincode::deserialize(&bytes)
            .map_err(|e| CatalogError::corrupt(path, format!("undecodable artifact: {}", e)))
    }

    /// Check every shape invariant, then build the store.
    /// Mismatched artifacts are rejected, never truncated.
    pub fn into_store(self, path: &Path) -> CatalogResult<FeatureStore> {
        if self.magic != ARTIFACT_MAGIC {
            return Err(CatalogError::corrupt(path, "bad magic bytes"));
        }
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(CatalogError::corrupt(
                path,
                format!("unsupported format version {}", self.format_version),
            ));
        }
        if self.identifiers.len() != self.vectors.len() {
            return Err(CatalogError::corrupt(
                path,
                format!(
                    "identifier count {} != vector count {}",
                    self.identifiers.len(),
                    self.vectors.len()
                ),
            ));
        }
        if self.count != self.identifiers.len() as u64 {
            return Err(CatalogError::corrupt(
                path,
                format!(
                    "declared count {} != stored entries {}",
                    self.count,
                    self.identifiers.len()
                ),
            ));
        }
        if self.count == 0 || self.dimension == 0 {
            return Err(CatalogError::corrupt(path, "artifact holds no entries"));
        }

        let dimension = self.dimension as usize;
        let mut entries = Vec::with_capacity(self.identifiers.len());
        for (index, (identifier, components)) in
            self.identifiers.into_iter().zip(self.vectors).enumerate()
        {
            if components.len() != dimension {
                return Err(CatalogError::corrupt(
                    path,
                    format!(
                        "vector {} has length {}, declared dimension is {}",
                        index,
                        components.len(),
                        dimension
                    ),
                ));
            }
            let vector = EmbeddingVector::new(components)
                .map_err(|e| CatalogError::corrupt(path, format!("vector {}: {}", index, e)))?;
            let entry = CatalogEntry::new(identifier, vector)
                .map_err(|e| CatalogError::corrupt(path, format!("entry {}: {}", index, e)))?;
            entries.push(entry);
        }

        validate_entries(&entries).map_err(|e| CatalogError::corrupt(path, e.to_string()))?;

        debug!(entries = entries.len(), dimension, "Artifact shape validated");

        Ok(FeatureStore {
            entries,
            dimension,
            version: StoreVersion(self.version),
            built_at: self
                .built_at_ms
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            source_dir: self.source_dir.map(PathBuf::from),
            embedder: self.embedder,
        })
    }

    /// Serialize into a temp file beside `path`, fsync, then rename over `path`
    pub fn write_atomic(&self, path: &Path) -> CatalogResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .map_err(|e| CatalogError::io("create artifact directory", &parent, e))?;

        let tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| CatalogError::io("create temp artifact", &parent, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, self)
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            writer
                .flush()
                .map_err(|e| CatalogError::io("write temp artifact", tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| CatalogError::io("sync temp artifact", tmp.path(), e))?;

        tmp.persist(path)
            .map_err(|e| CatalogError::io("rename artifact into place", path, e.error))?;
        Ok(())
    }
}
