use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use common::{CatalogResult, OperationTimer};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::store::FeatureStore;
use crate::types::StoreVersion;

/// Outcome of the most recent reload attempt
#[derive(Debug, Clone)]
pub struct ReloadRecord {
    pub at: DateTime<Utc>,
    pub artifact: PathBuf,
    /// `None` when the reload succeeded
    pub error: Option<String>,
}

/// Point-in-time view of the manager for health reporting
#[derive(Debug, Clone)]
pub struct ManagerStatus {
    pub version: StoreVersion,
    pub entries: usize,
    pub dimension: usize,
    pub last_reload: Option<ReloadRecord>,
    pub reloads_succeeded: u64,
    pub reloads_failed: u64,
}

/// Holder of the active catalog snapshot.
///
/// The only shared mutable state in the catalog is the `Arc` inside this
/// manager. Readers load it without taking a lock, so a concurrent install
/// can never block a query. A reload builds the new store first and then
/// swaps the pointer. A reader therefore sees either the old or the new
/// snapshot in full, and queries already running on the old snapshot keep
/// it alive until they finish.
pub struct StoreManager {
    active: ArcSwap<FeatureStore>,
    last_reload: Mutex<Option<ReloadRecord>>,
    reloads_succeeded: AtomicU64,
    reloads_failed: AtomicU64,
}

impl StoreManager {
    /// Starts in degraded mode with an empty store
    pub fn new() -> Self {
        Self::with_store(FeatureStore::empty())
    }

    pub fn with_store(store: FeatureStore) -> Self {
        Self {
            active: ArcSwap::from_pointee(store),
            last_reload: Mutex::new(None),
            reloads_succeeded: AtomicU64::new(0),
            reloads_failed: AtomicU64::new(0),
        }
    }

    /// Startup: load `artifact` if possible, otherwise serve the empty store.
    /// Never fails; the failure is logged and kept for health reporting.
    pub fn open(artifact: &Path) -> Self {
        let manager = Self::new();
        if let Err(e) = manager.reload(artifact) {
            warn!(
                artifact = %artifact.display(),
                error = %e,
                "No usable catalog at startup; serving no recommendations until a reload succeeds"
            );
        }
        manager
    }

    /// Active snapshot
    pub fn current(&self) -> Arc<FeatureStore> {
        self.active.load_full()
    }

    pub fn version(&self) -> StoreVersion {
        self.active.load().version()
    }

    pub fn is_degraded(&self) -> bool {
        self.active.load().is_empty()
    }

    /// Load `artifact` and swap it in. On failure the previous snapshot
    /// stays active and the error is returned.
    pub fn reload(&self, artifact: &Path) -> CatalogResult<StoreVersion> {
        let mut timer = OperationTimer::new("catalog_reload");
        timer.add_field("artifact", artifact.display().to_string());

        let loaded = FeatureStore::load(artifact);
        timer.finish_with_result(&loaded);

        match loaded {
            Ok(store) => {
                let version = self.install(store);
                self.reloads_succeeded.fetch_add(1, Ordering::Relaxed);
                *self.last_reload.lock() = Some(ReloadRecord {
                    at: Utc::now(),
                    artifact: artifact.to_path_buf(),
                    error: None,
                });
                Ok(version)
            }
            Err(e) => {
                self.reloads_failed.fetch_add(1, Ordering::Relaxed);
                let active = self.current();
                error!(
                    artifact = %artifact.display(),
                    error = %e,
                    hint = e.recovery_strategy().hint(),
                    active_version = active.version().get(),
                    active_entries = active.len(),
                    "Catalog reload failed; keeping the active snapshot"
                );
                *self.last_reload.lock() = Some(ReloadRecord {
                    at: Utc::now(),
                    artifact: artifact.to_path_buf(),
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    /// Replace the active snapshot with `store`
    pub fn install(&self, store: FeatureStore) -> StoreVersion {
        let new_version = store.version();
        let entries = store.len();
        let previous = self.active.swap(Arc::new(store));

        if new_version < previous.version() {
            warn!(
                previous = previous.version().get(),
                installed = new_version.get(),
                "Installed catalog is older than the one it replaced"
            );
        }
        info!(
            version = new_version.get(),
            previous = previous.version().get(),
            entries,
            "Catalog snapshot installed"
        );

        // the old snapshot is freed here, or by the last in-flight query holding it
        drop(previous);
        new_version
    }

    pub fn status(&self) -> ManagerStatus {
        let store = self.current();
        ManagerStatus {
            version: store.version(),
            entries: store.len(),
            dimension: store.dimension(),
            last_reload: self.last_reload.lock().clone(),
            reloads_succeeded: self.reloads_succeeded.load(Ordering::Relaxed),
            reloads_failed: self.reloads_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for StoreManager {
    fn default() -> Self {
        Self::new()
    }
}
