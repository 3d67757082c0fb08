use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::manager::ManagerStatus;
use crate::store::FeatureStore;

/// Catalog health as seen by operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Serving a catalog, last reload succeeded
    Healthy,
    /// Serving a catalog, but the last reload failed
    Stale,
    /// Empty catalog: no recommendations
    Degraded,
}

/// Query counters, shared by all request workers
#[derive(Debug, Default)]
pub struct SearchStats {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    total_query_time_us: AtomicU64,
}

impl SearchStats {
    pub fn record_query(&self, duration: Duration, succeeded: bool) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.total_query_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if !succeeded {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries.load(Ordering::Relaxed)
    }

    pub fn avg_query_time_ms(&self) -> f64 {
        let queries = self.total_queries();
        if queries == 0 {
            0.0
        } else {
            self.total_query_time_us.load(Ordering::Relaxed) as f64 / queries as f64 / 1000.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogHealth {
    pub status: HealthStatus,
    pub version: u64,
    pub entries: usize,
    pub dimension: usize,
    pub built_at: Option<DateTime<Utc>>,
    pub embedder: Option<String>,
    pub source_dir: Option<String>,
    pub last_reload_at: Option<DateTime<Utc>>,
    pub last_reload_error: Option<String>,
    pub reloads_succeeded: u64,
    pub reloads_failed: u64,
    pub queries_served: u64,
    pub queries_failed: u64,
    pub avg_query_time_ms: f64,
}

impl CatalogHealth {
    pub fn collect(store: &FeatureStore, manager: &ManagerStatus, stats: &SearchStats) -> Self {
        let last_reload_error = manager
            .last_reload
            .as_ref()
            .and_then(|record| record.error.clone());

        let status = if store.is_empty() {
            HealthStatus::Degraded
        } else if last_reload_error.is_some() {
            HealthStatus::Stale
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            version: store.version().get(),
            entries: store.len(),
            dimension: store.dimension(),
            built_at: store.built_at(),
            embedder: store.embedder().map(str::to_string),
            source_dir: store.source_dir().map(|p| p.display().to_string()),
            last_reload_at: manager.last_reload.as_ref().map(|record| record.at),
            last_reload_error,
            reloads_succeeded: manager.reloads_succeeded,
            reloads_failed: manager.reloads_failed,
            queries_served: stats.total_queries(),
            queries_failed: stats.failed_queries(),
            avg_query_time_ms: stats.avg_query_time_ms(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
