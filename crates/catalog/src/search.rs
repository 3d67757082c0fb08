use common::{CatalogError, CatalogResult};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

use crate::store::FeatureStore;
use crate::types::{CatalogEntry, EmbeddingVector, QueryResult, ScoredMatch};

/// Entries scored between two checks of the cancellation flag
pub const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Below this many entries the parallel scan is not worth the scheduling cost
#[cfg(feature = "parallel-scan")]
const PARALLEL_MIN_ENTRIES: usize = 4 * CANCEL_CHECK_INTERVAL;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Matches scoring below this are dropped after ranking
    pub score_threshold: Option<f32>,
}

impl SearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            score_threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::top_k(6)
    }
}

/// Flag a caller sets to abandon a running query
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// Exhaustive cosine-similarity ranking over a store snapshot.
///
/// Every entry is scored with a dot product against the query (all vectors
/// are unit-norm), so a query costs O(N·D). There is no index; this is the
/// intended design for catalogs up to roughly 10^5 items.
///
/// Scores are sorted descending with a stable sort, so entries with equal
/// scores come out in catalog insertion order. The engine holds no state and
/// takes no locks; it borrows the snapshot only for the duration of a call.
pub struct SimilarityEngine;

impl SimilarityEngine {
    pub fn query(store: &FeatureStore, query: &EmbeddingVector, k: usize) -> CatalogResult<QueryResult> {
        Self::run(store, query, &SearchOptions::top_k(k), None)
    }

    pub fn query_with_options(
        store: &FeatureStore,
        query: &EmbeddingVector,
        options: &SearchOptions,
    ) -> CatalogResult<QueryResult> {
        Self::run(store, query, options, None)
    }

    /// Like [`query_with_options`](Self::query_with_options) but gives up with
    /// [`CatalogError::Cancelled`] once `cancel` is set
    pub fn query_cancellable(
        store: &FeatureStore,
        query: &EmbeddingVector,
        options: &SearchOptions,
        cancel: &CancellationFlag,
    ) -> CatalogResult<QueryResult> {
        Self::run(store, query, options, Some(cancel))
    }

    fn run(
        store: &FeatureStore,
        query: &EmbeddingVector,
        options: &SearchOptions,
        cancel: Option<&CancellationFlag>,
    ) -> CatalogResult<QueryResult> {
        if options.top_k == 0 {
            return Err(CatalogError::InvalidArgument(
                "k must be a positive integer".to_string(),
            ));
        }
        if let Some(threshold) = options.score_threshold {
            if !threshold.is_finite() {
                return Err(CatalogError::InvalidArgument(format!(
                    "score threshold {} is not finite",
                    threshold
                )));
            }
        }

        if store.is_empty() {
            return Ok(QueryResult::empty(store.version()));
        }

        if query.dimension() != store.dimension() {
            return Err(CatalogError::dimension_mismatch(
                store.dimension(),
                query.dimension(),
                "query vector",
            ));
        }

        let scores = score_entries(store.entries(), query, cancel)?;

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        // stable: equal scores keep insertion order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let threshold = options.score_threshold.unwrap_or(f32::NEG_INFINITY);
        let matches: Vec<ScoredMatch> = ranked
            .into_iter()
            .take_while(|(_, score)| *score >= threshold)
            .take(options.top_k)
            .map(|(index, score)| ScoredMatch {
                identifier: store.entries()[index].identifier.clone(),
                score,
            })
            .collect();

        debug!(
            entries = store.len(),
            returned = matches.len(),
            top_k = options.top_k,
            version = store.version().get(),
            "Similarity query ranked"
        );

        Ok(QueryResult {
            matches,
            store_version: store.version(),
        })
    }
}

#[cfg(not(feature = "parallel-scan"))]
fn score_entries(
    entries: &[CatalogEntry],
    query: &EmbeddingVector,
    cancel: Option<&CancellationFlag>,
) -> CatalogResult<Vec<f32>> {
    score_serial(entries, query, cancel)
}

#[cfg(feature = "parallel-scan")]
fn score_entries(
    entries: &[CatalogEntry],
    query: &EmbeddingVector,
    cancel: Option<&CancellationFlag>,
) -> CatalogResult<Vec<f32>> {
    use rayon::prelude::*;

    if entries.len() < PARALLEL_MIN_ENTRIES {
        return score_serial(entries, query, cancel);
    }

    let total = entries.len();
    let chunks: Vec<CatalogResult<Vec<f32>>> = entries
        .par_chunks(CANCEL_CHECK_INTERVAL)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            if cancel.map_or(false, CancellationFlag::is_cancelled) {
                return Err(CatalogError::Cancelled {
                    scanned: chunk_index * CANCEL_CHECK_INTERVAL,
                    total,
                });
            }
            Ok(chunk.iter().map(|entry| query.dot(&entry.vector)).collect())
        })
        .collect();

    let mut scores = Vec::with_capacity(total);
    for chunk in chunks {
        scores.extend(chunk?);
    }
    Ok(scores)
}

fn score_serial(
    entries: &[CatalogEntry],
    query: &EmbeddingVector,
    cancel: Option<&CancellationFlag>,
) -> CatalogResult<Vec<f32>> {
    let total = entries.len();
    let mut scores = Vec::with_capacity(total);

    for (index, entry) in entries.iter().enumerate() {
        if index % CANCEL_CHECK_INTERVAL == 0 {
            if let Some(flag) = cancel {
                if flag.is_cancelled() {
                    return Err(CatalogError::Cancelled { scanned: index, total });
                }
            }
        }
        scores.push(query.dot(&entry.vector));
    }

    Ok(scores)
}
