//! Copy catalog images next to the presentation layer's static files.

use common::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::store::FeatureStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    pub copied: usize,
    pub already_present: usize,
    /// Identifiers whose source image could not be found
    pub missing: Vec<String>,
}

/// Make every catalog image available as `static_dir/<file name>`.
///
/// Identifiers are resolved as given first, then against the store's source
/// directory. Missing sources are reported, not fatal; existing files in
/// `static_dir` are left untouched.
pub fn mirror_images(store: &FeatureStore, static_dir: &Path) -> CatalogResult<MirrorReport> {
    std::fs::create_dir_all(static_dir)
        .map_err(|e| CatalogError::io("create static directory", static_dir, e))?;

    let mut report = MirrorReport::default();

    for entry in store.iter() {
        let Some(source) = resolve_source(store, &entry.identifier) else {
            warn!(identifier = %entry.identifier, "Catalog image not found; skipping mirror");
            report.missing.push(entry.identifier.clone());
            continue;
        };

        let Some(file_name) = source.file_name() else {
            report.missing.push(entry.identifier.clone());
            continue;
        };
        let destination = static_dir.join(file_name);

        if destination.exists() {
            report.already_present += 1;
            continue;
        }

        std::fs::copy(&source, &destination)
            .map_err(|e| CatalogError::io("copy catalog image", &destination, e))?;
        report.copied += 1;
    }

    info!(
        static_dir = %static_dir.display(),
        copied = report.copied,
        already_present = report.already_present,
        missing = report.missing.len(),
        "Mirrored catalog images"
    );

    Ok(report)
}

fn resolve_source(store: &FeatureStore, identifier: &str) -> Option<PathBuf> {
    let as_given = PathBuf::from(identifier);
    if as_given.is_file() {
        return Some(as_given);
    }

    let source_dir = store.source_dir()?;
    let file_name = as_given.file_name()?;
    let candidate = source_dir.join(file_name);
    candidate.is_file().then_some(candidate)
}
