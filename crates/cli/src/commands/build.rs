use ai::ImageEmbedder;
use anyhow::Result;
use catalog::{CatalogConfig, IngestionPipeline};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::progress;

/// Build the catalog artifact from a directory of images
#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Image directory (default: source_dir from config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output artifact (default: artifact_path from config)
    #[arg(short, long)]
    artifact: Option<PathBuf>,
}

impl BuildCommand {
    pub async fn execute(self, config: CatalogConfig) -> Result<()> {
        let source = self.source.unwrap_or_else(|| config.source_dir.clone());
        let artifact = self.artifact.unwrap_or_else(|| config.artifact_path.clone());

        let embedder: Arc<dyn ImageEmbedder> = Arc::from(ai::create_embedder(&config.embedding)?);
        let embedder_name = embedder.name();
        let pipeline = IngestionPipeline::new(embedder, config.ingestion.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = tokio::spawn(progress::track_build(rx));
        let result = pipeline.build_and_publish(&source, &artifact, Some(tx)).await;
        let _ = tracker.await;
        let store = result?;

        println!("{} Catalog published", "✓".green());
        println!("  {}: {}", "Artifact".bold(), artifact.display());
        println!("  {}: {}", "Version".bold(), store.version());
        println!("  {}: {}", "Entries".bold(), store.len());
        println!("  {}: {} ({})", "Dimension".bold(), store.dimension(), embedder_name);
        Ok(())
    }
}
