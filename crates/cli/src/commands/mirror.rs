use anyhow::{bail, Result};
use catalog::{mirror_images, CatalogConfig, RecommenderService};
use clap::Args;
use colored::*;
use std::path::PathBuf;

/// Copy catalog images to where the presentation layer serves them
#[derive(Debug, Args)]
pub struct MirrorCommand {
    /// Target directory (default: static_dir from config)
    #[arg(short, long)]
    static_dir: Option<PathBuf>,
}

impl MirrorCommand {
    pub async fn execute(self, config: CatalogConfig) -> Result<()> {
        let static_dir = self.static_dir.unwrap_or_else(|| config.static_dir.clone());

        let service = RecommenderService::from_config(&config)?;
        if service.manager().is_degraded() {
            bail!(
                "no catalog loaded from {}; run `lookalike build` first",
                service.artifact_path().display()
            );
        }

        let store = service.manager().current();
        let report = tokio::task::spawn_blocking(move || mirror_images(&store, &static_dir)).await??;

        println!(
            "{} {} copied, {} already present",
            "✓".green(),
            report.copied,
            report.already_present
        );
        if !report.missing.is_empty() {
            println!("{} {} images not found:", "!".yellow().bold(), report.missing.len());
            for identifier in &report.missing {
                println!("  {}", identifier);
            }
        }
        Ok(())
    }
}
