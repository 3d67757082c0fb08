use anyhow::Result;
use catalog::{CatalogConfig, CatalogHealth, HealthStatus, RecommenderService};
use clap::Args;
use colored::*;

/// Show whether a catalog is loaded and how it was built
#[derive(Debug, Args)]
pub struct HealthCommand {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl HealthCommand {
    pub async fn execute(self, config: CatalogConfig) -> Result<()> {
        let service = RecommenderService::from_config(&config)?;
        let health = service.health();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&health)?);
        } else {
            print_report(&health, &config);
        }
        Ok(())
    }
}

fn print_report(health: &CatalogHealth, config: &CatalogConfig) {
    println!("{}", "=== Catalog Health ===".bold().blue());

    let status = match health.status {
        HealthStatus::Healthy => "HEALTHY".green(),
        HealthStatus::Stale => "STALE".yellow(),
        HealthStatus::Degraded => "DEGRADED".red().bold(),
    };
    println!("{}: {}", "Status".bold(), status);
    println!("{}: {}", "Artifact".bold(), config.artifact_path.display());

    if health.entries > 0 {
        println!("{}: v{}", "Version".bold(), health.version);
        println!("{}: {}", "Entries".bold(), health.entries);
        println!("{}: {}", "Dimension".bold(), health.dimension);
        if let Some(embedder) = &health.embedder {
            println!("{}: {}", "Embedder".bold(), embedder);
        }
        if let Some(built_at) = health.built_at {
            println!("{}: {}", "Built".bold(), built_at.to_rfc3339());
        }
        if let Some(source) = &health.source_dir {
            println!("{}: {}", "Source".bold(), source);
        }
    }

    if let Some(error) = &health.last_reload_error {
        println!("{}: {}", "Last load error".bold(), error.red());
    }
}
