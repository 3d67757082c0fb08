use anyhow::{Context, Result};
use catalog::{CatalogConfig, QueryResult, RecommenderService};
use clap::Args;
use colored::*;
use prettytable::{row, Table};
use serde::Serialize;
use std::path::PathBuf;

use crate::progress;

/// Rank catalog images by visual similarity to a query image
#[derive(Debug, Args)]
pub struct RecommendCommand {
    /// Query image file
    image: PathBuf,

    /// Number of recommendations (default: default_top_k from config)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RecommendOutput<'a> {
    query: String,
    store_version: u64,
    matches: Vec<MatchOutput<'a>>,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    rank: usize,
    file_name: &'a str,
    identifier: &'a str,
    score: f32,
}

impl RecommendCommand {
    pub async fn execute(self, config: CatalogConfig) -> Result<()> {
        let bytes = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("Failed to read query image: {}", self.image.display()))?;

        let spinner = (!self.json && console::user_attended_stderr())
            .then(|| progress::spinner("Searching catalog..."));

        let service = RecommenderService::from_config(&config)?;
        let k = self.top_k.unwrap_or_else(|| service.default_top_k());
        let result = service.recommend_image(&bytes, k);

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let result = result?;

        if self.json {
            self.print_json(&result)
        } else {
            self.print_table(&result, service.manager().is_degraded());
            Ok(())
        }
    }

    fn print_json(&self, result: &QueryResult) -> Result<()> {
        let output = RecommendOutput {
            query: self.image.display().to_string(),
            store_version: result.store_version.get(),
            matches: result
                .iter()
                .enumerate()
                .map(|(i, m)| MatchOutput {
                    rank: i + 1,
                    file_name: m.file_name(),
                    identifier: &m.identifier,
                    score: m.score,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn print_table(&self, result: &QueryResult, degraded: bool) {
        if result.is_empty() {
            if degraded {
                println!(
                    "{} No catalog loaded; run {} first",
                    "!".yellow().bold(),
                    "lookalike build".bold()
                );
            } else {
                println!("{} No matches", "!".yellow().bold());
            }
            return;
        }

        println!(
            "\n{} {} similar to {} ({})\n",
            "Found".green(),
            result.len(),
            self.image.display().to_string().bold(),
            result.store_version
        );

        let mut table = Table::new();
        table.add_row(row!["#", "Image", "Score"]);
        for (i, m) in result.iter().enumerate() {
            table.add_row(row![i + 1, m.file_name(), format!("{:.4}", m.score)]);
        }
        table.printstd();
    }
}
