use anyhow::Result;
use catalog::{CatalogConfig, CatalogError, ConfigLoader};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use common::{init_structured_logging, LoggingConfig};
use std::path::{Path, PathBuf};
use tracing::Level;

mod commands;
mod progress;

use commands::{BuildCommand, HealthCommand, MirrorCommand, RecommendCommand};

#[derive(Parser)]
#[command(name = "lookalike")]
#[command(about = "Visually similar product recommendations from an image catalog")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./lookalike.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a directory of images and publish the catalog artifact
    Build(BuildCommand),
    /// Find catalog images that look like a query image
    Recommend(RecommendCommand),
    /// Report the state of the published catalog
    Health(HealthCommand),
    /// Copy catalog images into the static directory served to users
    Mirror(MirrorCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let logging = LoggingConfig::default()
        .with_level(level)
        .json(cli.json_logs);
    if let Err(e) = init_structured_logging(logging) {
        eprintln!("{} failed to initialise logging: {}", "✗".red(), e);
    }

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Build(cmd) => cmd.execute(config).await,
        Commands::Recommend(cmd) => cmd.execute(config).await,
        Commands::Health(cmd) => cmd.execute(config).await,
        Commands::Mirror(cmd) => cmd.execute(config).await,
    }
}

async fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    match path {
        Some(path) => ConfigLoader::load_from(path).await,
        None => ConfigLoader::new().load().await,
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
    if let Some(catalog_error) = error.downcast_ref::<CatalogError>() {
        eprintln!(
            "  {} {}",
            "hint:".yellow(),
            catalog_error.recovery_strategy().hint()
        );
    }
}
