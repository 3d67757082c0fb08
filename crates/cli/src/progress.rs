use catalog::IngestionEvent;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;

/// Spinner for short operations of unknown length
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Drive a progress bar from build events until the sender is dropped
pub async fn track_build(mut events: mpsc::UnboundedReceiver<IngestionEvent>) {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }

    while let Some(event) = events.recv().await {
        match event {
            IngestionEvent::Started { total_files, source } => {
                bar.set_length(total_files as u64);
                bar.set_message(format!("embedding {}", source.display()));
            }
            IngestionEvent::FileEmbedded { path, index } => {
                bar.set_position(index as u64);
                if let Some(name) = path.file_name() {
                    bar.set_message(name.to_string_lossy().into_owned());
                }
            }
            IngestionEvent::Completed { entries, duration } => {
                bar.finish_with_message(
                    format!(
                        "✓ {} images embedded in {:.1}s",
                        entries,
                        duration.as_secs_f64()
                    )
                    .green()
                    .to_string(),
                );
            }
            IngestionEvent::Failed { path, error } => {
                bar.abandon_with_message(
                    format!("✗ {}: {}", path.display(), error).red().to_string(),
                );
            }
        }
    }
}
