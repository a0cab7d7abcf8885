//! Download command.

use std::path::Path;

use anyhow::Context;
use console::style;

use roadcap::config::Settings;
use roadcap::download::{run_batch, YtDlpRunner};
use roadcap::export::read_captures_json;

use super::helpers::require_downloader;
use crate::cli::display::{print_batch_summary, ConsoleReporter};

/// Download every entry of a saved capture file.
pub async fn cmd_download(settings: &Settings, from: &Path, audio_only: bool) -> anyhow::Result<()> {
    let media = read_captures_json(from)
        .with_context(|| format!("Failed to read capture file {}", from.display()))?;

    if media.is_empty() {
        println!("{} {} has no captures", style("⚠").yellow(), from.display());
        return Ok(());
    }

    require_downloader(settings).await?;

    println!(
        "{} Downloading {} items as {}",
        style("→").cyan(),
        media.len(),
        if audio_only { "MP3" } else { "video" }
    );

    let options = settings.download_options(audio_only);
    let reporter = ConsoleReporter::new();
    let summary = run_batch(&YtDlpRunner, &media, &options, &reporter).await;
    print_batch_summary(&summary, &options.output_dir, audio_only);

    Ok(())
}
