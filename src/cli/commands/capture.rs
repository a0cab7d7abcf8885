//! Media capture command.

use std::path::Path;

use anyhow::Context;
use console::style;

use roadcap::browser::BrowserSession;
use roadcap::capture::MediaCapturer;
use roadcap::config::Settings;
use roadcap::download::{run_batch, YtDlpRunner};
use roadcap::export::write_captures_json;

use super::helpers::require_downloader;
use crate::cli::display::{print_batch_summary, print_captures, ConsoleReporter};

/// Capture stream URLs from each target page, optionally downloading them.
pub async fn cmd_capture(
    settings: &Settings,
    targets: &[String],
    audio_only: bool,
    save: Option<&Path>,
    download: bool,
) -> anyhow::Result<()> {
    if download {
        require_downloader(settings).await?;
    }

    println!(
        "{} Capturing media from {} pages",
        style("→").cyan(),
        targets.len()
    );

    let capturer = MediaCapturer::new(settings.capture_options());
    let session = BrowserSession::launch(&settings.browser).await?;
    let reporter = ConsoleReporter::new();
    let log = match session.open_page().await {
        Ok(mut page) => capturer.capture_all(&mut page, targets, &reporter).await,
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    };
    reporter.finish();
    session.close().await;

    let media = log.into_entries();
    print_captures(&media);
    if media.is_empty() {
        return Ok(());
    }

    if let Some(path) = save {
        write_captures_json(path, &media)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{} Saved {} captures to {}",
            style("✓").green(),
            media.len(),
            path.display()
        );
    }

    if download {
        let options = settings.download_options(audio_only);
        let summary = run_batch(&YtDlpRunner, &media, &options, &reporter).await;
        print_batch_summary(&summary, &options.output_dir, audio_only);
    } else {
        println!(
            "\n{} Download later with: roadcap download --from <capture file>",
            style("→").dim()
        );
    }

    Ok(())
}
