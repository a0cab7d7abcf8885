//! Progress events emitted by the crawl, capture and download engines.
//!
//! Engines never print. They hand [`Progress`] events to an injected
//! [`Reporter`], scoped to one session.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::crawl::Termination;
use crate::models::CapturedMedia;

/// Events emitted during crawl, capture and download sessions.
#[derive(Debug, Clone)]
pub enum Progress {
    /// Search keyword submitted on the listing page
    SearchSubmitted { keyword: String },
    /// Extraction of a listing page started
    PageStarted { page: usize },
    /// Listing page extracted
    PageExtracted {
        page: usize,
        examined: usize,
        kept: usize,
        total: usize,
    },
    /// Next page control clicked
    PageAdvanced { page: usize },
    /// Crawl loop reached a terminal state
    CrawlFinished {
        records: usize,
        pages: usize,
        termination: Termination,
    },
    /// Capture of a target page started
    TargetStarted {
        index: usize,
        total: usize,
        url: String,
    },
    /// Target page could not be processed and was skipped
    TargetFailed { url: String, error: String },
    /// Waiting on the page for requests
    Waiting { reason: String, duration: Duration },
    /// Play trigger clicked (`None` if no trigger was found)
    PlayTriggered { selector: Option<String> },
    /// New media URL captured
    MediaCaptured { media: CapturedMedia },
    /// All targets processed
    CaptureFinished { targets: usize, captured: usize },
    /// Download job started
    DownloadStarted {
        index: usize,
        total: usize,
        title: String,
        output: PathBuf,
    },
    /// Download job produced its expected output
    DownloadCompleted { title: String, output: PathBuf, bytes: u64 },
    /// Download job failed
    DownloadFailed { title: String, error: String },
    /// Download batch finished
    BatchFinished { succeeded: usize, failed: usize },
}

/// Receives progress events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &Progress);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &Progress) {
        match event {
            Progress::SearchSubmitted { keyword } => info!("Searching for {}", keyword),
            Progress::PageStarted { page } => info!("Crawling page {}", page),
            Progress::PageExtracted {
                page,
                examined,
                kept,
                total,
            } => info!(
                "Page {}: {} items examined, {} kept, {} total",
                page, examined, kept, total
            ),
            Progress::PageAdvanced { page } => debug!("Advanced to page {}", page),
            Progress::CrawlFinished {
                records,
                pages,
                termination,
            } => info!(
                "Crawl finished after {} pages with {} records: {}",
                pages, records, termination
            ),
            Progress::TargetStarted { index, total, url } => {
                info!("Processing [{}/{}]: {}", index, total, url)
            }
            Progress::TargetFailed { url, error } => warn!("Skipping {}: {}", url, error),
            Progress::Waiting { reason, duration } => debug!("{} ({:?})", reason, duration),
            Progress::PlayTriggered { selector } => match selector {
                Some(s) => debug!("Clicked play trigger {}", s),
                None => debug!("No play trigger found, waiting for autoplay"),
            },
            Progress::MediaCaptured { media } => info!(
                "Captured {} media for {}: {}",
                media.transport_type, media.page_title, media.media_url
            ),
            Progress::CaptureFinished { targets, captured } => {
                info!("Captured {} media from {} pages", captured, targets)
            }
            Progress::DownloadStarted {
                index,
                total,
                title,
                output,
            } => info!(
                "Downloading [{}/{}] {} -> {}",
                index,
                total,
                title,
                output.display()
            ),
            Progress::DownloadCompleted { title, bytes, .. } => {
                info!("Downloaded {} ({} bytes)", title, bytes)
            }
            Progress::DownloadFailed { title, error } => {
                warn!("Download failed for {}: {}", title, error)
            }
            Progress::BatchFinished { succeeded, failed } => {
                info!("Batch finished: {} succeeded, {} failed", succeeded, failed)
            }
        }
    }
}

/// Channel-backed reporter for consumers running on another task.
impl Reporter for mpsc::UnboundedSender<Progress> {
    fn report(&self, event: &Progress) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.send(event.clone());
    }
}
