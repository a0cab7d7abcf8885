//! Per-target media capture loop.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::classify::{classify_request, ManifestFilter};
use super::log::CaptureLog;
use crate::browser::{BrowserPage, ObservedRequest, PageError, ResourceKind};
use crate::models::CapturedMedia;
use crate::report::{Progress, Reporter};
use crate::selectors::{resolve, Role};
use crate::utils::truncate_display;

/// Title recorded when the page has not rendered one yet.
pub const UNTITLED: &str = "untitled";

/// Capture timing and filtering.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub navigation_timeout: Duration,
    /// Observation window after navigation, before looking for a play trigger.
    pub initial_wait: Duration,
    /// Observation window after the play trigger.
    pub capture_wait: Duration,
    pub manifest_filters: Vec<ManifestFilter>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            initial_wait: Duration::from_secs(3),
            capture_wait: Duration::from_secs(15),
            manifest_filters: Vec::new(),
        }
    }
}

/// Visits target pages one at a time and records media requests.
pub struct MediaCapturer {
    options: CaptureOptions,
}

impl MediaCapturer {
    pub fn new(options: CaptureOptions) -> Self {
        Self { options }
    }

    /// Capture media from every target, skipping targets that fail.
    pub async fn capture_all<P>(
        &self,
        page: &mut P,
        targets: &[String],
        reporter: &dyn Reporter,
    ) -> CaptureLog
    where
        P: BrowserPage + ?Sized,
    {
        let mut log = CaptureLog::new();
        let total = targets.len();

        for (i, url) in targets.iter().enumerate() {
            reporter.report(&Progress::TargetStarted {
                index: i + 1,
                total,
                url: url.clone(),
            });

            match self.capture_target(page, url, &mut log, reporter).await {
                Ok(found) => debug!("{} new media from {}", found, url),
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    reporter.report(&Progress::TargetFailed {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        reporter.report(&Progress::CaptureFinished {
            targets: total,
            captured: log.len(),
        });
        log
    }

    /// Navigate to one target, trigger playback and observe requests.
    ///
    /// Returns the number of new entries added to `log`.
    pub async fn capture_target<P>(
        &self,
        page: &mut P,
        url: &str,
        log: &mut CaptureLog,
        reporter: &dyn Reporter,
    ) -> Result<usize, PageError>
    where
        P: BrowserPage + ?Sized,
    {
        let before = log.len();
        // Requests left over from the previous target belong to that page.
        page.discard_requests().await;
        page.goto(url, self.options.navigation_timeout).await?;

        reporter.report(&Progress::Waiting {
            reason: "Waiting for page to load".to_string(),
            duration: self.options.initial_wait,
        });
        self.observe_for(page, self.options.initial_wait, log, reporter)
            .await;

        let trigger = match resolve(page, Role::PlayTrigger).await {
            Some(strategy) => match page.click(&strategy.locator).await {
                Ok(()) => Some(strategy.locator.to_string()),
                Err(e) => {
                    warn!("Play trigger {} click failed: {}", strategy.locator, e);
                    None
                }
            },
            None => None,
        };
        reporter.report(&Progress::PlayTriggered { selector: trigger });

        reporter.report(&Progress::Waiting {
            reason: "Waiting for media requests".to_string(),
            duration: self.options.capture_wait,
        });
        self.observe_for(page, self.options.capture_wait, log, reporter)
            .await;

        Ok(log.len() - before)
    }

    /// Drain requests until `window` elapses.
    async fn observe_for<P>(
        &self,
        page: &mut P,
        window: Duration,
        log: &mut CaptureLog,
        reporter: &dyn Reporter,
    ) where
        P: BrowserPage + ?Sized,
    {
        let deadline = Instant::now() + window;
        while let Some(request) = page.next_request(deadline).await {
            self.observe(page, &request, log, reporter).await;
        }
        // The stream may run dry before the window closes.
        let now = Instant::now();
        if now < deadline {
            page.pause(deadline - now).await;
        }
    }

    /// Classify one request and record it if it is new media.
    pub async fn observe<P>(
        &self,
        page: &mut P,
        request: &ObservedRequest,
        log: &mut CaptureLog,
        reporter: &dyn Reporter,
    ) -> bool
    where
        P: BrowserPage + ?Sized,
    {
        if matches!(
            request.kind,
            ResourceKind::Media | ResourceKind::Xhr | ResourceKind::Fetch
        ) {
            debug!("{:?}: {}", request.kind, truncate_display(&request.url, 100));
        }

        let Some(transport_type) = classify_request(request, &self.options.manifest_filters)
        else {
            return false;
        };
        if log.contains(&request.url) {
            return false;
        }

        let page_url = match page.current_url().await {
            Ok(u) => u,
            Err(e) => {
                debug!("Could not read page URL: {}", e);
                String::new()
            }
        };
        let page_title = match page.title().await {
            Ok(t) if !t.trim().is_empty() => t.trim().to_string(),
            Ok(_) => UNTITLED.to_string(),
            Err(e) => {
                debug!("Could not read page title: {}", e);
                UNTITLED.to_string()
            }
        };

        let media = CapturedMedia {
            media_url: request.url.clone(),
            transport_type,
            referer: request.header("referer").map(str::to_string),
            origin: request.header("origin").map(str::to_string),
            user_agent: request.header("user-agent").map(str::to_string),
            page_url,
            page_title,
        };

        info!("Captured {} media: {}", media.transport_type, media.media_url);
        reporter.report(&Progress::MediaCaptured {
            media: media.clone(),
        });
        log.record(media)
    }
}
