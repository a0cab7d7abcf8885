//! Pagination crawl loop over the roadshow search listing.
//!
//! The loop is an explicit state machine:
//! `Searching -> ExtractingPage -> CheckingNext -> AdvancingPage -> ExtractingPage ...`
//! ending in `Done` with a [`Termination`] reason. Every page's records are
//! accumulated before any termination check, so a capped or exhausted crawl
//! keeps the last page's data.

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{BrowserPage, PageError};
use crate::extract::RecordExtractor;
use crate::models::Record;
use crate::report::{Progress, Reporter};
use crate::selectors::{resolve, Role, Strategy};

/// Pause between filling the keyword and submitting it.
const INPUT_SETTLE: Duration = Duration::from_millis(500);

/// Why the crawl stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The search could not be submitted; nothing to paginate.
    SearchFailed(String),
    /// A page yielded no records.
    Exhausted,
    /// The page cap was reached.
    PageCap,
    /// No enabled next-page control.
    NoNextPage,
    /// The next-page control could not be clicked.
    AdvanceFailed(String),
    /// The site returned the same page again after advancing.
    Stalled,
}

impl Termination {
    /// Whether the crawl ended without an error condition.
    pub fn is_clean(&self) -> bool {
        !matches!(
            self,
            Termination::SearchFailed(_) | Termination::AdvanceFailed(_)
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::SearchFailed(reason) => write!(f, "search failed: {}", reason),
            Termination::Exhausted => f.write_str("no more items"),
            Termination::PageCap => f.write_str("page limit reached"),
            Termination::NoNextPage => f.write_str("no more pages"),
            Termination::AdvanceFailed(reason) => {
                write!(f, "could not open next page: {}", reason)
            }
            Termination::Stalled => f.write_str("page did not change after advancing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlPhase {
    Searching,
    ExtractingPage,
    CheckingNext,
    AdvancingPage,
    Done(Termination),
}

/// Mutable state owned by one crawl.
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// 1-based index of the page currently shown.
    pub page_index: usize,
    pub records: Vec<Record>,
    pub page_cap: Option<usize>,
    pub phase: CrawlPhase,
    /// Pages whose records were accumulated.
    pub pages_extracted: usize,
    previous_page: Vec<Record>,
}

impl CrawlState {
    pub fn new(page_cap: Option<usize>) -> Self {
        Self {
            page_index: 1,
            records: Vec::new(),
            page_cap,
            phase: CrawlPhase::Searching,
            pages_extracted: 0,
            previous_page: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, CrawlPhase::Done(_))
    }

    fn cap_reached(&self) -> bool {
        self.page_cap.is_some_and(|cap| self.page_index >= cap)
    }
}

/// Terminal contents of a crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    pub termination: Termination,
    pub pages: usize,
}

/// Crawl parameters.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub listing_url: String,
    pub keyword: String,
    /// Stop after this many pages; `None` crawls until the listing ends.
    pub page_cap: Option<usize>,
    pub navigation_timeout: Duration,
    pub idle_timeout: Duration,
    /// Extra wait after network idle for the list to render.
    pub settle_delay: Duration,
    /// Pause after switching pages.
    pub page_interval: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            listing_url: "https://rs.p5w.net/roadshow".to_string(),
            keyword: "年度业绩说明会".to_string(),
            page_cap: None,
            navigation_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            page_interval: Duration::from_secs(1),
        }
    }
}

/// Drives search and pagination on one page.
pub struct ListingCrawler {
    options: CrawlOptions,
    extractor: RecordExtractor,
}

impl ListingCrawler {
    pub fn new(options: CrawlOptions) -> Self {
        let base = Url::parse(&options.listing_url).ok();
        Self {
            extractor: RecordExtractor::new().with_base(base),
            options,
        }
    }

    /// Replace the record extractor.
    pub fn with_extractor(mut self, extractor: RecordExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Run the crawl to completion.
    pub async fn run<P>(&self, page: &mut P, reporter: &dyn Reporter) -> CrawlOutcome
    where
        P: BrowserPage + ?Sized,
    {
        let mut state = CrawlState::new(self.options.page_cap);

        while !state.is_done() {
            let next = self.step(page, &mut state, reporter).await;
            debug!("Crawl phase {:?} -> {:?}", state.phase, next);
            state.phase = next;
        }

        let termination = match state.phase {
            CrawlPhase::Done(termination) => termination,
            _ => Termination::Exhausted,
        };

        match &termination {
            Termination::SearchFailed(reason) => {
                error!("Search failed, crawl aborted: {}", reason)
            }
            Termination::AdvanceFailed(reason) => warn!("Crawl stopped early: {}", reason),
            _ => info!("Crawl finished: {}", termination),
        }

        reporter.report(&Progress::CrawlFinished {
            records: state.records.len(),
            pages: state.pages_extracted,
            termination: termination.clone(),
        });

        CrawlOutcome {
            records: state.records,
            termination,
            pages: state.pages_extracted,
        }
    }

    /// Perform the current phase and return the next one.
    pub async fn step<P>(
        &self,
        page: &mut P,
        state: &mut CrawlState,
        reporter: &dyn Reporter,
    ) -> CrawlPhase
    where
        P: BrowserPage + ?Sized,
    {
        match state.phase.clone() {
            CrawlPhase::Searching => match self.search(page, reporter).await {
                Ok(()) => CrawlPhase::ExtractingPage,
                Err(reason) => CrawlPhase::Done(Termination::SearchFailed(reason)),
            },
            CrawlPhase::ExtractingPage => self.extract_page(page, state, reporter).await,
            CrawlPhase::CheckingNext => self.check_next(page).await,
            CrawlPhase::AdvancingPage => self.advance(page, state, reporter).await,
            CrawlPhase::Done(termination) => CrawlPhase::Done(termination),
        }
    }

    async fn search<P>(&self, page: &mut P, reporter: &dyn Reporter) -> Result<(), String>
    where
        P: BrowserPage + ?Sized,
    {
        let opts = &self.options;
        info!("Opening {}", opts.listing_url);
        page.goto(&opts.listing_url, opts.navigation_timeout)
            .await
            .map_err(|e| e.to_string())?;
        self.settle(page).await;

        let input = resolve(page, Role::SearchInput)
            .await
            .ok_or_else(|| "search input not found".to_string())?;
        page.fill(&input.locator, &opts.keyword)
            .await
            .map_err(|e| format!("could not enter keyword: {}", e))?;
        page.pause(INPUT_SETTLE).await;

        let clicked = match resolve(page, Role::SearchButton).await {
            Some(button) => match page.click(&button.locator).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Search button click failed: {}", e);
                    false
                }
            },
            None => {
                warn!("Search button not found, submitting with Enter");
                false
            }
        };

        if !clicked {
            page.press_enter(&input.locator)
                .await
                .map_err(|e| format!("could not submit search: {}", e))?;
        }

        reporter.report(&Progress::SearchSubmitted {
            keyword: opts.keyword.clone(),
        });
        self.settle(page).await;
        Ok(())
    }

    async fn extract_page<P>(
        &self,
        page: &mut P,
        state: &mut CrawlState,
        reporter: &dyn Reporter,
    ) -> CrawlPhase
    where
        P: BrowserPage + ?Sized,
    {
        reporter.report(&Progress::PageStarted {
            page: state.page_index,
        });

        let extraction = match page.content().await {
            Ok(html) => self.extractor.extract_page(&html),
            Err(e) => {
                warn!("Could not read page {}: {}", state.page_index, e);
                Default::default()
            }
        };

        if state.page_index > 1
            && !extraction.records.is_empty()
            && extraction.records == state.previous_page
        {
            warn!(
                "Page {} repeats the previous page, stopping",
                state.page_index
            );
            return CrawlPhase::Done(Termination::Stalled);
        }

        let kept = extraction.records.len();
        state.records.extend(extraction.records.iter().cloned());
        state.previous_page = extraction.records;
        if kept > 0 {
            state.pages_extracted += 1;
        }

        reporter.report(&Progress::PageExtracted {
            page: state.page_index,
            examined: extraction.examined,
            kept,
            total: state.records.len(),
        });

        if kept == 0 {
            return CrawlPhase::Done(Termination::Exhausted);
        }
        if state.cap_reached() {
            return CrawlPhase::Done(Termination::PageCap);
        }
        CrawlPhase::CheckingNext
    }

    async fn check_next<P>(&self, page: &mut P) -> CrawlPhase
    where
        P: BrowserPage + ?Sized,
    {
        let Some(control) = resolve(page, Role::NextPage).await else {
            return CrawlPhase::Done(Termination::NoNextPage);
        };
        if is_enabled(page, control).await {
            CrawlPhase::AdvancingPage
        } else {
            CrawlPhase::Done(Termination::NoNextPage)
        }
    }

    async fn advance<P>(
        &self,
        page: &mut P,
        state: &mut CrawlState,
        reporter: &dyn Reporter,
    ) -> CrawlPhase
    where
        P: BrowserPage + ?Sized,
    {
        // The DOM may have changed since the check.
        let Some(control) = resolve(page, Role::NextPage).await else {
            return CrawlPhase::Done(Termination::AdvanceFailed(
                "next page control disappeared".to_string(),
            ));
        };
        if !is_enabled(page, control).await {
            return CrawlPhase::Done(Termination::NoNextPage);
        }

        if let Err(e) = page.click(&control.locator).await {
            return CrawlPhase::Done(Termination::AdvanceFailed(e.to_string()));
        }

        self.settle(page).await;
        state.page_index += 1;
        reporter.report(&Progress::PageAdvanced {
            page: state.page_index,
        });
        page.pause(self.options.page_interval).await;

        CrawlPhase::ExtractingPage
    }

    /// Wait for network idle, then the fixed settle delay.
    async fn settle<P>(&self, page: &mut P)
    where
        P: BrowserPage + ?Sized,
    {
        match page.wait_for_network_idle(self.options.idle_timeout).await {
            Ok(()) => {}
            Err(PageError::Timeout(msg)) => debug!("Network idle wait timed out: {}", msg),
            Err(e) => warn!("Network idle wait failed: {}", e),
        }
        page.pause(self.options.settle_delay).await;
        // The crawl never inspects requests; keep the buffer from growing.
        page.discard_requests().await;
    }
}

/// Whether the resolved next-page control is usable.
///
/// A failed class lookup counts as enabled; a vanished element does not.
async fn is_enabled<P>(page: &mut P, control: &Strategy) -> bool
where
    P: BrowserPage + ?Sized,
{
    match page.class_of(&control.locator, control.class_scope).await {
        Ok(Some(class)) => {
            let stopped = control.is_stopped(&class);
            if stopped {
                debug!("Next control {} is disabled ({})", control.locator, class);
            }
            !stopped
        }
        Ok(None) => false,
        Err(e) => {
            debug!("Could not read class of {}: {}", control.locator, e);
            true
        }
    }
}
