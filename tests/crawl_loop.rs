//! Crawl loop behavior against an in-memory listing site.

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use roadcap::crawl::{CrawlOptions, ListingCrawler, Termination};
use roadcap::report::{Progress, TracingReporter};

use common::{drain, listing, Item, MockListingSite, LISTING_URL};

const KEYWORD: &str = "annual results briefing";

fn options(page_cap: Option<usize>) -> CrawlOptions {
    CrawlOptions {
        listing_url: LISTING_URL.to_string(),
        keyword: KEYWORD.to_string(),
        page_cap,
        navigation_timeout: Duration::from_secs(5),
        idle_timeout: Duration::ZERO,
        settle_delay: Duration::ZERO,
        page_interval: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_two_pages_until_next_disabled() {
    let pages = listing(2, 5, KEYWORD);
    let expected: Vec<_> = pages.iter().flatten().cloned().collect();
    let mut site = MockListingSite::new(pages);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = ListingCrawler::new(options(None)).run(&mut site, &tx).await;

    assert_eq!(outcome.termination, Termination::NoNextPage);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.records.len(), 10);
    assert_eq!(site.keyword.as_deref(), Some(KEYWORD));
    assert!(!site.submitted_with_enter);
    assert_eq!(site.next_clicks, 1);

    for (record, item) in outcome.records.iter().zip(&expected) {
        assert_eq!(record.title.as_deref(), Some(item.title.as_str()));
        assert!(record.title_str().contains(KEYWORD));
        assert_eq!(record.detail_url.as_deref(), Some(item.detail_url().as_str()));
        assert_eq!(record.entity_name.as_deref(), Some(item.company.as_str()));
        assert_eq!(record.entity_code.as_deref(), Some(item.code.as_str()));
        assert_eq!(record.timestamp, item.time);
    }

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(Progress::SearchSubmitted { keyword }) if keyword == KEYWORD
    ));
    let extracted: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            Progress::PageExtracted { page, total, .. } => Some((*page, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(extracted, vec![(1, 5), (2, 10)]);
    assert!(matches!(
        events.last(),
        Some(Progress::CrawlFinished {
            records: 10,
            pages: 2,
            termination: Termination::NoNextPage
        })
    ));
}

#[tokio::test]
async fn test_page_cap_stops_early() {
    let mut site = MockListingSite::new(listing(4, 5, KEYWORD));

    let outcome = ListingCrawler::new(options(Some(2)))
        .run(&mut site, &TracingReporter)
        .await;

    assert_eq!(outcome.termination, Termination::PageCap);
    assert_eq!(outcome.records.len(), 10);
    assert_eq!(site.next_clicks, 1);
}

#[tokio::test]
async fn test_empty_results_page_is_exhausted() {
    let mut site = MockListingSite::new(vec![Vec::new()]);

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages, 0);
}

#[tokio::test]
async fn test_navigation_failure_aborts_search() {
    let mut site = MockListingSite::new(listing(1, 5, KEYWORD));
    site.fail_navigation = true;

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert!(matches!(outcome.termination, Termination::SearchFailed(_)));
    assert!(!outcome.termination.is_clean());
    assert!(outcome.records.is_empty());
    assert!(site.keyword.is_none());
}

#[tokio::test]
async fn test_missing_search_button_submits_with_enter() {
    let mut site = MockListingSite::new(listing(1, 3, KEYWORD));
    site.with_search_button = false;

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert!(site.submitted_with_enter);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.termination, Termination::NoNextPage);
}

#[tokio::test]
async fn test_repeated_page_stops_as_stalled() {
    let mut site = MockListingSite::new(listing(3, 5, KEYWORD));
    site.stuck_pager = true;

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(outcome.records.len(), 5);
    assert_eq!(outcome.pages, 1);
}

#[tokio::test]
async fn test_missing_search_input_fails_search() {
    let mut site = MockListingSite::new(listing(1, 5, KEYWORD));
    site.with_search_input = false;

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert!(matches!(
        &outcome.termination,
        Termination::SearchFailed(reason) if reason.contains("search input")
    ));
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages, 0);
    assert!(site.keyword.is_none());
}

#[tokio::test]
async fn test_empty_later_page_is_exhausted() {
    let mut first = listing(1, 5, KEYWORD);
    let pages = vec![
        first.remove(0),
        Vec::new(),
        (6..=10).map(|id| Item::new(id, KEYWORD)).collect(),
    ];
    let mut site = MockListingSite::new(pages);

    let outcome = ListingCrawler::new(options(None))
        .run(&mut site, &TracingReporter)
        .await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(outcome.records.len(), 5);
    assert_eq!(outcome.pages, 1);
    assert_eq!(site.next_clicks, 1);
}
