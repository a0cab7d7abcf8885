//! Listing crawl command.

use std::path::Path;

use anyhow::Context;
use console::style;

use roadcap::browser::BrowserSession;
use roadcap::config::Settings;
use roadcap::crawl::ListingCrawler;
use roadcap::export::{write_records_csv, write_records_json};

use crate::cli::display::{print_records, ConsoleReporter};

/// Search the listing and collect records.
pub async fn cmd_crawl(
    settings: &Settings,
    keyword: Option<&str>,
    max_pages: usize,
    json: Option<&Path>,
    csv: Option<&Path>,
) -> anyhow::Result<()> {
    let page_cap = (max_pages > 0).then_some(max_pages);
    let crawler = ListingCrawler::new(settings.crawl_options(keyword, page_cap));

    println!(
        "{} Crawling {}",
        style("→").cyan(),
        style(&crawler.options().listing_url).dim()
    );

    let session = BrowserSession::launch(&settings.browser).await?;
    let reporter = ConsoleReporter::new();
    let outcome = match session.open_page().await {
        Ok(mut page) => crawler.run(&mut page, &reporter).await,
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    };
    reporter.finish();
    session.close().await;

    print_records(&outcome.records);

    if let Some(path) = json {
        write_records_json(path, &outcome.records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Saved JSON to {}", style("✓").green(), path.display());
    }
    if let Some(path) = csv {
        write_records_csv(path, &outcome.records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Saved CSV to {}", style("✓").green(), path.display());
    }

    Ok(())
}
