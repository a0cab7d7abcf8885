//! Console rendering of progress events and results.

use std::sync::Mutex;
use std::time::Duration;

use console::{pad_str, style, Alignment};
use indicatif::{ProgressBar, ProgressStyle};

use roadcap::crawl::Termination;
use roadcap::download::{BatchSummary, DependencyReport};
use roadcap::models::{CapturedMedia, Record};
use roadcap::report::{Progress, Reporter};
use roadcap::utils::{format_size, truncate_display};

/// Renders [`Progress`] events on the terminal.
///
/// Waits are shown as a spinner; every other event is printed as a line
/// above it.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn println(&self, line: String) {
        if let Ok(guard) = self.spinner.lock() {
            if let Some(ref pb) = *guard {
                pb.println(line);
                return;
            }
        }
        println!("{}", line);
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    /// Clear any active spinner.
    pub fn finish(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &Progress) {
        match event {
            Progress::Waiting { reason, duration } => {
                self.start_spinner(format!("{} ({}s)", reason, duration.as_secs()));
                return;
            }
            Progress::PlayTriggered { .. }
            | Progress::MediaCaptured { .. }
            | Progress::TargetStarted { .. }
            | Progress::TargetFailed { .. }
            | Progress::CaptureFinished { .. } => {}
            _ => self.finish(),
        }

        let line = match event {
            Progress::SearchSubmitted { keyword } => {
                format!("{} Searching for {}", style("→").cyan(), style(keyword).bold())
            }
            Progress::PageStarted { page } => {
                format!("\n{}", style(format!("Page {}", page)).bold())
            }
            Progress::PageExtracted {
                page,
                examined,
                kept,
                total,
            } => format!(
                "  {} page {}: {} of {} items kept, {} total",
                style("✓").green(),
                page,
                kept,
                examined,
                total
            ),
            Progress::PageAdvanced { .. } => return,
            Progress::CrawlFinished {
                records,
                pages,
                termination,
            } => format!(
                "\n{} {} records from {} pages ({})",
                termination_icon(termination),
                style(records).bold(),
                pages,
                termination
            ),
            Progress::TargetStarted { index, total, url } => format!(
                "\n{} {}",
                style(format!("[{}/{}]", index, total)).bold(),
                url
            ),
            Progress::TargetFailed { url, error } => format!(
                "  {} {}: {}",
                style("✗").red(),
                truncate_display(url, 60),
                error
            ),
            Progress::Waiting { .. } => return,
            Progress::PlayTriggered { selector } => match selector {
                Some(s) => format!("  {} clicked {}", style("▶").cyan(), style(s).dim()),
                None => format!(
                    "  {}",
                    style("no play button found, waiting for autoplay").dim()
                ),
            },
            Progress::MediaCaptured { media } => format!(
                "  {} captured {} media: {}",
                style("✓").green(),
                media.transport_type,
                style(&media.page_title).cyan()
            ),
            Progress::CaptureFinished { targets, captured } => {
                self.finish();
                format!(
                    "\n{} {} media captured from {} pages",
                    style("●").cyan(),
                    style(captured).bold(),
                    targets
                )
            }
            Progress::DownloadStarted {
                index,
                total,
                title,
                output,
            } => format!(
                "\n{} {}\n  {}",
                style(format!("[{}/{}]", index, total)).bold(),
                title,
                style(output.display()).dim()
            ),
            Progress::DownloadCompleted { title, bytes, .. } => format!(
                "  {} {} ({})",
                style("✓").green(),
                title,
                format_size(*bytes)
            ),
            Progress::DownloadFailed { title, error } => {
                format!("  {} {}: {}", style("✗").red(), title, error)
            }
            Progress::BatchFinished { .. } => return,
        };
        self.println(line);
    }
}

fn termination_icon(termination: &Termination) -> console::StyledObject<&'static str> {
    if termination.is_clean() {
        style("✓").green()
    } else {
        style("⚠").yellow()
    }
}

fn cell(text: &str, width: usize) -> String {
    let text = truncate_display(text, width);
    pad_str(&text, width, Alignment::Left, None).into_owned()
}

/// Print crawled records as a table.
pub fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("{} No records found", style("⚠").yellow());
        return;
    }

    println!(
        "\n{}  {}  {}  {}  {}",
        style(cell("#", 4)).dim(),
        style(cell("Name", 14)).magenta().bold(),
        style(cell("Code", 6)).magenta().bold(),
        style(cell("Title", 36)).magenta().bold(),
        style("Time").magenta().bold()
    );
    for (i, r) in records.iter().enumerate() {
        println!(
            "{}  {}  {}  {}  {}",
            style(cell(&(i + 1).to_string(), 4)).dim(),
            style(cell(r.entity_name_str(), 14)).cyan(),
            style(cell(r.entity_code_str(), 6)).yellow(),
            style(cell(r.title_str(), 36)).green(),
            style(&r.timestamp).blue()
        );
        if !r.detail_url_str().is_empty() {
            println!("      {}", style(r.detail_url_str()).dim());
        }
    }
}

/// Print captured media as a table.
pub fn print_captures(media: &[CapturedMedia]) {
    if media.is_empty() {
        println!("\n{} No media captured. Possible causes:", style("⚠").yellow());
        println!("  - the play button was not clicked (try --headed and click it yourself)");
        println!("  - the page needed more time (raise --wait)");
        println!("  - the URL is not a roadshow media page");
        println!("  - run with -v and RUST_LOG=roadcap=debug to list media requests");
        return;
    }

    println!(
        "\n{}  {}  {}  {}",
        style(cell("#", 4)).dim(),
        style(cell("Title", 36)).magenta().bold(),
        style(cell("Type", 6)).magenta().bold(),
        style("Page").magenta().bold()
    );
    for (i, m) in media.iter().enumerate() {
        println!(
            "{}  {}  {}  {}",
            style(cell(&(i + 1).to_string(), 4)).dim(),
            style(cell(&m.page_title, 36)).cyan(),
            style(cell(m.transport_type.label(), 6)).yellow(),
            style(&m.page_url).dim()
        );
    }
}

/// Print a download batch summary.
pub fn print_batch_summary(summary: &BatchSummary, output_dir: &std::path::Path, audio_only: bool) {
    println!("\n{}", "=".repeat(60));
    println!("{}", style("Download finished").green().bold());
    println!("  Succeeded: {}", style(summary.succeeded).green());
    println!("  Failed:    {}", style(summary.failed).red());
    println!("  Output:    {}", style(output_dir.display()).cyan());
    if audio_only {
        println!("  Format:    {}", style("MP3").yellow());
    }
    println!("{}", "=".repeat(60));
}

/// Print the dependency check.
pub fn print_dependencies(report: &DependencyReport) {
    println!("\n{}", style("External tools").bold());
    println!("{}", "-".repeat(50));
    for tool in &report.tools {
        if tool.is_present() {
            println!(
                "  {:<10} {} {}",
                tool.name,
                style("✓ found").green(),
                style(tool.version.as_deref().unwrap_or("")).dim()
            );
        } else if tool.required {
            println!("  {:<10} {}", tool.name, style("✗ not found").red());
            println!("             {}", style(tool.hint).yellow());
        } else {
            println!("  {:<10} {}", tool.name, style("⚠ not found (recommended)").yellow());
            println!("             {}", style(tool.hint).dim());
        }
    }
}
