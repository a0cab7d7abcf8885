//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

#[cfg(feature = "browser")]
mod capture;
mod check;
#[cfg(feature = "browser")]
mod crawl;
mod download;
mod helpers;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use roadcap::config::load_settings;

#[derive(Parser)]
#[command(name = "roadcap")]
#[command(about = "Roadshow listing crawler and media capture tool")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Persistent browser profile directory
    #[arg(long, global = true, env = "ROADCAP_USER_DATA_DIR")]
    user_data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search the roadshow listing and collect records across pages
    Crawl {
        /// Search keyword (defaults to the configured keyword)
        #[arg(short, long)]
        keyword: Option<String>,
        /// Maximum number of pages to crawl (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_pages: usize,
        /// Write records as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write records as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Open media pages and capture their stream URLs
    Capture {
        /// Page URLs (comma or newline separated lists are accepted)
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Seconds to observe after triggering playback
        #[arg(short, long)]
        wait: Option<u64>,
        /// Keep video instead of extracting MP3 audio
        #[arg(long)]
        video: bool,
        /// Write captured media as JSON
        #[arg(short, long)]
        save: Option<PathBuf>,
        /// Download every capture after the session
        #[arg(short, long)]
        download: bool,
        /// Download directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Download media from a saved capture file
    Download {
        /// Capture file written by `capture --save`
        #[arg(short, long)]
        from: PathBuf,
        /// Keep video instead of extracting MP3 audio
        #[arg(long)]
        video: bool,
        /// Download directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Check for the external tools downloads need
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, _config) = load_settings(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    if cli.headed {
        settings.browser.headless = false;
    }
    if let Some(dir) = cli.user_data_dir {
        settings.browser.user_data_dir = dir;
    }

    match cli.command {
        #[cfg(feature = "browser")]
        Commands::Crawl {
            keyword,
            max_pages,
            json,
            csv,
        } => {
            crawl::cmd_crawl(
                &settings,
                keyword.as_deref(),
                max_pages,
                json.as_deref(),
                csv.as_deref(),
            )
            .await
        }
        #[cfg(feature = "browser")]
        Commands::Capture {
            urls,
            file,
            wait,
            video,
            save,
            download,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if let Some(secs) = wait {
                settings.capture_wait = std::time::Duration::from_secs(secs);
            }
            let targets = helpers::collect_targets(&urls, file.as_deref())?;
            capture::cmd_capture(&settings, &targets, !video, save.as_deref(), download).await
        }
        #[cfg(not(feature = "browser"))]
        Commands::Crawl { .. } | Commands::Capture { .. } => {
            anyhow::bail!("This build has no browser support. Rebuild with --features browser.")
        }
        Commands::Download {
            from,
            video,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            download::cmd_download(&settings, &from, !video).await
        }
        Commands::Check => check::cmd_check(&settings).await,
    }
}
