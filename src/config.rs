//! Configuration management for roadcap using the prefer crate.
//!
//! Precedence, lowest first: built-in defaults, config file, environment,
//! command-line flags (applied by the CLI).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::browser::BrowserSettings;
use crate::capture::{CaptureOptions, ManifestFilter};
use crate::crawl::CrawlOptions;
use crate::download::DownloadOptions;

/// Environment variable overriding the downloader executable.
pub const YTDLP_ENV: &str = "ROADCAP_YTDLP";

/// Default roadshow listing page.
pub const DEFAULT_LISTING_URL: &str = "https://rs.p5w.net/roadshow";
/// Default search keyword ("annual results briefing").
pub const DEFAULT_KEYWORD: &str = "年度业绩说明会";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listing page the crawl starts from.
    pub listing_url: String,
    /// Default search keyword.
    pub keyword: String,
    /// Directory downloads are written to.
    pub output_dir: PathBuf,
    pub browser: BrowserSettings,
    /// Bound on each network-idle wait.
    pub idle_timeout: Duration,
    /// Extra wait after network idle for rendering.
    pub settle_delay: Duration,
    /// Pause after switching listing pages.
    pub page_interval: Duration,
    /// Observation window before looking for a play trigger.
    pub initial_wait: Duration,
    /// Observation window after the play trigger.
    pub capture_wait: Duration,
    /// Downloader executable.
    pub ytdlp: String,
    pub manifest_filters: Vec<ManifestFilter>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            keyword: DEFAULT_KEYWORD.to_string(),
            output_dir: PathBuf::from("./downloads"),
            browser: BrowserSettings::default(),
            idle_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            page_interval: Duration::from_secs(1),
            initial_wait: Duration::from_secs(3),
            capture_wait: Duration::from_secs(15),
            ytdlp: "yt-dlp".to_string(),
            manifest_filters: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(ytdlp) = std::env::var(YTDLP_ENV) {
            if !ytdlp.trim().is_empty() {
                self.ytdlp = ytdlp;
            }
        }
        self
    }

    pub fn crawl_options(&self, keyword: Option<&str>, page_cap: Option<usize>) -> CrawlOptions {
        CrawlOptions {
            listing_url: self.listing_url.clone(),
            keyword: keyword.unwrap_or(&self.keyword).to_string(),
            page_cap,
            navigation_timeout: self.browser.navigation_timeout(),
            idle_timeout: self.idle_timeout,
            settle_delay: self.settle_delay,
            page_interval: self.page_interval,
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            navigation_timeout: self.browser.navigation_timeout(),
            initial_wait: self.initial_wait,
            capture_wait: self.capture_wait,
            manifest_filters: self.manifest_filters.clone(),
        }
    }

    pub fn download_options(&self, audio_only: bool) -> DownloadOptions {
        DownloadOptions {
            output_dir: self.output_dir.clone(),
            audio_only,
            program: self.ytdlp.clone(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    /// Default search keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Download directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Browser profile directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Browser executable path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    /// Additional browser arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    /// Navigation timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timeout: Option<u64>,
    /// Network idle timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u64>,
    /// Settle delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    /// Page switch pause in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_interval_ms: Option<u64>,
    /// Initial capture wait in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_wait: Option<u64>,
    /// Capture wait in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_wait: Option<u64>,
    /// Downloader executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytdlp: Option<String>,
    /// Manifest quality gates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifest_filters: Vec<ManifestFilter>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    ///
    /// Missing or unreadable discovered files fall back to defaults.
    pub async fn load() -> Self {
        match prefer::load("roadcap").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(e) => {
                debug!("No config file found: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths in this config resolve against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are joined onto `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref url) = self.listing_url {
            settings.listing_url = url.clone();
        }
        if let Some(ref keyword) = self.keyword {
            settings.keyword = keyword.clone();
        }
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.user_data_dir {
            settings.browser.user_data_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(headless) = self.headless {
            settings.browser.headless = headless;
        }
        if let Some(ref exe) = self.browser {
            settings.browser.executable = Some(self.resolve_path(exe, base_dir));
        }
        if !self.chrome_args.is_empty() {
            settings.browser.chrome_args = self.chrome_args.clone();
        }
        if let Some(secs) = self.navigation_timeout {
            settings.browser.navigation_timeout = secs;
        }
        if let Some(secs) = self.idle_timeout {
            settings.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.settle_delay_ms {
            settings.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.page_interval_ms {
            settings.page_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.initial_wait {
            settings.initial_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = self.capture_wait {
            settings.capture_wait = Duration::from_secs(secs);
        }
        if let Some(ref ytdlp) = self.ytdlp {
            settings.ytdlp = ytdlp.clone();
        }
        if !self.manifest_filters.is_empty() {
            settings.manifest_filters = self.manifest_filters.clone();
        }
    }
}

/// Load settings from an explicit config file or discovery, then apply
/// environment overrides.
pub async fn load_settings(explicit: Option<&Path>) -> Result<(Settings, Config), ConfigError> {
    let config = match explicit {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    if let Some(path) = &config.source_path {
        debug!("Loaded config from {}", path.display());
    }

    Ok((settings.with_env_overrides(), config))
}
