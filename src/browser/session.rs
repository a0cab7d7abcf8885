//! Browser process lifecycle.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::page::CdpPage;
use super::BrowserSettings;

/// Environment variable naming an explicit browser executable.
const CHROME_ENV: &str = "ROADCAP_CHROME";

/// Common browser executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/microsoft-edge",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Windows
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
];

const CHROME_COMMANDS: &[&str] = &[
    "msedge",
    "microsoft-edge",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// A launched browser with a persistent profile.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: BrowserSettings,
}

impl BrowserSession {
    /// Launch a browser for the given settings.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let executable = find_browser(settings.executable.as_ref())?;
        info!(
            "Launching {} (headless={}, profile={})",
            executable.display(),
            settings.headless,
            settings.user_data_dir.display()
        );

        std::fs::create_dir_all(&settings.user_data_dir).with_context(|| {
            format!(
                "Failed to create profile directory {}",
                settings.user_data_dir.display()
            )
        })?;

        let (width, height) = settings.viewport;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(&settings.user_data_dir)
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            })
            .request_timeout(Duration::from_secs(settings.request_timeout))
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--autoplay-policy=no-user-gesture-required");

        // with_head means NOT headless
        if !settings.headless {
            builder = builder.with_head();
        }

        for arg in &settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            settings: settings.clone(),
        })
    }

    /// Open a fresh page with request observation enabled.
    pub async fn open_page(&self) -> Result<CdpPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;
        CdpPage::attach(page, &self.settings).await
    }

    /// Close the browser and stop its event handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// Find a browser executable: explicit path, environment, known paths, PATH.
pub fn find_browser(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.clone());
        }
        anyhow::bail!("Configured browser not found: {}", path.display());
    }

    if let Some(path) = std::env::var_os(CHROME_ENV).map(PathBuf::from) {
        if path.exists() {
            return Ok(path);
        }
        debug!("{} points to a missing file: {}", CHROME_ENV, path.display());
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("Found browser at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Found browser in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(anyhow::anyhow!(
        "No Chromium-based browser found. Install Microsoft Edge, Google Chrome or Chromium,\n\
         or point {} at the executable.",
        CHROME_ENV
    ))
}
