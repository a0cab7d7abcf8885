//! Browser launch configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to launch the browser and how long page operations may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Persistent profile directory, so logins survive between runs.
    #[serde(default = "default_user_data_dir")]
    pub user_data_dir: PathBuf,

    /// Explicit Chrome/Chromium/Edge executable.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    #[serde(default = "default_viewport")]
    pub viewport: (u32, u32),

    /// Page navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: u64,

    /// CDP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_user_data_dir() -> PathBuf {
    PathBuf::from("./browser_session")
}

fn default_viewport() -> (u32, u32) {
    (1280, 720)
}

fn default_navigation_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            user_data_dir: default_user_data_dir(),
            executable: None,
            viewport: default_viewport(),
            navigation_timeout: default_navigation_timeout(),
            request_timeout: default_request_timeout(),
            chrome_args: Vec::new(),
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout)
    }
}
