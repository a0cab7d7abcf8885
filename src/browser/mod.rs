//! Browser page abstraction and the chromiumoxide-backed implementation.
//!
//! The crawl and capture engines only talk to [`BrowserPage`]. The CDP
//! implementation lives behind the `browser` feature; tests drive the engines
//! with in-memory pages.

mod config;
mod locator;
#[cfg(feature = "browser")]
mod page;
#[cfg(feature = "browser")]
mod scripts;
#[cfg(feature = "browser")]
mod session;

pub use config::BrowserSettings;
pub use locator::Locator;
#[cfg(feature = "browser")]
pub use page::CdpPage;
#[cfg(feature = "browser")]
pub use session::{find_browser, BrowserSession};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

/// Errors raised by the page collaborator.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Which element's class attribute to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassScope {
    /// The matched element itself.
    Own,
    /// The matched element's parent.
    Parent,
}

/// Resource type reported by the browser for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Media,
    Xhr,
    Fetch,
    Script,
    Image,
    Other,
}

/// One outgoing network request as seen by the page.
#[derive(Debug, Clone)]
pub struct ObservedRequest {
    pub url: String,
    pub kind: ResourceKind,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
}

impl ObservedRequest {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Non-empty header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// A launched, navigable browsing context.
///
/// Every operation is a suspension point with its own bound; a timeout is
/// reported as [`PageError::Timeout`] and is recoverable for the caller.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate and wait for the load to finish.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// Wait until network activity settles.
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), PageError>;

    /// Whether the first element matched by `locator` is present and visible
    /// within `wait`.
    async fn is_visible(&mut self, locator: &Locator, wait: Duration) -> Result<bool, PageError>;

    /// Clear the matched input, then fill it with `text`.
    async fn fill(&mut self, locator: &Locator, text: &str) -> Result<(), PageError>;

    async fn click(&mut self, locator: &Locator) -> Result<(), PageError>;

    /// Send the keyboard confirm (Enter) action to the matched element.
    async fn press_enter(&mut self, locator: &Locator) -> Result<(), PageError>;

    /// Class attribute of the matched element or its parent.
    async fn class_of(
        &mut self,
        locator: &Locator,
        scope: ClassScope,
    ) -> Result<Option<String>, PageError>;

    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String, PageError>;

    async fn current_url(&mut self) -> Result<String, PageError>;

    /// Document title; may be empty while the page is still rendering.
    async fn title(&mut self) -> Result<String, PageError>;

    /// Next outgoing request observed on this page, or `None` once `deadline`
    /// passes without one.
    async fn next_request(&mut self, deadline: Instant) -> Option<ObservedRequest>;

    /// Drop buffered requests that were observed but not yet consumed.
    async fn discard_requests(&mut self) {}

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
