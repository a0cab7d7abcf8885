//! [`BrowserPage`] over a chromiumoxide CDP page.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, ResourceType,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::scripts;
use super::{
    BrowserPage, BrowserSettings, ClassScope, Locator, ObservedRequest, PageError, ResourceKind,
};

/// Visibility probe polling interval.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);
/// Network idle polling interval.
const IDLE_POLL: Duration = Duration::from_millis(250);
/// How long the resource count must stay flat to count as idle.
const IDLE_QUIET: Duration = Duration::from_millis(500);

/// A live page plus its request event stream.
pub struct CdpPage {
    page: Page,
    requests: EventStream<EventRequestWillBeSent>,
    navigation_timeout: Duration,
}

impl CdpPage {
    /// Enable network events on `page` and start observing requests.
    pub async fn attach(page: Page, settings: &BrowserSettings) -> Result<Self> {
        page.execute(EnableParams::default())
            .await
            .context("Failed to enable network events")?;
        let requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("Failed to subscribe to request events")?;

        Ok(Self {
            page,
            requests,
            navigation_timeout: settings.navigation_timeout(),
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, PageError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| PageError::Script(e.to_string()))
    }

    /// Mark the located element and return a CDP handle to it.
    async fn marked_element(
        &self,
        locator: &Locator,
    ) -> Result<chromiumoxide::Element, PageError> {
        let found: bool = self.eval(scripts::mark(locator)).await?;
        if !found {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        self.page
            .find_element(scripts::marked_selector())
            .await
            .map_err(|e| PageError::ElementNotFound(format!("{}: {}", locator, e)))
    }
}

#[async_trait]
impl BrowserPage for CdpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        let timeout = timeout.min(self.navigation_timeout);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageError::Navigation(format!("{}: {}", url, e))),
            Err(_) => Err(PageError::Timeout(format!(
                "navigation to {} after {:?}",
                url, timeout
            ))),
        }
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), PageError> {
        let deadline = Instant::now() + timeout;
        let mut last_count: u64 = self.eval(scripts::RESOURCE_COUNT.to_string()).await?;
        let mut quiet_since = Instant::now();

        loop {
            if Instant::now() >= deadline {
                return Err(PageError::Timeout(format!(
                    "network still active after {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(IDLE_POLL).await;

            let count: u64 = self.eval(scripts::RESOURCE_COUNT.to_string()).await?;
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= IDLE_QUIET {
                trace!("Network idle at {} resources", count);
                return Ok(());
            }
        }
    }

    async fn is_visible(&mut self, locator: &Locator, wait: Duration) -> Result<bool, PageError> {
        let deadline = Instant::now() + wait;
        loop {
            let visible: bool = self.eval(scripts::visible(locator)).await?;
            if visible {
                return Ok(true);
            }
            if Instant::now() + PROBE_INTERVAL > deadline {
                return Ok(false);
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> Result<(), PageError> {
        let filled: bool = self.eval(scripts::fill(locator, text)).await?;
        if filled {
            Ok(())
        } else {
            Err(PageError::ElementNotFound(locator.to_string()))
        }
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), PageError> {
        let element = self.marked_element(locator).await?;
        element
            .click()
            .await
            .map_err(|e| PageError::Browser(format!("click {}: {}", locator, e)))?;
        Ok(())
    }

    async fn press_enter(&mut self, locator: &Locator) -> Result<(), PageError> {
        let element = self.marked_element(locator).await?;
        element
            .press_key("Enter")
            .await
            .map_err(|e| PageError::Browser(format!("Enter on {}: {}", locator, e)))?;
        Ok(())
    }

    async fn class_of(
        &mut self,
        locator: &Locator,
        scope: ClassScope,
    ) -> Result<Option<String>, PageError> {
        let (found, class): (bool, String) = self.eval(scripts::class_of(locator, scope)).await?;
        Ok(found.then_some(class))
    }

    async fn content(&mut self) -> Result<String, PageError> {
        self.page
            .content()
            .await
            .map_err(|e| PageError::Browser(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, PageError> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PageError::Browser(e.to_string()))
    }

    async fn title(&mut self) -> Result<String, PageError> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PageError::Browser(e.to_string()))
    }

    async fn next_request(&mut self, deadline: Instant) -> Option<ObservedRequest> {
        match tokio::time::timeout_at(deadline, self.requests.next()).await {
            Ok(Some(event)) => Some(observed(&event)),
            Ok(None) => {
                debug!("Request event stream closed");
                None
            }
            Err(_) => None,
        }
    }

    async fn discard_requests(&mut self) {
        let mut dropped = 0usize;
        while let Some(Some(_)) = self.requests.next().now_or_never() {
            dropped += 1;
        }
        if dropped > 0 {
            trace!("Discarded {} buffered requests", dropped);
        }
    }
}

fn observed(event: &EventRequestWillBeSent) -> ObservedRequest {
    let kind = match event.r#type {
        Some(ResourceType::Document) => ResourceKind::Document,
        Some(ResourceType::Media) => ResourceKind::Media,
        Some(ResourceType::Xhr) => ResourceKind::Xhr,
        Some(ResourceType::Fetch) => ResourceKind::Fetch,
        Some(ResourceType::Script) => ResourceKind::Script,
        Some(ResourceType::Image) => ResourceKind::Image,
        _ => ResourceKind::Other,
    };

    let headers: HashMap<String, String> = event
        .request
        .headers
        .inner()
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| {
                    value
                        .as_str()
                        .map(|v| (name.to_ascii_lowercase(), v.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    ObservedRequest {
        url: event.request.url.clone(),
        kind,
        headers,
    }
}
