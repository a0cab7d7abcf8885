//! In-memory pages driving the crawl and capture engines.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tokio::sync::mpsc;
use tokio::time::Instant;

use roadcap::browser::{BrowserPage, ClassScope, Locator, ObservedRequest, PageError};
use roadcap::report::Progress;

pub const LISTING_URL: &str = "https://rs.p5w.net/roadshow";

/// One listing item as rendered by the site.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: usize,
    pub company: String,
    pub code: String,
    pub title: String,
    pub time: String,
}

impl Item {
    pub fn new(id: usize, title: &str) -> Self {
        Self {
            id,
            company: format!("公司{}", id),
            code: format!("{:06}", 600000 + id),
            title: format!("公司{} {}", id, title),
            time: "2024-05-10 15:00~17:00".to_string(),
        }
    }

    fn render(&self) -> String {
        format!(
            r#"<li>
  <a class="name">{company}({code})</a>
  <p class="pic"><a onclick="window.open('/html/{id}.shtml')"><img src="/img/{id}.png"></a></p>
  <a class="t" onclick="window.open('/html/{id}.shtml')">{title}</a>
  <p class="date">{time}</p>
  <a class="share">分享</a>
</li>"#,
            id = self.id,
            company = self.company,
            code = self.code,
            title = self.title,
            time = self.time,
        )
    }

    pub fn detail_url(&self) -> String {
        format!("https://rs.p5w.net/html/{}.shtml", self.id)
    }
}

/// Build `pages` pages of `per_page` items each.
pub fn listing(pages: usize, per_page: usize, title: &str) -> Vec<Vec<Item>> {
    (0..pages)
        .map(|p| {
            (1..=per_page)
                .map(|i| Item::new(p * per_page + i, title))
                .collect()
        })
        .collect()
}

/// A roadshow listing site: a search form, then paginated results.
pub struct MockListingSite {
    pages: Vec<Vec<Item>>,
    current: usize,
    searched: bool,
    pub with_search_button: bool,
    pub with_search_input: bool,
    /// Clicking the next control leaves the page unchanged.
    pub stuck_pager: bool,
    pub fail_navigation: bool,
    pub keyword: Option<String>,
    pub submitted_with_enter: bool,
    pub next_clicks: usize,
}

impl MockListingSite {
    pub fn new(pages: Vec<Vec<Item>>) -> Self {
        Self {
            pages,
            current: 0,
            searched: false,
            with_search_button: true,
            with_search_input: true,
            stuck_pager: false,
            fail_navigation: false,
            keyword: None,
            submitted_with_enter: false,
            next_clicks: 0,
        }
    }

    fn html(&self) -> String {
        let mut body = String::from(r#"<div class="search">"#);
        if self.with_search_input {
            body.push_str(r#"<input class="txt" placeholder="请输入关键字">"#);
        }
        if self.with_search_button {
            body.push_str(r#"<a class="btn ml20">搜索</a>"#);
        }
        body.push_str("</div>");

        if self.searched {
            let items = self.pages.get(self.current).cloned().unwrap_or_default();
            body.push_str(r#"<ul class="roadList cf">"#);
            for item in &items {
                body.push_str(&item.render());
            }
            body.push_str("</ul>");

            let last = self.current + 1 >= self.pages.len();
            let class = if last { "disabled" } else { "" };
            body.push_str(&format!(
                r#"<ul class="pagination"><li><a>上一页</a></li><li class="{}"><a>下一页</a></li></ul>"#,
                class
            ));
        }

        format!("<html><head><title>路演</title></head><body>{}</body></html>", body)
    }

    fn has(&self, locator: &Locator) -> bool {
        let doc = Html::parse_document(&self.html());
        locator.select_first(doc.root_element()).is_some()
    }

    fn class(&self, locator: &Locator, scope: ClassScope) -> Option<String> {
        let doc = Html::parse_document(&self.html());
        let el = locator.select_first(doc.root_element())?;
        let target = match scope {
            ClassScope::Own => el,
            ClassScope::Parent => el.parent().and_then(ElementRef::wrap)?,
        };
        Some(target.value().attr("class").unwrap_or("").to_string())
    }
}

#[async_trait]
impl BrowserPage for MockListingSite {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        if self.fail_navigation {
            return Err(PageError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        self.current = 0;
        self.searched = false;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator, _wait: Duration) -> Result<bool, PageError> {
        Ok(self.has(locator))
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> Result<(), PageError> {
        if !self.has(locator) {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        self.keyword = Some(text.to_string());
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), PageError> {
        if !self.has(locator) {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        if locator.css().contains("btn") {
            self.searched = true;
            self.current = 0;
        } else if locator.text() == Some("下一页") {
            self.next_clicks += 1;
            if !self.stuck_pager && self.current + 1 < self.pages.len() {
                self.current += 1;
            }
        }
        Ok(())
    }

    async fn press_enter(&mut self, locator: &Locator) -> Result<(), PageError> {
        if !self.has(locator) {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        self.submitted_with_enter = true;
        self.searched = true;
        self.current = 0;
        Ok(())
    }

    async fn class_of(
        &mut self,
        locator: &Locator,
        scope: ClassScope,
    ) -> Result<Option<String>, PageError> {
        Ok(self.class(locator, scope))
    }

    async fn content(&mut self) -> Result<String, PageError> {
        Ok(self.html())
    }

    async fn current_url(&mut self) -> Result<String, PageError> {
        Ok(LISTING_URL.to_string())
    }

    async fn title(&mut self) -> Result<String, PageError> {
        Ok("路演".to_string())
    }

    async fn next_request(&mut self, _deadline: Instant) -> Option<ObservedRequest> {
        None
    }

    async fn pause(&mut self, _duration: Duration) {}
}

/// A media page and the requests it issues before and after playback.
#[derive(Debug, Clone, Default)]
pub struct MediaTarget {
    pub title: String,
    pub has_play_button: bool,
    pub on_load: Vec<ObservedRequest>,
    pub on_play: Vec<ObservedRequest>,
    /// Issued after the capture window closes; still buffered at the next `goto`.
    pub after_window: Vec<ObservedRequest>,
}

/// Serves scripted media pages by URL.
#[derive(Default)]
pub struct MockMediaSite {
    targets: HashMap<String, MediaTarget>,
    unreachable: HashSet<String>,
    current: Option<String>,
    queue: VecDeque<ObservedRequest>,
    late: Vec<ObservedRequest>,
    pub play_clicks: usize,
    pub discards: usize,
}

impl MockMediaSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, url: &str, target: MediaTarget) -> Self {
        self.targets.insert(url.to_string(), target);
        self
    }

    /// Navigation to `url` times out.
    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    fn target(&self) -> Option<&MediaTarget> {
        self.current.as_ref().and_then(|u| self.targets.get(u))
    }
}

#[async_trait]
impl BrowserPage for MockMediaSite {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        if self.unreachable.contains(url) {
            return Err(PageError::Timeout(format!(
                "navigation to {} exceeded {}s",
                url,
                timeout.as_secs()
            )));
        }
        self.current = Some(url.to_string());
        let on_load = self.target().map(|t| t.on_load.clone()).unwrap_or_default();
        self.queue.extend(on_load);
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator, _wait: Duration) -> Result<bool, PageError> {
        let has_button = self.target().is_some_and(|t| t.has_play_button);
        Ok(has_button && locator.css() == "i.play")
    }

    async fn fill(&mut self, locator: &Locator, _text: &str) -> Result<(), PageError> {
        Err(PageError::ElementNotFound(locator.to_string()))
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), PageError> {
        if locator.css() != "i.play" {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        self.play_clicks += 1;
        let (on_play, after_window) = self
            .target()
            .map(|t| (t.on_play.clone(), t.after_window.clone()))
            .unwrap_or_default();
        self.queue.extend(on_play);
        self.late = after_window;
        Ok(())
    }

    async fn press_enter(&mut self, locator: &Locator) -> Result<(), PageError> {
        Err(PageError::ElementNotFound(locator.to_string()))
    }

    async fn class_of(
        &mut self,
        _locator: &Locator,
        _scope: ClassScope,
    ) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn content(&mut self) -> Result<String, PageError> {
        Ok(String::new())
    }

    async fn current_url(&mut self) -> Result<String, PageError> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn title(&mut self) -> Result<String, PageError> {
        Ok(self.target().map(|t| t.title.clone()).unwrap_or_default())
    }

    async fn next_request(&mut self, _deadline: Instant) -> Option<ObservedRequest> {
        let next = self.queue.pop_front();
        if next.is_none() {
            // The window closed; late requests land in the buffer.
            let late = std::mem::take(&mut self.late);
            self.queue.extend(late);
        }
        next
    }

    async fn discard_requests(&mut self) {
        self.discards += 1;
        self.queue.clear();
    }

    async fn pause(&mut self, _duration: Duration) {}
}

/// Drain every event sent so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Progress>) -> Vec<Progress> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
