//! Listing record extraction from DOM snapshots.
//!
//! Each field has its own rule and its own fallbacks. A field that cannot be
//! derived stays empty; an item is dropped only when neither a title nor a
//! detail URL was recovered.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::models::Record;
use crate::selectors::{resolve_all_in, resolve_in, Role};
use crate::utils::element_text;

/// Marker substring of script-triggered open actions.
const OPEN_CALL: &str = "window.open";
/// Link text containing this is a share widget, never a title.
const SHARE_MARKER: &str = "分享";
/// Fallback titles must be longer than this many characters.
const MIN_FALLBACK_TITLE_CHARS: usize = 5;
/// Link text shorter than this may be taken as the entity name.
const MAX_ENTITY_NAME_CHARS: usize = 50;

static WINDOW_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"window\.open\(\s*['"]([^'"]+)['"]"#).unwrap());

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}[~-]\d{2}:\d{2})").unwrap()
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^(（]+)[(（]([0-9]{6})[)）]$").unwrap());

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Parses the destination URL out of an open-action attribute.
pub type OpenUrlParser = fn(&str) -> Option<String>;

/// Destination of a `window.open('...')` call inside an attribute value.
pub fn parse_window_open(attr: &str) -> Option<String> {
    WINDOW_OPEN
        .captures(attr)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Result of one page's extraction pass.
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// Raw item elements examined, kept or not.
    pub examined: usize,
    pub records: Vec<Record>,
}

/// Turns listing items into [`Record`]s.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    open_url: OpenUrlParser,
    base: Option<Url>,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self {
            open_url: parse_window_open,
            base: None,
        }
    }
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative detail URLs against `base`.
    pub fn with_base(mut self, base: Option<Url>) -> Self {
        self.base = base;
        self
    }

    /// Substitute the open-action URL parser.
    pub fn with_open_url_parser(mut self, parser: OpenUrlParser) -> Self {
        self.open_url = parser;
        self
    }

    /// Extract every record from a serialized listing page.
    pub fn extract_page(&self, html: &str) -> PageExtraction {
        let document = Html::parse_document(html);
        match resolve_in(document.root_element(), Role::ListContainer) {
            Some(list) => self.extract_list(list),
            None => {
                warn!("Listing container not found on page");
                PageExtraction::default()
            }
        }
    }

    /// Extract records from the items of a list container.
    pub fn extract_list(&self, list: ElementRef<'_>) -> PageExtraction {
        let items = resolve_all_in(list, Role::ListItem);
        let examined = items.len();
        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| self.extract_record(item))
            .collect();

        debug!("Examined {} items, kept {}", examined, records.len());
        PageExtraction { examined, records }
    }

    /// Derive one record from a listing item.
    pub fn extract_record(&self, item: ElementRef<'_>) -> Option<Record> {
        let links: Vec<ElementRef<'_>> = item.select(&ANCHOR).collect();

        let (mut title, mut detail_url) = match resolve_in(item, Role::ItemTitleLink) {
            Some(link) => (non_empty(element_text(link)), self.open_target(link)),
            None => (
                None,
                resolve_in(item, Role::ItemImageLink).and_then(|link| self.open_target(link)),
            ),
        };

        if detail_url.is_none() {
            detail_url = links
                .iter()
                .filter(|link| onclick(**link).contains(OPEN_CALL))
                .find_map(|link| self.open_target(*link));
        }

        if title.is_none() {
            title = links.iter().map(|link| element_text(*link)).find(|text| {
                !text.is_empty()
                    && !text.contains(SHARE_MARKER)
                    && text.chars().count() > MIN_FALLBACK_TITLE_CHARS
            });
        }

        let timestamp = match resolve_in(item, Role::ItemDate) {
            Some(date) => element_text(date),
            None => TIME_RANGE
                .captures(&element_text(item))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        };

        let (entity_name, entity_code) = links
            .first()
            .map(|link| parse_entity(&element_text(*link)))
            .unwrap_or((None, None));

        let record = Record {
            title,
            detail_url: detail_url.map(|url| self.absolutize(url)),
            timestamp,
            entity_name,
            entity_code,
        };

        if record.is_identifiable() {
            Some(record)
        } else {
            debug!("Dropping item without title or URL");
            None
        }
    }

    fn open_target(&self, link: ElementRef<'_>) -> Option<String> {
        (self.open_url)(onclick(link))
    }

    fn absolutize(&self, url: String) -> String {
        if Url::parse(&url).is_ok() {
            return url;
        }
        match self.base.as_ref().map(|base| base.join(&url)) {
            Some(Ok(joined)) => joined.to_string(),
            Some(Err(e)) => {
                debug!("Could not resolve {} against base: {}", url, e);
                url
            }
            None => url,
        }
    }
}

fn onclick(link: ElementRef<'_>) -> &str {
    link.value().attr("onclick").unwrap_or("")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Split `name(123456)` link text into entity name and code.
fn parse_entity(text: &str) -> (Option<String>, Option<String>) {
    if let Some(caps) = ENTITY.captures(text) {
        let name = caps.get(1).map(|m| m.as_str().trim().to_string());
        let code = caps.get(2).map(|m| m.as_str().to_string());
        return (name.and_then(non_empty), code);
    }
    if !text.is_empty() && text.chars().count() < MAX_ENTITY_NAME_CHARS {
        (Some(text.to_string()), None)
    } else {
        (None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(html: &str) -> Option<Record> {
        let doc = Html::parse_document(&format!("<ul class=\"roadList cf\">{}</ul>", html));
        let sel = Selector::parse("li").unwrap();
        let li = doc.select(&sel).next().unwrap();
        RecordExtractor::new().extract_record(li)
    }

    #[test]
    fn test_parse_window_open() {
        assert_eq!(
            parse_window_open("window.open('https://rs.p5w.net/html/141.shtml')"),
            Some("https://rs.p5w.net/html/141.shtml".to_string())
        );
        assert_eq!(
            parse_window_open(r#"javascript:window.open("/html/1.shtml", "_blank")"#),
            Some("/html/1.shtml".to_string())
        );
        assert_eq!(parse_window_open("location.href='x'"), None);
        assert_eq!(parse_window_open(""), None);
    }

    #[test]
    fn test_full_item() {
        let record = item(
            r#"<li>
                <a href="javascript:;">毅昌科技(002420)</a>
                <p class="pic"><a onclick="window.open('https://rs.p5w.net/html/1.shtml')"><img></a></p>
                <a class="t" onclick="window.open('https://rs.p5w.net/html/2.shtml')">2023年度业绩说明会</a>
                <p class="date">2024-05-10 15:00~17:00</p>
            </li>"#,
        )
        .unwrap();

        assert_eq!(record.title_str(), "2023年度业绩说明会");
        assert_eq!(record.detail_url_str(), "https://rs.p5w.net/html/2.shtml");
        assert_eq!(record.timestamp, "2024-05-10 15:00~17:00");
        assert_eq!(record.entity_name_str(), "毅昌科技");
        assert_eq!(record.entity_code_str(), "002420");
    }

    #[test]
    fn test_image_link_and_text_fallbacks() {
        let record = item(
            r#"<li>
                <a>分享到微信朋友圈</a>
                <p class="pic"><a onclick="window.open('https://rs.p5w.net/html/3.shtml')"><img></a></p>
                <a>某某股份有限公司业绩说明会</a>
                <span>时间：2024-04-28 09:30-11:30</span>
            </li>"#,
        )
        .unwrap();

        assert_eq!(record.detail_url_str(), "https://rs.p5w.net/html/3.shtml");
        assert_eq!(record.title_str(), "某某股份有限公司业绩说明会");
        assert_eq!(record.timestamp, "2024-04-28 09:30-11:30");
        // First link is the share widget: short enough to be taken as a name.
        assert_eq!(record.entity_name_str(), "分享到微信朋友圈");
        assert_eq!(record.entity_code_str(), "");
    }

    #[test]
    fn test_any_open_link_fallback() {
        let record = item(
            r#"<li><span><a onclick="track(); window.open('https://rs.p5w.net/html/4.shtml')">看</a></span></li>"#,
        )
        .unwrap();
        assert_eq!(record.detail_url_str(), "https://rs.p5w.net/html/4.shtml");
        assert!(record.title.is_none());
        assert_eq!(record.timestamp, "");
    }

    #[test]
    fn test_item_without_title_or_url_dropped() {
        assert!(item("<li><a>短</a><p class=\"date\">2024-01-01</p></li>").is_none());
        assert!(item("<li></li>").is_none());
    }

    #[test]
    fn test_entity_code_is_six_ascii_digits() {
        assert_eq!(
            parse_entity("平安银行（000001）"),
            (Some("平安银行".to_string()), Some("000001".to_string()))
        );
        assert_eq!(
            parse_entity("Foo(12345)"),
            (Some("Foo(12345)".to_string()), None)
        );
        // Full-width digits are not ASCII digits.
        assert_eq!(parse_entity("Foo(１２３４５６)").1, None);
        assert_eq!(parse_entity(&"长".repeat(60)), (None, None));
    }

    #[test]
    fn test_extract_page_counts_examined_items() {
        let html = r#"<html><body><ul class="roadList cf">
            <li><a class="t" onclick="window.open('/html/5.shtml')">第一场业绩说明会</a></li>
            <li><span>广告</span></li>
            <li><a class="t" onclick="window.open('/html/6.shtml')">第二场业绩说明会</a></li>
        </ul></body></html>"#;

        let base = Url::parse("https://rs.p5w.net/roadshow").ok();
        let page = RecordExtractor::new().with_base(base).extract_page(html);
        assert_eq!(page.examined, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(
            page.records[0].detail_url_str(),
            "https://rs.p5w.net/html/5.shtml"
        );
    }

    #[test]
    fn test_missing_container_yields_nothing() {
        let page = RecordExtractor::new().extract_page("<div>nothing here</div>");
        assert_eq!(page.examined, 0);
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_custom_open_url_parser() {
        fn data_href(_: &str) -> Option<String> {
            Some("https://example.com/fixed".to_string())
        }
        let doc = Html::parse_document(r#"<ul class="roadList"><li><a class="t">标题足够长的说明会</a></li></ul>"#);
        let page = RecordExtractor::new()
            .with_open_url_parser(data_href)
            .extract_list(resolve_in(doc.root_element(), Role::ListContainer).unwrap());
        assert_eq!(page.records[0].detail_url_str(), "https://example.com/fixed");
    }
}
