//! Ordered fallback chains locating the elements each role needs.
//!
//! Every [`Role`] maps to a list of [`Strategy`] values, native site markup
//! first and generic fallbacks last. Resolution walks the list and returns the
//! first strategy whose element is present and visible within that strategy's
//! wait. A miss is `None`, never an error; callers decide whether it is fatal.

use std::fmt;
use std::time::Duration;

use scraper::ElementRef;
use tracing::{debug, trace};

use crate::browser::{BrowserPage, ClassScope, Locator};

/// Semantic purpose of an element on the listing or media page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    SearchInput,
    SearchButton,
    NextPage,
    ListContainer,
    ListItem,
    ItemTitleLink,
    ItemImageLink,
    ItemDate,
    PlayTrigger,
}

/// One concrete way of locating a role's element.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub locator: Locator,
    /// Bound on the presence/visibility probe.
    pub wait: Duration,
    /// Whose class attribute carries the enabled state.
    pub class_scope: ClassScope,
    /// Class fragments marking the control as unusable.
    pub stop_markers: &'static [&'static str],
}

impl Strategy {
    const fn css(css: &'static str, wait: Duration) -> Self {
        Self {
            locator: Locator::Css(css),
            wait,
            class_scope: ClassScope::Own,
            stop_markers: &[],
        }
    }

    const fn pager(
        locator: Locator,
        class_scope: ClassScope,
        stop_markers: &'static [&'static str],
    ) -> Self {
        Self {
            locator,
            wait: PROBE_SHORT,
            class_scope,
            stop_markers,
        }
    }

    /// Whether a class attribute marks this control as disabled.
    pub fn is_stopped(&self, class: &str) -> bool {
        self.stop_markers.iter().any(|m| class.contains(m))
    }
}

const PROBE_SHORT: Duration = Duration::from_secs(1);
const PROBE_MEDIUM: Duration = Duration::from_secs(2);
const PROBE_LONG: Duration = Duration::from_secs(3);

const SEARCH_INPUT: &[Strategy] = &[
    Strategy::css(r#"input.txt[placeholder="请输入关键字"]"#, PROBE_LONG),
    Strategy::css(r#"input[placeholder="请输入关键字"]"#, PROBE_MEDIUM),
    Strategy::css("input.txt", PROBE_MEDIUM),
];

const SEARCH_BUTTON: &[Strategy] = &[Strategy::css("a.btn.ml20", PROBE_LONG)];

// The text-labelled control sits in an <li> whose class carries both
// "disabled" and "active" as stop markers on this site.
const NEXT_PAGE: &[Strategy] = &[
    Strategy::pager(
        Locator::Text {
            css: "a",
            text: "下一页",
        },
        ClassScope::Parent,
        &["disabled", "active"],
    ),
    Strategy::pager(
        Locator::Text { css: "a", text: ">" },
        ClassScope::Own,
        &["disabled"],
    ),
    Strategy::pager(
        Locator::Text {
            css: ".pagination a",
            text: ">",
        },
        ClassScope::Own,
        &["disabled"],
    ),
    Strategy::pager(Locator::Css(".page-next"), ClassScope::Own, &["disabled"]),
    Strategy::pager(Locator::Css("a.next"), ClassScope::Own, &["disabled"]),
];

const LIST_CONTAINER: &[Strategy] = &[
    Strategy::css("ul.roadList.cf", PROBE_SHORT),
    Strategy::css(".roadList.cf", PROBE_SHORT),
    Strategy::css("ul.roadList", PROBE_SHORT),
];

const LIST_ITEM: &[Strategy] = &[Strategy::css("li", PROBE_SHORT)];
const ITEM_TITLE_LINK: &[Strategy] = &[Strategy::css("a.t", PROBE_SHORT)];
const ITEM_IMAGE_LINK: &[Strategy] = &[Strategy::css("p.pic a", PROBE_SHORT)];
const ITEM_DATE: &[Strategy] = &[Strategy::css("p.date", PROBE_SHORT)];

const PLAY_TRIGGER: &[Strategy] = &[
    Strategy::css("i.play", PROBE_SHORT),
    Strategy::css(".videoBox i.play", PROBE_SHORT),
    Strategy::css(".videoBox .play", PROBE_SHORT),
    Strategy::css("video", PROBE_SHORT),
    Strategy::css(r#"button[class*="play"]"#, PROBE_SHORT),
    Strategy::css(r#"div[class*="play"]"#, PROBE_SHORT),
    Strategy::css(r#"button[aria-label*="播放"]"#, PROBE_SHORT),
    Strategy::css(r#"button[aria-label*="play"]"#, PROBE_SHORT),
    Strategy::css(".video-play-button", PROBE_SHORT),
    Strategy::css(".play-button", PROBE_SHORT),
    Strategy::css(r#"[class*="PlayButton"]"#, PROBE_SHORT),
];

impl Role {
    /// Strategies in preference order.
    pub fn strategies(self) -> &'static [Strategy] {
        match self {
            Role::SearchInput => SEARCH_INPUT,
            Role::SearchButton => SEARCH_BUTTON,
            Role::NextPage => NEXT_PAGE,
            Role::ListContainer => LIST_CONTAINER,
            Role::ListItem => LIST_ITEM,
            Role::ItemTitleLink => ITEM_TITLE_LINK,
            Role::ItemImageLink => ITEM_IMAGE_LINK,
            Role::ItemDate => ITEM_DATE,
            Role::PlayTrigger => PLAY_TRIGGER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::SearchInput => "search input",
            Role::SearchButton => "search button",
            Role::NextPage => "next page control",
            Role::ListContainer => "list container",
            Role::ListItem => "list item",
            Role::ItemTitleLink => "item title link",
            Role::ItemImageLink => "item image link",
            Role::ItemDate => "item date",
            Role::PlayTrigger => "play trigger",
        };
        f.write_str(name)
    }
}

/// Resolve `role` on the live page.
///
/// Probe failures are logged and treated as a miss for that strategy.
pub async fn resolve<P>(page: &mut P, role: Role) -> Option<&'static Strategy>
where
    P: BrowserPage + ?Sized,
{
    for strategy in role.strategies() {
        match page.is_visible(&strategy.locator, strategy.wait).await {
            Ok(true) => {
                debug!("Resolved {} via {}", role, strategy.locator);
                return Some(strategy);
            }
            Ok(false) => trace!("No visible {} for {}", strategy.locator, role),
            Err(e) => debug!("Probe {} for {} failed: {}", strategy.locator, role, e),
        }
    }
    debug!("Could not resolve {}", role);
    None
}

/// Resolve `role` inside a DOM snapshot element.
pub fn resolve_in<'a>(scope: ElementRef<'a>, role: Role) -> Option<ElementRef<'a>> {
    role.strategies()
        .iter()
        .find_map(|s| s.locator.select_first(scope))
}

/// All matches for `role` inside `scope`, using the first strategy that
/// matches anything.
pub fn resolve_all_in<'a>(scope: ElementRef<'a>, role: Role) -> Vec<ElementRef<'a>> {
    role.strategies()
        .iter()
        .map(|s| s.locator.select_all(scope))
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_native_markup_preferred() {
        let html = Html::parse_document(
            r#"<div>
                <input class="txt" name="other">
                <input class="txt" placeholder="请输入关键字" id="kw">
            </div>"#,
        );
        let el = resolve_in(html.root_element(), Role::SearchInput).unwrap();
        assert_eq!(el.value().attr("id"), Some("kw"));
    }

    #[test]
    fn test_fallback_when_native_missing() {
        let html = Html::parse_document(r#"<div><ul class="roadList"><li>a</li></ul></div>"#);
        let list = resolve_in(html.root_element(), Role::ListContainer).unwrap();
        assert_eq!(resolve_all_in(list, Role::ListItem).len(), 1);
        assert!(resolve_in(html.root_element(), Role::SearchButton).is_none());
    }

    #[test]
    fn test_next_page_stop_markers() {
        let labelled = &Role::NextPage.strategies()[0];
        assert_eq!(labelled.class_scope, ClassScope::Parent);
        assert!(labelled.is_stopped("page-item active"));
        assert!(labelled.is_stopped("disabled"));
        assert!(!labelled.is_stopped("page-item"));

        let arrow = &Role::NextPage.strategies()[1];
        assert!(arrow.is_stopped("next disabled"));
        assert!(!arrow.is_stopped("active"));
    }

    #[test]
    fn test_every_role_has_strategies() {
        for role in [
            Role::SearchInput,
            Role::SearchButton,
            Role::NextPage,
            Role::ListContainer,
            Role::ListItem,
            Role::ItemTitleLink,
            Role::ItemImageLink,
            Role::ItemDate,
            Role::PlayTrigger,
        ] {
            assert!(!role.strategies().is_empty(), "{} has no strategies", role);
        }
    }
}
