//! Element locators usable both on the live page and on DOM snapshots.

use std::fmt;

use scraper::{ElementRef, Selector};
use tracing::warn;

use crate::utils::element_text;

/// How to find an element: a CSS selector, optionally narrowed to elements
/// whose text contains a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    Text {
        css: &'static str,
        text: &'static str,
    },
}

impl Locator {
    pub fn css(&self) -> &'static str {
        match self {
            Locator::Css(css) | Locator::Text { css, .. } => css,
        }
    }

    pub fn text(&self) -> Option<&'static str> {
        match self {
            Locator::Css(_) => None,
            Locator::Text { text, .. } => Some(text),
        }
    }

    /// All matching descendants of `scope`, in document order.
    pub fn select_all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let selector = match Selector::parse(self.css()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid selector {}: {:?}", self, e);
                return Vec::new();
            }
        };

        scope
            .select(&selector)
            .filter(|el| match self.text() {
                Some(fragment) => element_text(*el).contains(fragment),
                None => true,
            })
            .collect()
    }

    /// First matching descendant of `scope`.
    pub fn select_first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.select_all(scope).into_iter().next()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => f.write_str(css),
            Locator::Text { css, text } => write!(f, "{}:has-text(\"{}\")", css, text),
        }
    }
}
