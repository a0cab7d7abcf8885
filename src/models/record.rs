//! Listing records extracted from the roadshow search results.

use serde::{Deserialize, Serialize};

/// One extracted listing item.
///
/// A record is only kept when it carries a title or a detail URL; every other
/// field is best-effort and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
    /// Raw time text as shown on the listing, possibly empty.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Six ASCII digits, or empty.
    #[serde(default)]
    pub entity_code: Option<String>,
}

impl Record {
    /// Whether the record carries enough to identify the listing item.
    pub fn is_identifiable(&self) -> bool {
        has_text(&self.title) || has_text(&self.detail_url)
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn detail_url_str(&self) -> &str {
        self.detail_url.as_deref().unwrap_or("")
    }

    pub fn entity_name_str(&self) -> &str {
        self.entity_name.as_deref().unwrap_or("")
    }

    pub fn entity_code_str(&self) -> &str {
        self.entity_code.as_deref().unwrap_or("")
    }
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}
