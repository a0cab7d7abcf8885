//! Captured media transport URLs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the media is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// Streaming index (HLS `.m3u8`) that needs segment assembly.
    Manifest,
    /// Single media file fetchable as-is.
    DirectFile,
}

impl TransportType {
    pub fn label(&self) -> &'static str {
        match self {
            TransportType::Manifest => "m3u8",
            TransportType::DirectFile => "direct",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A deduplicated media URL plus the request context needed to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMedia {
    /// Unique within a capture session.
    pub media_url: String,
    pub transport_type: TransportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub page_url: String,
    pub page_title: String,
}
