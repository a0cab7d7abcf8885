//! Media request classification.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::{ObservedRequest, ResourceKind};
use crate::models::TransportType;

/// Substring identifying an HLS manifest request.
pub const MANIFEST_MARKER: &str = ".m3u8";

/// Video container extensions treated as direct files.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".m4v", ".mov", ".avi", ".mkv", ".flv", ".webm"];

/// Site-specific gate on manifest requests.
///
/// Applies only to manifest URLs whose host contains `host_contains`. Such a
/// URL is accepted when its query carries every `require_query` marker and its
/// path carries none of the `reject_path_markers` (e.g. lower-quality variant
/// names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFilter {
    pub host_contains: String,
    #[serde(default)]
    pub require_query: Vec<String>,
    #[serde(default)]
    pub reject_path_markers: Vec<String>,
}

impl ManifestFilter {
    /// Whether this filter lets `url` through.
    pub fn accepts(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let applies = parsed
            .host_str()
            .is_some_and(|host| host.contains(&self.host_contains));
        if !applies {
            return true;
        }

        let query = parsed.query().unwrap_or("");
        let path = parsed.path();
        self.require_query.iter().all(|m| query.contains(m.as_str()))
            && !self
                .reject_path_markers
                .iter()
                .any(|m| path.contains(m.as_str()))
    }
}

/// Classify an outgoing request as a media candidate.
pub fn classify_request(
    request: &ObservedRequest,
    filters: &[ManifestFilter],
) -> Option<TransportType> {
    let url = request.url.as_str();

    if url.contains(MANIFEST_MARKER) {
        return filters
            .iter()
            .all(|f| f.accepts(url))
            .then_some(TransportType::Manifest);
    }

    if ends_with_video_extension(url) {
        return Some(TransportType::DirectFile);
    }

    // Media-tagged resources include images and audio; require a video
    // extension somewhere in the URL.
    let media_tagged = request.kind == ResourceKind::Media
        || request
            .header("sec-fetch-dest")
            .is_some_and(|dest| dest.eq_ignore_ascii_case("video"));
    if media_tagged && contains_video_extension(url) {
        return Some(TransportType::DirectFile);
    }

    None
}

/// Whether the full URL, query included, ends with a video extension.
///
/// Query-suffixed files only qualify through the media-tag rule.
pub fn ends_with_video_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn contains_video_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

/// Extension of a direct file URL without the dot, as written in the URL.
///
/// Query and fragment are ignored.
pub fn video_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lower = path.to_ascii_lowercase();
    VIDEO_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &path[path.len() - ext.len() + 1..])
}
