//! Append-only capture list with URL deduplication.

use crate::models::CapturedMedia;

/// Media captured during one session, in capture order.
///
/// A media URL appears at most once; recording it again is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    entries: Vec<CapturedMedia>,
}

impl CaptureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, media_url: &str) -> bool {
        self.entries.iter().any(|m| m.media_url == media_url)
    }

    /// Append `media` unless its URL was already captured.
    ///
    /// Returns whether the entry was added.
    pub fn record(&mut self, media: CapturedMedia) -> bool {
        if self.contains(&media.media_url) {
            return false;
        }
        self.entries.push(media);
        true
    }

    pub fn entries(&self) -> &[CapturedMedia] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<CapturedMedia> {
        self.entries
    }
}
