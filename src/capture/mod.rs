//! Media capture from network requests.
//!
//! - `classify`: decides whether a request is a manifest or a direct video file
//! - `log`: deduplicated, append-only capture list
//! - `session`: visits target pages, triggers playback and records media

mod classify;
mod log;
mod session;

pub use classify::{
    classify_request, ends_with_video_extension, video_extension, ManifestFilter,
    MANIFEST_MARKER, VIDEO_EXTENSIONS,
};
pub use log::CaptureLog;
pub use session::{CaptureOptions, MediaCapturer, UNTITLED};
