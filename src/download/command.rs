//! yt-dlp invocation synthesis.
//!
//! `build_command` is a pure function of the captured media, the audio-only
//! flag and the output location.

use std::path::{Path, PathBuf};

use crate::capture::video_extension;
use crate::models::{CapturedMedia, TransportType};

/// Fallback filename for titles that sanitize to nothing.
const UNTITLED_FILE: &str = "untitled";
const MAX_FILENAME_CHARS: usize = 100;
/// Byte budget for the stem, leaving room under the common 255-byte limit for
/// the extension and yt-dlp's `.part`/`.ytdl` suffixes.
const MAX_FILENAME_BYTES: usize = 200;

/// Lossy audio format produced by audio-only jobs.
pub const AUDIO_FORMAT: &str = "mp3";
/// Fixed bitrate for audio extracted from manifests.
const MANIFEST_AUDIO_QUALITY: &str = "128K";
/// Best-effort VBR quality for audio extracted from direct files.
const DIRECT_AUDIO_QUALITY: &str = "0";
const CONCURRENT_FRAGMENTS: &str = "5";

/// One external tool invocation and the file it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub program: String,
    pub args: Vec<String>,
    /// Where the output must exist for the job to count as successful.
    pub expected_output: PathBuf,
    /// Title the filename was derived from.
    pub title: String,
}

impl DownloadJob {
    /// Shell-like rendering for logs.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

/// Sanitize a title for use as a filename.
///
/// Replaces characters illegal on common filesystems, limits the length and
/// never returns an empty name. Applying it twice changes nothing.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_FILENAME_CHARS)
        .collect::<String>();
    let cleaned = truncate_bytes(&cleaned, MAX_FILENAME_BYTES).trim().to_string();

    if cleaned.is_empty() {
        UNTITLED_FILE.to_string()
    } else {
        cleaned
    }
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Build the yt-dlp job for one captured media entry.
pub fn build_command(
    media: &CapturedMedia,
    audio_only: bool,
    output_dir: &Path,
    program: &str,
) -> DownloadJob {
    let safe_title = sanitize_filename(&media.page_title);
    let template = output_dir
        .join(format!("{}.%(ext)s", safe_title))
        .to_string_lossy()
        .to_string();

    let mut args: Vec<String> = Vec::new();
    let extension = match (media.transport_type, audio_only) {
        (TransportType::Manifest, false) => {
            args.extend(strs(&["--concurrent-fragments", CONCURRENT_FRAGMENTS, "--progress"]));
            args.extend(["-o".to_string(), template]);
            push_referer(&mut args, media);
            "mp4"
        }
        (TransportType::Manifest, true) => {
            args.extend(strs(&[
                "-f",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                AUDIO_FORMAT,
                "--audio-quality",
                MANIFEST_AUDIO_QUALITY,
                "--downloader",
                "ffmpeg",
                "--downloader-args",
                "ffmpeg:-stats",
            ]));
            args.extend(["-o".to_string(), template]);
            push_referer(&mut args, media);
            AUDIO_FORMAT
        }
        (TransportType::DirectFile, false) => {
            args.extend(strs(&["--concurrent-fragments", CONCURRENT_FRAGMENTS, "--progress"]));
            args.extend(["-o".to_string(), template]);
            push_request_headers(&mut args, media);
            video_extension(&media.media_url).unwrap_or("mp4")
        }
        (TransportType::DirectFile, true) => {
            args.extend(strs(&[
                "-x",
                "--audio-format",
                AUDIO_FORMAT,
                "--audio-quality",
                DIRECT_AUDIO_QUALITY,
            ]));
            args.extend(["-o".to_string(), template]);
            push_request_headers(&mut args, media);
            AUDIO_FORMAT
        }
    };
    args.push(media.media_url.clone());

    DownloadJob {
        program: program.to_string(),
        args,
        expected_output: output_dir.join(format!("{}.{}", safe_title, extension)),
        title: media.page_title.clone(),
    }
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn push_referer(args: &mut Vec<String>, media: &CapturedMedia) {
    if let Some(referer) = non_empty(&media.referer) {
        args.extend(["--referer".to_string(), referer.to_string()]);
    }
}

fn push_request_headers(args: &mut Vec<String>, media: &CapturedMedia) {
    push_referer(args, media);
    if let Some(agent) = non_empty(&media.user_agent) {
        args.extend(["--user-agent".to_string(), agent.to_string()]);
    }
    if let Some(origin) = non_empty(&media.origin) {
        args.extend(["--add-header".to_string(), format!("Origin: {}", origin)]);
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
