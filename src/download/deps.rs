//! External tool presence checks.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Presence and version of one external tool.
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: String,
    /// Absence blocks downloading when set.
    pub required: bool,
    pub path: Option<PathBuf>,
    /// First line of the tool's version output.
    pub version: Option<String>,
    /// Install suggestion shown when the tool is missing.
    pub hint: &'static str,
}

impl ToolStatus {
    pub fn is_present(&self) -> bool {
        self.path.is_some()
    }
}

/// Result of [`check_dependencies`].
#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub tools: Vec<ToolStatus>,
}

impl DependencyReport {
    /// Whether every required tool is present.
    pub fn ready(&self) -> bool {
        self.tools.iter().all(|t| !t.required || t.is_present())
    }
}

/// Check for yt-dlp (required) and ffmpeg (recommended).
pub async fn check_dependencies(ytdlp: &str) -> DependencyReport {
    let tools = vec![
        probe(
            ytdlp,
            "--version",
            true,
            "pip install yt-dlp  (or: brew install yt-dlp)",
        )
        .await,
        probe(
            "ffmpeg",
            "-version",
            false,
            "brew install ffmpeg  (or your package manager)",
        )
        .await,
    ];
    DependencyReport { tools }
}

async fn probe(
    program: &str,
    version_flag: &str,
    required: bool,
    hint: &'static str,
) -> ToolStatus {
    let path = which::which(program).ok();
    let version = match &path {
        Some(p) => version_line(p, version_flag).await,
        None => None,
    };
    debug!("{}: path={:?} version={:?}", program, path, version);

    ToolStatus {
        name: program.to_string(),
        required,
        path,
        version,
        hint,
    }
}

async fn version_line(program: &Path, flag: &str) -> Option<String> {
    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}
