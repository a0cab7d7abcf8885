//! Sequential batch execution of download jobs.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::command::{build_command, DownloadJob};
use crate::models::CapturedMedia;
use crate::report::{Progress, Reporter};

/// Why a single download job failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("Failed to start downloader: {0}")]
    Spawn(#[from] io::Error),

    #[error("Downloader exited with status {}", exit_code(.0))]
    ExitStatus(Option<i32>),

    #[error("Expected output not found: {}", .0.display())]
    MissingOutput(PathBuf),
}

fn exit_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Executes one download job.
///
/// `Ok` means the tool reported success; the batch still verifies the output
/// file independently.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, job: &DownloadJob) -> Result<(), DownloadError>;
}

/// Runs yt-dlp with the terminal attached so its own progress is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct YtDlpRunner;

#[async_trait]
impl ToolRunner for YtDlpRunner {
    async fn run(&self, job: &DownloadJob) -> Result<(), DownloadError> {
        debug!("Running: {}", job.display_command());

        let status = Command::new(&job.program)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => DownloadError::ToolNotFound(job.program.clone()),
                _ => DownloadError::Spawn(e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::ExitStatus(status.code()))
        }
    }
}

/// Batch-wide download settings.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub audio_only: bool,
    /// Downloader executable.
    pub program: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            audio_only: true,
            program: "yt-dlp".to_string(),
        }
    }
}

/// Result of a download batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Files produced by successful jobs.
    pub outputs: Vec<PathBuf>,
}

/// Run one job and verify its output exists.
pub async fn run_job<R>(runner: &R, job: &DownloadJob) -> Result<u64, DownloadError>
where
    R: ToolRunner + ?Sized,
{
    runner.run(job).await?;
    output_size(&job.expected_output)
        .await
        .ok_or_else(|| DownloadError::MissingOutput(job.expected_output.clone()))
}

async fn output_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Download every captured entry in capture order, one job at a time.
///
/// Failures are counted, never propagated.
pub async fn run_batch<R>(
    runner: &R,
    media: &[CapturedMedia],
    options: &DownloadOptions,
    reporter: &dyn Reporter,
) -> BatchSummary
where
    R: ToolRunner + ?Sized,
{
    let mut summary = BatchSummary::default();

    if let Err(e) = tokio::fs::create_dir_all(&options.output_dir).await {
        warn!(
            "Failed to create output directory {}: {}",
            options.output_dir.display(),
            e
        );
    }

    let total = media.len();
    for (i, entry) in media.iter().enumerate() {
        let job = build_command(entry, options.audio_only, &options.output_dir, &options.program);
        reporter.report(&Progress::DownloadStarted {
            index: i + 1,
            total,
            title: job.title.clone(),
            output: job.expected_output.clone(),
        });

        match run_job(runner, &job).await {
            Ok(bytes) => {
                info!("Downloaded {}", job.expected_output.display());
                reporter.report(&Progress::DownloadCompleted {
                    title: job.title.clone(),
                    output: job.expected_output.clone(),
                    bytes,
                });
                summary.succeeded += 1;
                summary.outputs.push(job.expected_output);
            }
            Err(e) => {
                warn!("Download failed for {}: {}", job.title, e);
                reporter.report(&Progress::DownloadFailed {
                    title: job.title.clone(),
                    error: e.to_string(),
                });
                summary.failed += 1;
            }
        }
    }

    reporter.report(&Progress::BatchFinished {
        succeeded: summary.succeeded,
        failed: summary.failed,
    });
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRunner;

    #[async_trait]
    impl ToolRunner for FailingRunner {
        async fn run(&self, _job: &DownloadJob) -> Result<(), DownloadError> {
            Err(DownloadError::ExitStatus(Some(1)))
        }
    }

    fn job(dir: &Path) -> DownloadJob {
        DownloadJob {
            program: "yt-dlp".to_string(),
            args: vec![],
            expected_output: dir.join("a.mp3"),
            title: "a".to_string(),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_job(&FailingRunner, &job(dir.path())).await.unwrap_err();
        assert!(matches!(err, DownloadError::ExitStatus(Some(1))));
    }

    #[tokio::test]
    async fn test_missing_program_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = job(dir.path());
        j.program = "roadcap-no-such-downloader".to_string();
        let err = YtDlpRunner.run(&j).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DownloadError::ExitStatus(None).to_string(),
            "Downloader exited with status unknown"
        );
        assert_eq!(
            DownloadError::ExitStatus(Some(2)).to_string(),
            "Downloader exited with status 2"
        );
    }
}
