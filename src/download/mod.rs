//! Download of captured media through yt-dlp.
//!
//! - `command`: filename sanitization and argument synthesis
//! - `runner`: job execution, output verification, batch summary
//! - `deps`: external tool presence checks

mod command;
mod deps;
mod runner;

pub use command::{build_command, sanitize_filename, DownloadJob, AUDIO_FORMAT};
pub use deps::{check_dependencies, DependencyReport, ToolStatus};
pub use runner::{
    run_batch, run_job, BatchSummary, DownloadError, DownloadOptions, ToolRunner, YtDlpRunner,
};
