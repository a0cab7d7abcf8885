//! Shared helpers for command implementations.

use std::path::Path;

use anyhow::Context;
use console::style;

use roadcap::config::Settings;
use roadcap::download::check_dependencies;
use roadcap::export::{load_url_file, split_url_list};

/// Merge positional URLs and a URL file into one target list.
pub fn collect_targets(urls: &[String], file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut targets: Vec<String> = urls.iter().flat_map(|u| split_url_list(u)).collect();

    if let Some(path) = file {
        let from_file = load_url_file(path)
            .with_context(|| format!("Failed to read URL file {}", path.display()))?;
        println!(
            "{} Loaded {} URLs from {}",
            style("✓").green(),
            from_file.len(),
            path.display()
        );
        targets.extend(from_file);
    }

    if targets.is_empty() {
        anyhow::bail!("No URLs given. Pass URLs as arguments or use --file.");
    }
    Ok(targets)
}

/// Fail early when the downloader is missing.
pub async fn require_downloader(settings: &Settings) -> anyhow::Result<()> {
    let report = check_dependencies(&settings.ytdlp).await;
    if !report.ready() {
        crate::cli::display::print_dependencies(&report);
        anyhow::bail!("{} is required for downloading", settings.ytdlp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_targets_splits_inline_lists() {
        let urls = vec![
            "https://a.example/1,https://a.example/2".to_string(),
            "https://a.example/3".to_string(),
        ];
        let targets = collect_targets(&urls, None).unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[2], "https://a.example/3");
    }

    #[test]
    fn test_collect_targets_requires_input() {
        assert!(collect_targets(&[], None).is_err());
        assert!(collect_targets(&[" , ".to_string()], None).is_err());
    }

    #[test]
    fn test_collect_targets_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://a.example/9\n# skip\n").unwrap();
        let targets = collect_targets(&["https://a.example/1".to_string()], Some(&path)).unwrap();
        assert_eq!(targets, vec!["https://a.example/1", "https://a.example/9"]);
    }
}
