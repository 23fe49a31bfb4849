//! On-disk layout of audit output.
//!
//! ```text
//! <output-dir>/<slug(url)>/run-<index>-<timestamp>.json
//! <output-dir>/<slug(url)>/run-<index>-<timestamp>.html
//! <output-dir>/<slug(url)>/summary.json
//! ```

use crate::models::{SummaryFile, SummaryRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::debug;

/// Name of the per-URL summary file.
pub const SUMMARY_FILE: &str = "summary.json";

const RUN_PREFIX: &str = "run-";

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://").expect("valid regex"))
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("valid regex"))
}

/// Derive a filesystem-safe directory name from a URL.
///
/// Distinct URLs can collide (`/a?b` and `/a/b` both become `a_b`).
pub fn slugify(url: &str) -> String {
    let without_scheme = scheme_re().replace(url, "");
    let replaced = unsafe_chars_re().replace_all(&without_scheme, "_");
    replaced.trim_end_matches('_').to_lowercase()
}

/// Output directory for one URL.
pub fn url_dir(output_dir: &Path, url: &str) -> PathBuf {
    output_dir.join(slugify(url))
}

/// File stem shared by a run's JSON and HTML report.
pub fn artifact_stem(run_index: usize, captured_at: DateTime<Utc>) -> String {
    format!(
        "{}{}-{}",
        RUN_PREFIX,
        run_index,
        captured_at.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// The report pair written for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub json: PathBuf,
    pub html: PathBuf,
}

impl RunArtifacts {
    fn contains(&self, path: &Path) -> bool {
        self.json == path || self.html == path
    }
}

/// Write both reports for a run under `dir`.
pub async fn write_run_artifacts(
    dir: &Path,
    stem: &str,
    json_report: &str,
    html_report: &str,
) -> Result<RunArtifacts> {
    let artifacts = RunArtifacts {
        json: dir.join(format!("{}.json", stem)),
        html: dir.join(format!("{}.html", stem)),
    };

    fs::write(&artifacts.json, json_report)
        .await
        .with_context(|| format!("Failed to write {}", artifacts.json.display()))?;
    fs::write(&artifacts.html, html_report)
        .await
        .with_context(|| format!("Failed to write {}", artifacts.html.display()))?;

    Ok(artifacts)
}

/// Delete every run report in `dir` except `keep`. Returns the number removed.
pub async fn prune_run_artifacts(dir: &Path, keep: &RunArtifacts) -> Result<usize> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_run_artifact(&name) {
            continue;
        }

        let path = entry.path();
        if keep.contains(&path) {
            continue;
        }

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        debug!("Pruned {}", path.display());
        removed += 1;
    }

    Ok(removed)
}

fn is_run_artifact(name: &str) -> bool {
    name.starts_with(RUN_PREFIX) && (name.ends_with(".json") || name.ends_with(".html"))
}

/// Write (or overwrite) `summary.json` for a URL.
pub async fn write_summary(dir: &Path, url: &str, summary: &SummaryRecord) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    let body = serde_json::to_string_pretty(&SummaryFile { url, summary })
        .context("Failed to serialize summary")?;

    fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("https://www.watcho.com/"), "www_watcho_com");
        assert_eq!(slugify("https://www.watcho.com/live-tv"), "www_watcho_com_live-tv");
        assert_eq!(slugify("http://Example.com/Shows?x=1"), "example_com_shows_x_1");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        let once = slugify("https://example.com/Shows?x=1");
        assert_eq!(once, slugify("https://example.com/Shows?x=1"));
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn test_artifact_stem() {
        let at = Utc.with_ymd_and_hms(2025, 8, 26, 14, 30, 0).unwrap();
        assert_eq!(artifact_stem(2, at), "run-2-2025-08-26T14-30-00");
    }

    #[tokio::test]
    async fn test_prune_keeps_only_latest_pair() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::write(dir.join("run-1-2025-01-01T00-00-00.json"), "{}").unwrap();
        std::fs::write(dir.join("run-1-2025-01-01T00-00-00.html"), "<html>").unwrap();
        std::fs::write(dir.join(SUMMARY_FILE), "{}").unwrap();
        std::fs::write(dir.join("notes.txt"), "keep me").unwrap();

        let latest = write_run_artifacts(dir, "run-2-2025-01-01T00-01-00", "{}", "<html>")
            .await
            .unwrap();
        let removed = prune_run_artifacts(dir, &latest).await.unwrap();

        assert_eq!(removed, 2);
        assert!(latest.json.exists());
        assert!(latest.html.exists());
        assert!(dir.join(SUMMARY_FILE).exists());
        assert!(dir.join("notes.txt").exists());
        assert!(!dir.join("run-1-2025-01-01T00-00-00.json").exists());
    }

    #[tokio::test]
    async fn test_write_summary_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let summary = SummaryRecord {
            runs: 3,
            categories: Default::default(),
            web_vitals: Default::default(),
        };
        std::fs::write(temp_dir.path().join(SUMMARY_FILE), "stale").unwrap();

        let path = write_summary(temp_dir.path(), "https://example.com/", &summary)
            .await
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();

        assert!(content.contains("\"url\": \"https://example.com/\""));
        assert!(content.contains("\"runs\": 3"));
        assert!(!content.contains("stale"));
    }
}
