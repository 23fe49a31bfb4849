//! Opening saved HTML reports in the system viewer.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Find every `.html` report under `dir`, sorted by path.
pub fn find_html_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Reports directory not found: {}", dir.display());
    }

    let mut reports: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("html"))
        .collect();

    reports.sort();
    Ok(reports)
}

/// Open all HTML reports under `dir`. Returns how many were launched.
pub fn open_reports(dir: &Path) -> Result<usize> {
    let reports = find_html_reports(dir)?;
    let mut opened = 0;

    for report in &reports {
        match viewer_command(report).spawn() {
            Ok(_) => {
                debug!("Opened {}", report.display());
                opened += 1;
            }
            Err(e) => warn!("Failed to open {}: {}", report.display(), e),
        }
    }

    Ok(opened)
}

/// Platform command that opens a file with its default application.
fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}
