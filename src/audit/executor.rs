//! A single audit run: audit, persist, prune, extract.

use crate::analysis::extract_metrics;
use crate::audit::engine::AuditEngine;
use crate::models::{AuditSettings, DeviceProfile, MetricRecord};
use crate::report::artifacts::{artifact_stem, prune_run_artifacts, url_dir, write_run_artifacts};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runs one audit cycle for a URL and keeps only its newest report pair.
pub struct RunExecutor<E: AuditEngine> {
    engine: E,
    output_dir: PathBuf,
    settings: AuditSettings,
}

impl<E: AuditEngine> RunExecutor<E> {
    pub fn new(engine: E, output_dir: PathBuf, device: DeviceProfile) -> Self {
        Self {
            engine,
            output_dir,
            settings: AuditSettings::for_device(device),
        }
    }

    /// Root directory the per-URL folders live in.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    /// Device profile every run uses.
    pub fn device(&self) -> DeviceProfile {
        self.settings.form_factor
    }

    /// Audit `url` once and return its metrics.
    pub async fn execute(&self, url: &str, run_index: usize) -> Result<MetricRecord> {
        let dir = url_dir(&self.output_dir, url);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let outcome = self
            .engine
            .audit(url, &self.settings)
            .await
            .with_context(|| format!("Audit failed for {} (run {})", url, run_index))?;

        let stem = artifact_stem(run_index, Utc::now());
        let artifacts =
            write_run_artifacts(&dir, &stem, &outcome.json_report, &outcome.html_report).await?;
        let pruned = prune_run_artifacts(&dir, &artifacts).await?;
        debug!("Saved {} (pruned {} old files)", artifacts.json.display(), pruned);

        let record = extract_metrics(&outcome.lhr);
        debug!("Run {} resolved to {}", run_index, record.url);
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::engine::AuditOutcome;
    use crate::error::{AuditError, AuditResult};
    use crate::models::LighthouseResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Engine that replays canned results in order.
    pub(crate) struct ScriptedEngine {
        results: Mutex<VecDeque<serde_json::Value>>,
        pub(crate) seen: Mutex<Vec<(String, AuditSettings)>>,
    }

    impl ScriptedEngine {
        pub(crate) fn new(results: Vec<serde_json::Value>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuditEngine for ScriptedEngine {
        async fn audit(&self, url: &str, settings: &AuditSettings) -> AuditResult<AuditOutcome> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), settings.clone()));

            let value = self
                .results
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AuditError::Lighthouse {
                    url: url.to_string(),
                    stderr: "Unable to reliably load the page".to_string(),
                })?;
            let lhr: LighthouseResult = serde_json::from_value(value.clone())?;

            Ok(AuditOutcome {
                lhr,
                json_report: value.to_string(),
                html_report: "<html></html>".to_string(),
            })
        }
    }

    pub(crate) fn lhr(url: &str, performance: f64, lcp: Option<f64>) -> serde_json::Value {
        let mut audits = json!({
            "cumulative-layout-shift": { "numericValue": 0.01 }
        });
        if let Some(lcp) = lcp {
            audits["largest-contentful-paint"] = json!({ "numericValue": lcp });
        }
        json!({
            "finalUrl": url,
            "categories": { "performance": { "score": performance } },
            "audits": audits
        })
    }

    #[tokio::test]
    async fn test_execute_persists_and_extracts() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ScriptedEngine::new(vec![lhr("https://example.com/", 0.873, Some(2100.0))]);
        let executor = RunExecutor::new(engine, temp_dir.path().to_path_buf(), DeviceProfile::Desktop);

        let record = executor.execute("https://example.com/", 1).await.unwrap();

        assert_eq!(record.categories.performance, 87);
        assert_eq!(record.web_vitals.lcp_ms, Some(2100.0));

        let dir = temp_dir.path().join("example_com");
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.starts_with("run-1-")));

        let seen = executor.engine.seen.lock().unwrap();
        assert_eq!(seen[0].1, AuditSettings::for_device(DeviceProfile::Desktop));
    }

    #[tokio::test]
    async fn test_execute_propagates_engine_failure() {
        let temp_dir = TempDir::new().unwrap();
        let executor = RunExecutor::new(
            ScriptedEngine::new(vec![]),
            temp_dir.path().to_path_buf(),
            DeviceProfile::Mobile,
        );

        let err = executor.execute("https://down.test/", 1).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Unable to reliably load the page"));
    }
}
