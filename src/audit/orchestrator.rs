//! Runs every URL N times, strictly one run at a time, and writes the
//! averaged summary next to the run reports.

use crate::analysis::average_metrics;
use crate::audit::engine::AuditEngine;
use crate::audit::executor::RunExecutor;
use crate::models::{MetricRecord, SummaryRecord};
use crate::report::{url_dir, write_summary};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Summary produced for one URL.
#[derive(Debug, Clone)]
pub struct UrlSummary {
    pub url: String,
    pub summary: SummaryRecord,
}

/// Drives the executor over a list of URLs.
pub struct AuditOrchestrator<E: AuditEngine> {
    executor: RunExecutor<E>,
    runs: usize,
    show_progress: bool,
}

impl<E: AuditEngine> AuditOrchestrator<E> {
    pub fn new(executor: RunExecutor<E>, runs: usize, show_progress: bool) -> Self {
        Self {
            executor,
            runs,
            show_progress,
        }
    }

    /// Audit each URL in order. The first failure aborts the whole list.
    pub async fn audit_urls(&self, urls: &[String]) -> Result<Vec<UrlSummary>> {
        let mut summaries = Vec::with_capacity(urls.len());

        for url in urls {
            info!("Auditing {} ({} runs, {})", url, self.runs, self.executor.device());
            let records = self.run_url(url).await?;

            let summary = average_metrics(&records);
            let path = write_summary(&url_dir(self.executor.output_dir(), url), url, &summary).await?;
            info!("Summary written to {}", path.display());

            info!(
                "Averages -> Perf: {}, LCP: {}, CLS: {}",
                self::display(summary.categories.performance),
                millis(summary.web_vitals.lcp_ms),
                self::display(summary.web_vitals.cls)
            );

            summaries.push(UrlSummary {
                url: url.clone(),
                summary,
            });
        }

        Ok(summaries)
    }

    async fn run_url(&self, url: &str) -> Result<Vec<MetricRecord>> {
        let progress = self.progress_bar();
        let mut records = Vec::with_capacity(self.runs);

        for i in 1..=self.runs {
            progress.set_message(format!("run {}", i));
            let record = match self.executor.execute(url, i).await {
                Ok(record) => record,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };

            // Hidden bars drop `println`, so the line goes through tracing
            progress.suspend(|| {
                info!(
                    "Run {}/{} -> Perf: {}, LCP: {}, CLS: {}",
                    i,
                    self.runs,
                    record.categories.performance,
                    millis(record.web_vitals.lcp_ms),
                    self::display(record.web_vitals.cls)
                )
            });
            progress.inc(1);
            records.push(record);
        }

        progress.finish_and_clear();
        Ok(records)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(self.runs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

fn display<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

fn millis<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "null".to_string(), |v| format!("{}ms", v))
}
