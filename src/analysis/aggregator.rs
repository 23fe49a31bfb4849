//! Averaging of per-run metrics.
//!
//! Each field is averaged over the runs that actually reported it.

use crate::models::{MetricRecord, SummaryCategories, SummaryRecord, SummaryVitals};

/// Average a list of run records for one URL.
pub fn average_metrics(runs: &[MetricRecord]) -> SummaryRecord {
    let category = |pick: fn(&MetricRecord) -> u32| {
        round_int(mean(runs.iter().map(|r| Some(pick(r) as f64))))
    };
    let timing = |pick: fn(&MetricRecord) -> Option<f64>| round_int(mean(runs.iter().map(pick)));

    SummaryRecord {
        runs: runs.len(),
        categories: SummaryCategories {
            performance: category(|r| r.categories.performance),
            accessibility: category(|r| r.categories.accessibility),
            best_practices: category(|r| r.categories.best_practices),
            seo: category(|r| r.categories.seo),
            pwa: category(|r| r.categories.pwa),
        },
        web_vitals: SummaryVitals {
            fcp_ms: timing(|r| r.web_vitals.fcp_ms),
            lcp_ms: timing(|r| r.web_vitals.lcp_ms),
            tbt_ms: timing(|r| r.web_vitals.tbt_ms),
            cls: round_to(mean(runs.iter().map(|r| r.web_vitals.cls)), 3),
            tti_ms: timing(|r| r.web_vitals.tti_ms),
            speed_index_ms: timing(|r| r.web_vitals.speed_index_ms),
        },
    }
}

/// Arithmetic mean of the present values; `None` when there are none.
pub fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn round_int(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.round() as i64)
}

fn round_to(value: Option<f64>, decimals: i32) -> Option<f64> {
    let factor = 10f64.powi(decimals);
    value.map(|v| (v * factor).round() / factor)
}
