//! Metric extraction from a Lighthouse result.
//!
//! Missing categories score 0, missing timing audits stay null.

use crate::models::{CategoryScores, LighthouseResult, MetricRecord, WebVitals};

/// Pull the per-run metrics out of one Lighthouse result.
pub fn extract_metrics(lhr: &LighthouseResult) -> MetricRecord {
    MetricRecord {
        url: lhr.resolved_url().to_string(),
        categories: CategoryScores {
            performance: category_score(lhr, "performance"),
            accessibility: category_score(lhr, "accessibility"),
            best_practices: category_score(lhr, "best-practices"),
            seo: category_score(lhr, "seo"),
            pwa: category_score(lhr, "pwa"),
        },
        web_vitals: WebVitals {
            fcp_ms: numeric_value(lhr, "first-contentful-paint"),
            lcp_ms: numeric_value(lhr, "largest-contentful-paint"),
            tbt_ms: numeric_value(lhr, "total-blocking-time"),
            cls: numeric_value(lhr, "cumulative-layout-shift"),
            tti_ms: numeric_value(lhr, "interactive"),
            speed_index_ms: numeric_value(lhr, "speed-index"),
        },
    }
}

/// Category score scaled to 0-100. Absent or null scores count as 0.
fn category_score(lhr: &LighthouseResult, name: &str) -> u32 {
    let score = lhr
        .categories
        .get(name)
        .and_then(|c| c.score)
        .unwrap_or(0.0);

    (score * 100.0).round().clamp(0.0, 100.0) as u32
}

fn numeric_value(lhr: &LighthouseResult, audit: &str) -> Option<f64> {
    lhr.audits.get(audit).and_then(|a| a.numeric_value)
}
