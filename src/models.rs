//! Data models for the audit runner.
//!
//! This module contains the core data structures used throughout the
//! application: the raw Lighthouse result we read, the per-run metric
//! record, the averaged summary, and the device emulation profile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Lighthouse categories requested on every run.
pub const AUDIT_CATEGORIES: [&str; 5] = ["performance", "accessibility", "best-practices", "seo", "pwa"];

/// Throttling method used on every run.
///
/// Simulated throttling keeps run-to-run variance low compared to live
/// (`devtools`) throttling.
pub const THROTTLING_METHOD: &str = "simulate";

/// Device emulation profile, chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// Phone-sized viewport with mobile emulation
    Mobile,
    /// Laptop-sized viewport, no mobile emulation
    Desktop,
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Mobile => write!(f, "mobile"),
            DeviceProfile::Desktop => write!(f, "desktop"),
        }
    }
}

impl FromStr for DeviceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mobile" => Ok(DeviceProfile::Mobile),
            "desktop" => Ok(DeviceProfile::Desktop),
            other => Err(format!("unknown device type: {}", other)),
        }
    }
}

impl DeviceProfile {
    /// Screen emulation parameters for this profile.
    pub fn screen_emulation(&self) -> ScreenEmulation {
        match self {
            DeviceProfile::Desktop => ScreenEmulation {
                mobile: false,
                width: 1350,
                height: 940,
                device_scale_factor: 1.0,
                disabled: false,
            },
            DeviceProfile::Mobile => ScreenEmulation {
                mobile: true,
                width: 412,
                height: 915,
                device_scale_factor: 2.625,
                disabled: false,
            },
        }
    }
}

/// Viewport emulation passed to the audit engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenEmulation {
    pub mobile: bool,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub disabled: bool,
}

/// Configuration handed to the audit engine for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSettings {
    /// Categories to score.
    pub categories: Vec<&'static str>,
    /// Throttling method (`simulate`, `devtools`, ...).
    pub throttling_method: &'static str,
    /// Form factor the page is audited as.
    pub form_factor: DeviceProfile,
    /// Viewport emulation.
    pub screen: ScreenEmulation,
}

impl AuditSettings {
    /// Build the fixed settings used for every run on the given device.
    pub fn for_device(device: DeviceProfile) -> Self {
        Self {
            categories: AUDIT_CATEGORIES.to_vec(),
            throttling_method: THROTTLING_METHOD,
            form_factor: device,
            screen: device.screen_emulation(),
        }
    }
}

/// The `lhr` object from a Lighthouse JSON report.
///
/// Only the parts we read are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseResult {
    #[serde(default)]
    pub requested_url: Option<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    /// Newer Lighthouse versions report this instead of `finalUrl`.
    #[serde(default)]
    pub final_displayed_url: Option<String>,
    #[serde(default)]
    pub categories: HashMap<String, CategoryResult>,
    #[serde(default)]
    pub audits: HashMap<String, AuditEntry>,
}

impl LighthouseResult {
    /// URL the audit ended on after redirects.
    pub fn resolved_url(&self) -> &str {
        self.final_url
            .as_deref()
            .or(self.final_displayed_url.as_deref())
            .or(self.requested_url.as_deref())
            .unwrap_or("")
    }
}

/// A scored category within a Lighthouse result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryResult {
    /// Fractional score in `0.0..=1.0`; null when the category errored.
    #[serde(default)]
    pub score: Option<f64>,
}

/// A single audit entry within a Lighthouse result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default)]
    pub numeric_value: Option<f64>,
}

/// Category scores for one run, 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub performance: u32,
    pub accessibility: u32,
    #[serde(rename = "bestPractices")]
    pub best_practices: u32,
    pub seo: u32,
    pub pwa: u32,
}

/// Timing metrics for one run. Any value may be missing from the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WebVitals {
    pub fcp_ms: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub tbt_ms: Option<f64>,
    /// Cumulative layout shift (unitless).
    pub cls: Option<f64>,
    pub tti_ms: Option<f64>,
    #[serde(rename = "speedIndex_ms")]
    pub speed_index_ms: Option<f64>,
}

/// Outcome of a single completed audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Final URL reported by the audit.
    pub url: String,
    pub categories: CategoryScores,
    #[serde(rename = "webVitals")]
    pub web_vitals: WebVitals,
}

/// Averaged category scores, rounded to integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCategories {
    pub performance: Option<i64>,
    pub accessibility: Option<i64>,
    #[serde(rename = "bestPractices")]
    pub best_practices: Option<i64>,
    pub seo: Option<i64>,
    pub pwa: Option<i64>,
}

/// Averaged timing metrics. Millisecond values are integers, CLS keeps
/// three decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryVitals {
    pub fcp_ms: Option<i64>,
    pub lcp_ms: Option<i64>,
    pub tbt_ms: Option<i64>,
    pub cls: Option<f64>,
    pub tti_ms: Option<i64>,
    #[serde(rename = "speedIndex_ms")]
    pub speed_index_ms: Option<i64>,
}

/// Averaged outcome over all runs of one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Number of runs that went into the averages.
    pub runs: usize,
    pub categories: SummaryCategories,
    #[serde(rename = "webVitals")]
    pub web_vitals: SummaryVitals,
}

/// On-disk shape of `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryFile<'a> {
    /// URL as configured (not the post-redirect URL).
    pub url: &'a str,
    #[serde(flatten)]
    pub summary: &'a SummaryRecord,
}
