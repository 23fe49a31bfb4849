//! Audit engine contract and the Lighthouse implementation.
//!
//! The Lighthouse CLI attaches to a Chrome instance we launch ourselves
//! (via `--port`), so the browser is always bound to the shared profile
//! directory and is always shut down when the audit ends.

use crate::browser::{BrowserInstance, LaunchOptions};
use crate::error::{AuditError, AuditResult};
use crate::models::{AuditSettings, LighthouseResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Everything one audit produces.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Parsed result used for metric extraction.
    pub lhr: LighthouseResult,
    /// Machine-readable report, verbatim.
    pub json_report: String,
    /// Human-viewable report, verbatim.
    pub html_report: String,
}

/// Something that can audit a URL.
#[async_trait]
pub trait AuditEngine: Send + Sync {
    /// Audit `url` once with the given settings.
    async fn audit(&self, url: &str, settings: &AuditSettings) -> AuditResult<AuditOutcome>;
}

/// Runs the `lighthouse` CLI against a freshly launched Chrome.
pub struct LighthouseEngine {
    binary: String,
    max_wait_for_load_ms: u64,
    launch: LaunchOptions,
}

impl LighthouseEngine {
    pub fn new(binary: String, max_wait_for_load_ms: u64, launch: LaunchOptions) -> Self {
        Self {
            binary,
            max_wait_for_load_ms,
            launch,
        }
    }

    async fn run_lighthouse(
        &self,
        url: &str,
        port: u16,
        settings: &AuditSettings,
    ) -> AuditResult<AuditOutcome> {
        let scratch = TempDir::new()?;
        let output_base = scratch.path().join("report");
        let args = lighthouse_args(url, port, &output_base, settings, self.max_wait_for_load_ms);

        debug!("{} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(AuditError::Lighthouse {
                url: url.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json_report = read_report(&output_base, "json").await?;
        let html_report = read_report(&output_base, "html").await?;
        let lhr: LighthouseResult = serde_json::from_str(&json_report)?;

        info!("Lighthouse finished for {}", lhr.resolved_url());

        Ok(AuditOutcome {
            lhr,
            json_report,
            html_report,
        })
    }
}

#[async_trait]
impl AuditEngine for LighthouseEngine {
    async fn audit(&self, url: &str, settings: &AuditSettings) -> AuditResult<AuditOutcome> {
        let browser = BrowserInstance::launch(&self.launch).await?;

        let result = match browser.debugging_port() {
            Ok(port) => self.run_lighthouse(url, port, settings).await,
            Err(e) => Err(e),
        };

        browser.shutdown().await;
        result
    }
}

/// Lighthouse writes `<base>.report.<ext>` when several outputs are requested.
async fn read_report(output_base: &Path, ext: &'static str) -> AuditResult<String> {
    let path = output_base.with_extension(format!("report.{}", ext));
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AuditError::MissingReport(ext)),
        Err(e) => Err(e.into()),
    }
}

/// Build the Lighthouse command line for one run.
pub fn lighthouse_args(
    url: &str,
    port: u16,
    output_base: &Path,
    settings: &AuditSettings,
    max_wait_for_load_ms: u64,
) -> Vec<String> {
    let screen = &settings.screen;

    vec![
        url.to_string(),
        format!("--port={}", port),
        "--output=json".to_string(),
        "--output=html".to_string(),
        format!("--output-path={}", output_base.display()),
        format!("--only-categories={}", settings.categories.join(",")),
        format!("--throttling-method={}", settings.throttling_method),
        format!("--form-factor={}", settings.form_factor),
        format!("--screenEmulation.mobile={}", screen.mobile),
        format!("--screenEmulation.width={}", screen.width),
        format!("--screenEmulation.height={}", screen.height),
        format!("--screenEmulation.deviceScaleFactor={}", screen.device_scale_factor),
        format!("--screenEmulation.disabled={}", screen.disabled),
        format!("--max-wait-for-load={}", max_wait_for_load_ms),
        "--no-enable-error-reporting".to_string(),
        "--quiet".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceProfile;
    use std::path::PathBuf;

    #[test]
    fn test_lighthouse_args_desktop() {
        let settings = AuditSettings::for_device(DeviceProfile::Desktop);
        let args = lighthouse_args(
            "https://example.com/",
            9222,
            &PathBuf::from("/tmp/x/report"),
            &settings,
            120000,
        );

        assert_eq!(args[0], "https://example.com/");
        assert!(args.contains(&"--port=9222".to_string()));
        assert!(args.contains(&"--output=json".to_string()));
        assert!(args.contains(&"--output=html".to_string()));
        assert!(args.contains(
            &"--only-categories=performance,accessibility,best-practices,seo,pwa".to_string()
        ));
        assert!(args.contains(&"--throttling-method=simulate".to_string()));
        assert!(args.contains(&"--form-factor=desktop".to_string()));
        assert!(args.contains(&"--screenEmulation.mobile=false".to_string()));
        assert!(args.contains(&"--screenEmulation.width=1350".to_string()));
        assert!(args.contains(&"--screenEmulation.deviceScaleFactor=1".to_string()));
    }

    #[test]
    fn test_lighthouse_args_mobile() {
        let settings = AuditSettings::for_device(DeviceProfile::Mobile);
        let args = lighthouse_args("https://example.com/", 1, &PathBuf::from("r"), &settings, 1);

        assert!(args.contains(&"--form-factor=mobile".to_string()));
        assert!(args.contains(&"--screenEmulation.mobile=true".to_string()));
        assert!(args.contains(&"--screenEmulation.height=915".to_string()));
        assert!(args.contains(&"--screenEmulation.deviceScaleFactor=2.625".to_string()));
    }

    #[tokio::test]
    async fn test_read_report_naming() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("report");
        std::fs::write(temp_dir.path().join("report.report.json"), "{}").unwrap();

        assert_eq!(read_report(&base, "json").await.unwrap(), "{}");
        assert!(matches!(
            read_report(&base, "html").await,
            Err(AuditError::MissingReport("html"))
        ));
    }
}
