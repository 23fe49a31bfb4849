//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lh-audit.toml` files.

use crate::error::AuditError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".lh-audit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Pages to audit.
    #[serde(default)]
    pub targets: TargetsConfig,

    /// OTP login settings.
    #[serde(default)]
    pub login: LoginConfig,

    /// Lighthouse settings.
    #[serde(default)]
    pub lighthouse: LighthouseConfig,

    /// Chrome settings.
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Runs per URL; results are averaged.
    #[serde(default = "default_runs")]
    pub runs: usize,

    /// Where reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Persistent Chrome profile shared by login and audits.
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            output_dir: default_output_dir(),
            profile_dir: default_profile_dir(),
            verbose: false,
        }
    }
}

fn default_runs() -> usize {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_profile_dir() -> PathBuf {
    PathBuf::from(".chrome-profile")
}

/// URL lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetsConfig {
    /// Audited before login state matters.
    #[serde(default)]
    pub public_urls: Vec<String>,

    /// Audited after the public list; may be empty.
    #[serde(default)]
    pub authenticated_urls: Vec<String>,
}

/// Login flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Sign-in page. Login is skipped when unset.
    #[serde(default)]
    pub login_url: Option<String>,

    /// Page visited after the OTP to confirm the session.
    /// Defaults to the first public URL.
    #[serde(default)]
    pub home_url: Option<String>,

    /// Phone number; normally comes from `MOBILE_NUMBER`.
    #[serde(default, skip_serializing)]
    pub mobile_number: Option<String>,

    /// Wait per credential selector, in seconds.
    #[serde(default = "default_selector_timeout")]
    pub selector_timeout_secs: u64,

    /// Wait for the OTP input to appear, in seconds.
    #[serde(default = "default_otp_timeout")]
    pub otp_timeout_secs: u64,

    /// Pause after the login page finishes loading, in milliseconds.
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_url: None,
            home_url: None,
            mobile_number: None,
            selector_timeout_secs: default_selector_timeout(),
            otp_timeout_secs: default_otp_timeout(),
            settle_millis: default_settle_millis(),
        }
    }
}

fn default_selector_timeout() -> u64 {
    10
}

fn default_otp_timeout() -> u64 {
    30
}

fn default_settle_millis() -> u64 {
    2000
}

/// Lighthouse CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LighthouseConfig {
    /// Lighthouse executable.
    #[serde(default = "default_lighthouse_binary")]
    pub binary: String,

    /// Passed as `--max-wait-for-load`.
    #[serde(default = "default_max_wait_for_load")]
    pub max_wait_for_load_ms: u64,
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            binary: default_lighthouse_binary(),
            max_wait_for_load_ms: default_max_wait_for_load(),
        }
    }
}

fn default_lighthouse_binary() -> String {
    "lighthouse".to_string()
}

fn default_max_wait_for_load() -> u64 {
    120_000
}

/// Chrome launch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome binary; auto-detected when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Launch with `--no-sandbox`.
    #[serde(default)]
    pub no_sandbox: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load `.lh-audit.toml` from `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolve the configuration for a run: the explicit file if given,
    /// else `.lh-audit.toml` in `dir`, else defaults. A file that exists
    /// but can't be read or parsed is an error.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_from_dir(dir)?.unwrap_or_default()),
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their env fallbacks) take precedence over the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(runs) = args.runs {
            self.general.runs = runs;
        }
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.clone();
        }
        if let Some(ref dir) = args.profile_dir {
            self.general.profile_dir = dir.clone();
        }
        if !args.urls.is_empty() {
            self.targets.public_urls = args.urls.clone();
        }
        if let Some(ref url) = args.login_url {
            self.login.login_url = Some(url.clone());
        }
        if args.mobile_number.is_some() {
            self.login.mobile_number = args.mobile_number.clone();
        }
        if let Some(ref exe) = args.chrome {
            self.browser.executable = Some(exe.clone());
        }
        if args.no_sandbox {
            self.browser.no_sandbox = true;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the merged configuration before anything is launched.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.general.runs == 0 {
            return Err(AuditError::InvalidConfig(
                "runs must be at least 1".to_string(),
            ));
        }
        if self.targets.public_urls.is_empty() && self.targets.authenticated_urls.is_empty() {
            return Err(AuditError::InvalidConfig(format!(
                "no URLs to audit; add [targets] to {} or pass --url",
                CONFIG_FILE
            )));
        }

        let all_urls = self
            .targets
            .public_urls
            .iter()
            .chain(&self.targets.authenticated_urls)
            .chain(&self.login.login_url)
            .chain(&self.login.home_url);
        for url in all_urls {
            if let Err(e) = url::Url::parse(url) {
                return Err(AuditError::InvalidConfig(format!(
                    "invalid URL {:?}: {}",
                    url, e
                )));
            }
        }

        Ok(())
    }

    /// Log level after merging: `quiet` wins, then `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Page used to confirm the session after login.
    pub fn home_url(&self) -> Option<&str> {
        self.login
            .home_url
            .as_deref()
            .or_else(|| self.targets.public_urls.first().map(String::as_str))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let mut config = Config::default();
        config.targets.public_urls = vec!["https://example.com/".to_string()];
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
