//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::DeviceProfile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lh-audit - averaged Lighthouse audits, optionally behind an OTP login
///
/// Runs Lighthouse several times per page, keeps the latest report for
/// each page and writes a summary.json with the averaged scores.
///
/// Examples:
///   lh-audit --url https://example.com/ --device desktop
///   lh-audit --config audit.toml --runs 5
///   lh-audit --skip-login --device mobile
///   lh-audit open
///   lh-audit --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lh-audit.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Runs per URL (averaged)
    #[arg(short, long, value_name = "COUNT", env = "RUNS")]
    pub runs: Option<usize>,

    /// Device to emulate; prompts interactively when omitted
    #[arg(short, long, value_name = "DEVICE")]
    pub device: Option<DeviceProfile>,

    /// Directory reports are written to
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Chrome profile directory shared by login and audits
    #[arg(long, value_name = "DIR")]
    pub profile_dir: Option<PathBuf>,

    /// Public URL to audit (repeatable); replaces the configured list
    #[arg(short, long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Sign-in page for the OTP login
    #[arg(long, value_name = "URL")]
    pub login_url: Option<String>,

    /// Phone number used for the OTP login
    #[arg(long, env = "MOBILE_NUMBER", hide_env_values = true, value_name = "NUMBER")]
    pub mobile_number: Option<String>,

    /// Chrome executable to use
    #[arg(long, value_name = "FILE")]
    pub chrome: Option<PathBuf>,

    /// Launch Chrome with --no-sandbox
    #[arg(long)]
    pub no_sandbox: bool,

    /// Skip the interactive login and reuse the existing profile
    #[arg(long)]
    pub skip_login: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .lh-audit.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Subcommands besides the default audit.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open every saved HTML report in the default viewer
    Open,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.runs == Some(0) {
            return Err("Runs must be at least 1".to_string());
        }

        for url in self.urls.iter().chain(&self.login_url) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if let Some(ref chrome) = self.chrome {
            if !chrome.exists() {
                return Err(format!("Chrome executable not found: {}", chrome.display()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: None,
            config: None,
            runs: None,
            device: None,
            output_dir: None,
            profile_dir: None,
            urls: vec!["https://example.com/".to_string()],
            login_url: None,
            mobile_number: None,
            chrome: None,
            no_sandbox: false,
            skip_login: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "lh-audit",
            "--device",
            "desktop",
            "--url",
            "https://a.test/",
            "--url",
            "https://b.test/",
            "--skip-login",
        ])
        .unwrap();

        assert_eq!(args.device, Some(DeviceProfile::Desktop));
        assert_eq!(args.urls, vec!["https://a.test/", "https://b.test/"]);
        assert!(args.skip_login);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_parse_open_subcommand() {
        let args = Args::try_parse_from(["lh-audit", "open", "--output-dir", "out"]).unwrap();
        assert_eq!(args.command, Some(Command::Open));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_parse_rejects_unknown_device() {
        assert!(Args::try_parse_from(["lh-audit", "--device", "tablet"]).is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.urls = vec!["example.com".to_string()];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_runs() {
        let mut args = make_args();
        args.runs = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }
}
