//! Error taxonomy for the audit workflow.
//!
//! Every variant is fatal for the process; the split only exists so the
//! message tells the operator where to look.

use std::path::PathBuf;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur while logging in or auditing.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("{0} missing from the environment (.env)")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not find the {what}. Saved page as {}. Inspect the login page and update selectors.", .dump.display())]
    ElementNotFound { what: &'static str, dump: PathBuf },

    #[error("No button found to request OTP. Update the selector logic.")]
    NoOtpButton,

    #[error("OTP input did not appear within {0}s")]
    OtpTimeout(u64),

    #[error("Input closed before a selection was made")]
    PromptClosed,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Lighthouse failed for {url}: {stderr}")]
    Lighthouse { url: String, stderr: String },

    #[error("Lighthouse did not produce the {0} report")]
    MissingReport(&'static str),

    #[error("Failed to parse Lighthouse report: {0}")]
    ReportParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
