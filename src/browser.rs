//! Chrome instances driven over the DevTools protocol (chromiumoxide).
//!
//! Every audit and the login flow get their own instance bound to the
//! shared profile directory, so cookies written during login are visible
//! to later audits.

use crate::error::{AuditError, AuditResult};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// How to launch a browser instance.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Persistent user data directory (cookies, local storage).
    pub profile_dir: PathBuf,
    /// Run without a visible window.
    pub headless: bool,
    /// Chrome binary to use instead of auto-detection.
    pub executable: Option<PathBuf>,
    /// Pass `--no-sandbox` (needed in most containers).
    pub no_sandbox: bool,
    /// Additional command-line switches.
    pub extra_args: Vec<String>,
}

impl LaunchOptions {
    /// Headless instance for a single audit.
    pub fn for_audit(profile_dir: PathBuf, executable: Option<PathBuf>, no_sandbox: bool) -> Self {
        Self {
            profile_dir,
            headless: true,
            executable,
            no_sandbox,
            extra_args: vec!["--disable-gpu".to_string()],
        }
    }

    /// Visible instance for the interactive login.
    pub fn for_login(profile_dir: PathBuf, executable: Option<PathBuf>, no_sandbox: bool) -> Self {
        Self {
            profile_dir,
            headless: false,
            executable,
            no_sandbox,
            extra_args: [
                "--disable-extensions",
                "--disable-background-networking",
                "--disable-default-apps",
                "--disable-sync",
                "--disable-translate",
                "--no-first-run",
                "--no-default-browser-check",
                "--disable-component-extensions-with-background-pages",
                "--disable-background-timer-throttling",
                "--disable-renderer-backgrounding",
                "--disable-device-discovery-notifications",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// A running Chrome process plus its CDP event pump.
pub struct BrowserInstance {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserInstance {
    /// Launch Chrome with the given options.
    pub async fn launch(options: &LaunchOptions) -> AuditResult<Self> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&options.profile_dir)
            .viewport(None)
            .args(options.extra_args.iter().cloned());

        if !options.headless {
            builder = builder.with_head();
        }
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref exe) = options.executable {
            builder = builder.chrome_executable(exe);
        }

        let config = builder
            .build()
            .map_err(|e| AuditError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AuditError::Browser(format!("Failed to launch browser: {}", e)))?;

        // The handler must be polled for the connection to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(
            "Browser launched ({}), profile: {}",
            browser.websocket_address(),
            options.profile_dir.display()
        );

        Ok(Self { browser, handler })
    }

    /// Remote debugging port, for tools that attach to this instance.
    pub fn debugging_port(&self) -> AuditResult<u16> {
        let address = self.browser.websocket_address();
        port_from_ws_address(address).ok_or_else(|| {
            AuditError::Browser(format!("No debugging port in address: {}", address))
        })
    }

    /// The initial tab, or a blank one if none is open.
    pub async fn first_page(&self) -> AuditResult<Page> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| AuditError::Browser(format!("Failed to list pages: {}", e)))?;

        match pages.into_iter().next() {
            Some(page) => Ok(page),
            None => self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| AuditError::Browser(format!("Failed to open page: {}", e))),
        }
    }

    /// Close the browser and wait for the process to exit.
    ///
    /// Never fails: a browser that won't close politely is killed.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
            if let Some(Err(e)) = self.browser.kill().await {
                warn!("Failed to kill browser: {}", e);
            }
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        debug!("Browser shut down");
    }
}

/// Extract the port from a `ws://host:port/devtools/browser/<id>` address.
pub fn port_from_ws_address(address: &str) -> Option<u16> {
    Url::parse(address).ok().and_then(|u| u.port())
}
