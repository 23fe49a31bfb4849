//! Interactive OTP login that leaves the shared browser profile signed in.
//!
//! The flow only talks to the page through [`LoginPage`], and finds the
//! credential field and OTP button through a [`LoginStrategy`], so the
//! markup-specific guessing lives in one replaceable place.

use crate::browser::{BrowserInstance, LaunchOptions};
use crate::error::{AuditError, AuditResult};
use async_trait::async_trait;
use chromiumoxide::Page;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Environment variable holding the phone number used to log in.
pub const CREDENTIAL_ENV: &str = "MOBILE_NUMBER";

/// Suspension point while the operator finishes the login by hand.
#[async_trait]
pub trait CompletionSignal: Send {
    /// Show `instructions` and block until the operator says they are done.
    async fn wait_for_operator(&mut self, instructions: &str) -> AuditResult<()>;
}

/// The page operations the login flow needs.
#[async_trait]
pub trait LoginPage: Send + Sync {
    async fn goto(&self, url: &str) -> AuditResult<()>;
    /// Whether `document.readyState` is `complete`.
    async fn is_ready(&self) -> AuditResult<bool>;
    async fn has_element(&self, selector: &str) -> AuditResult<bool>;
    /// Replace the field's value with `text`, typed key by key.
    async fn type_into(&self, selector: &str, text: &str) -> AuditResult<()>;
    /// Click the first `<button>` whose text contains `text`.
    async fn click_button_with_text(&self, text: &str) -> AuditResult<bool>;
    async fn click_first_button(&self) -> AuditResult<bool>;
    /// Full page markup.
    async fn content(&self) -> AuditResult<String>;
}

/// How to find the credential field and request the OTP.
#[async_trait]
pub trait LoginStrategy: Send + Sync {
    /// Selector of the credential-entry field, if one can be found.
    async fn locate_credential_field(&self, page: &dyn LoginPage) -> AuditResult<Option<String>>;
    /// Trigger sending of the one-time code.
    async fn request_otp(&self, page: &dyn LoginPage) -> AuditResult<()>;
    /// Wait for the code entry UI to show up.
    async fn await_otp_entry(&self, page: &dyn LoginPage) -> AuditResult<()>;
}

/// Candidate-selector strategy: try known selectors in order, then fall
/// back to button text, then to the first button on the page.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    pub credential_selectors: Vec<String>,
    pub button_texts: Vec<String>,
    pub otp_selectors: Vec<String>,
    /// Wait per credential selector.
    pub selector_timeout: Duration,
    /// Wait for any OTP input to appear.
    pub otp_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SelectorStrategy {
    fn default() -> Self {
        Self {
            credential_selectors: strings(&[
                r#"input[name="mobile"]"#,
                r#"input[type="text"][placeholder*="mobile"]"#,
                r#"input[type="tel"]"#,
            ]),
            button_texts: strings(&["OTP", "Send OTP", "Continue"]),
            otp_selectors: strings(&[
                r#"input[autocomplete="one-time-code"]"#,
                r#"input[name*="otp"]"#,
                r#"input[id*="otp"]"#,
                r#"input[type="tel"]"#,
            ]),
            selector_timeout: Duration::from_secs(10),
            otp_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SelectorStrategy {
    /// Poll until one of `selectors` exists or `timeout` passes.
    async fn wait_for_any(
        &self,
        page: &dyn LoginPage,
        selectors: &[String],
        timeout: Duration,
    ) -> AuditResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            for selector in selectors {
                if page.has_element(selector).await? {
                    return Ok(Some(selector.clone()));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl LoginStrategy for SelectorStrategy {
    async fn locate_credential_field(&self, page: &dyn LoginPage) -> AuditResult<Option<String>> {
        for selector in &self.credential_selectors {
            let found = self
                .wait_for_any(page, std::slice::from_ref(selector), self.selector_timeout)
                .await?;
            if found.is_some() {
                return Ok(found);
            }
            debug!("Credential field not found with {}", selector);
        }
        Ok(None)
    }

    async fn request_otp(&self, page: &dyn LoginPage) -> AuditResult<()> {
        for text in &self.button_texts {
            if page.click_button_with_text(text).await? {
                debug!("Clicked button containing {:?}", text);
                return Ok(());
            }
        }

        // Last resort.
        if page.click_first_button().await? {
            warn!("No OTP button matched by text; clicked the first button on the page");
            return Ok(());
        }
        Err(AuditError::NoOtpButton)
    }

    async fn await_otp_entry(&self, page: &dyn LoginPage) -> AuditResult<()> {
        match self
            .wait_for_any(page, &self.otp_selectors, self.otp_timeout)
            .await?
        {
            Some(selector) => {
                debug!("OTP input appeared: {}", selector);
                Ok(())
            }
            None => Err(AuditError::OtpTimeout(self.otp_timeout.as_secs())),
        }
    }
}

/// Drives the login flow on a page.
pub struct SessionBootstrapper<S: LoginStrategy> {
    strategy: S,
    login_url: String,
    home_url: String,
    credential: String,
    debug_dump: PathBuf,
    ready_timeout: Duration,
    settle: Duration,
}

impl<S: LoginStrategy> SessionBootstrapper<S> {
    /// Fails up front if the credential is missing.
    pub fn new(
        strategy: S,
        login_url: String,
        home_url: String,
        credential: Option<String>,
        debug_dump: PathBuf,
    ) -> AuditResult<Self> {
        let credential = credential
            .filter(|c| !c.trim().is_empty())
            .ok_or(AuditError::MissingCredential(CREDENTIAL_ENV))?;

        Ok(Self {
            strategy,
            login_url,
            home_url,
            credential,
            debug_dump,
            ready_timeout: Duration::from_secs(60),
            settle: Duration::from_secs(2),
        })
    }

    /// Override the page-ready wait and the settle delay after load.
    pub fn with_timing(mut self, ready_timeout: Duration, settle: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self.settle = settle;
        self
    }

    /// Run the login on `page`, pausing on `signal` for the OTP.
    pub async fn establish_session<C>(&self, page: &dyn LoginPage, signal: &mut C) -> AuditResult<()>
    where
        C: CompletionSignal + ?Sized,
    {
        info!("Navigating to login page: {}", self.login_url);
        page.goto(&self.login_url).await?;
        self.wait_until_ready(page).await?;
        sleep(self.settle).await;

        let field = match self.strategy.locate_credential_field(page).await? {
            Some(field) => field,
            None => {
                let html = page.content().await?;
                tokio::fs::write(&self.debug_dump, html).await?;
                return Err(AuditError::ElementNotFound {
                    what: "phone number input",
                    dump: self.debug_dump.clone(),
                });
            }
        };

        page.type_into(&field, &self.credential).await?;
        self.strategy.request_otp(page).await?;
        self.strategy.await_otp_entry(page).await?;

        signal
            .wait_for_operator(
                "\n==> Enter the OTP in the visible Chrome window.\n   \
                 After submitting OTP and seeing you are logged in, come back here.\n",
            )
            .await?;

        page.goto(&self.home_url).await?;
        info!("Assuming login successful. Session saved in the browser profile.");
        Ok(())
    }

    async fn wait_until_ready(&self, page: &dyn LoginPage) -> AuditResult<()> {
        let deadline = Instant::now() + self.ready_timeout;
        while !page.is_ready().await? {
            if Instant::now() >= deadline {
                return Err(AuditError::Browser(format!(
                    "Login page did not finish loading within {}s",
                    self.ready_timeout.as_secs()
                )));
            }
            sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }
}

/// Launch a visible browser, log in, and always close the browser.
pub async fn establish_session<S, C>(
    launch: &LaunchOptions,
    bootstrapper: &SessionBootstrapper<S>,
    signal: &mut C,
) -> AuditResult<()>
where
    S: LoginStrategy,
    C: CompletionSignal + ?Sized,
{
    println!("🔐 Launching Chrome for manual OTP login...");
    let browser = BrowserInstance::launch(launch).await?;

    let result = match browser.first_page().await {
        Ok(page) => {
            bootstrapper
                .establish_session(&ChromeLoginPage::new(page), signal)
                .await
        }
        Err(e) => Err(e),
    };

    browser.shutdown().await;
    result
}

/// [`LoginPage`] backed by a chromiumoxide tab.
pub struct ChromeLoginPage {
    page: Page,
}

impl ChromeLoginPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval_bool(&self, script: String) -> AuditResult<bool> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| AuditError::Browser(format!("Evaluate failed: {}", e)))?
            .into_value::<bool>()
            .map_err(|e| AuditError::Browser(format!("Unexpected evaluate result: {}", e)))
    }
}

#[async_trait]
impl LoginPage for ChromeLoginPage {
    async fn goto(&self, url: &str) -> AuditResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AuditError::Browser(format!("Navigation to {} failed: {}", url, e)))?;
        Ok(())
    }

    async fn is_ready(&self) -> AuditResult<bool> {
        self.eval_bool("document.readyState === 'complete'".to_string())
            .await
    }

    async fn has_element(&self, selector: &str) -> AuditResult<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn type_into(&self, selector: &str, text: &str) -> AuditResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| AuditError::Browser(format!("Element not found: {}", e)))?;
        element
            .click()
            .await
            .map_err(|e| AuditError::Browser(format!("Click failed: {}", e)))?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| AuditError::Browser(format!("Clearing field failed: {}", e)))?;
        element
            .type_str(text)
            .await
            .map_err(|e| AuditError::Browser(format!("Type failed: {}", e)))?;
        Ok(())
    }

    async fn click_button_with_text(&self, text: &str) -> AuditResult<bool> {
        let needle = serde_json::to_string(text)?;
        self.eval_bool(format!(
            "(() => {{ \
               const b = Array.from(document.querySelectorAll('button'))\
                 .find(b => b.textContent && b.textContent.trim().includes({})); \
               if (!b) return false; \
               b.click(); \
               return true; \
             }})()",
            needle
        ))
        .await
    }

    async fn click_first_button(&self) -> AuditResult<bool> {
        let buttons = self
            .page
            .find_elements("button")
            .await
            .map_err(|e| AuditError::Browser(format!("Button lookup failed: {}", e)))?;

        match buttons.first() {
            Some(button) => {
                button
                    .click()
                    .await
                    .map_err(|e| AuditError::Browser(format!("Click failed: {}", e)))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn content(&self) -> AuditResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| AuditError::Browser(format!("Failed to get content: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory page: a set of present selectors and a list of buttons.
    #[derive(Default)]
    struct FakePage {
        elements: Mutex<HashSet<String>>,
        buttons: Vec<String>,
        /// Selectors that appear once any button is clicked.
        after_click: Vec<String>,
        events: Mutex<Vec<String>>,
    }

    impl FakePage {
        fn with(elements: &[&str], buttons: &[&str], after_click: &[&str]) -> Self {
            Self {
                elements: Mutex::new(elements.iter().map(|s| s.to_string()).collect()),
                buttons: strings(buttons),
                after_click: strings(after_click),
                events: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn clicked(&self) {
            let mut elements = self.elements.lock().unwrap();
            elements.extend(self.after_click.iter().cloned());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LoginPage for FakePage {
        async fn goto(&self, url: &str) -> AuditResult<()> {
            self.record(format!("goto {}", url));
            Ok(())
        }

        async fn is_ready(&self) -> AuditResult<bool> {
            Ok(true)
        }

        async fn has_element(&self, selector: &str) -> AuditResult<bool> {
            Ok(self.elements.lock().unwrap().contains(selector))
        }

        async fn type_into(&self, selector: &str, text: &str) -> AuditResult<()> {
            self.record(format!("type {} {}", selector, text));
            Ok(())
        }

        async fn click_button_with_text(&self, text: &str) -> AuditResult<bool> {
            if self.buttons.iter().any(|b| b.contains(text)) {
                self.record(format!("click-text {}", text));
                self.clicked();
                return Ok(true);
            }
            Ok(false)
        }

        async fn click_first_button(&self) -> AuditResult<bool> {
            if self.buttons.is_empty() {
                return Ok(false);
            }
            self.record("click-first".to_string());
            self.clicked();
            Ok(true)
        }

        async fn content(&self) -> AuditResult<String> {
            Ok("<html><body>no inputs here</body></html>".to_string())
        }
    }

    #[derive(Default)]
    struct CountingSignal {
        calls: usize,
    }

    #[async_trait]
    impl CompletionSignal for CountingSignal {
        async fn wait_for_operator(&mut self, _instructions: &str) -> AuditResult<()> {
            self.calls += 1;
            Ok(())
        }
    }

    fn fast_strategy() -> SelectorStrategy {
        SelectorStrategy {
            selector_timeout: Duration::from_millis(5),
            otp_timeout: Duration::from_millis(5),
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn bootstrapper(dump: PathBuf) -> SessionBootstrapper<SelectorStrategy> {
        SessionBootstrapper::new(
            fast_strategy(),
            "https://site.test/signin".to_string(),
            "https://site.test/".to_string(),
            Some("9876543210".to_string()),
            dump,
        )
        .unwrap()
        .with_timing(Duration::from_millis(50), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_login_happy_path() {
        let temp_dir = TempDir::new().unwrap();
        let page = FakePage::with(
            &[r#"input[type="tel"]"#],
            &["Send OTP"],
            &[r#"input[autocomplete="one-time-code"]"#],
        );
        let mut signal = CountingSignal::default();

        bootstrapper(temp_dir.path().join("dump.html"))
            .establish_session(&page, &mut signal)
            .await
            .unwrap();

        assert_eq!(signal.calls, 1);
        assert_eq!(
            page.events(),
            vec![
                "goto https://site.test/signin".to_string(),
                r#"type input[type="tel"] 9876543210"#.to_string(),
                "click-text OTP".to_string(),
                "goto https://site.test/".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_credential_selectors_tried_in_order() {
        let page = FakePage::with(
            &[r#"input[type="tel"]"#, r#"input[name="mobile"]"#],
            &[],
            &[],
        );

        let found = fast_strategy().locate_credential_field(&page).await.unwrap();
        assert_eq!(found.as_deref(), Some(r#"input[name="mobile"]"#));
    }

    #[tokio::test]
    async fn test_missing_field_dumps_page() {
        let temp_dir = TempDir::new().unwrap();
        let dump = temp_dir.path().join("debug_login_page.html");
        let page = FakePage::with(&[], &["Continue"], &[]);
        let mut signal = CountingSignal::default();

        let err = bootstrapper(dump.clone())
            .establish_session(&page, &mut signal)
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::ElementNotFound { .. }));
        assert!(std::fs::read_to_string(&dump).unwrap().contains("no inputs here"));
        assert_eq!(signal.calls, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_first_button() {
        let page = FakePage::with(&[], &["Next"], &[]);
        fast_strategy().request_otp(&page).await.unwrap();
        assert_eq!(page.events(), vec!["click-first".to_string()]);
    }

    #[tokio::test]
    async fn test_no_buttons_is_an_error() {
        let page = FakePage::default();
        assert!(matches!(
            fast_strategy().request_otp(&page).await,
            Err(AuditError::NoOtpButton)
        ));
    }

    #[tokio::test]
    async fn test_otp_input_never_appears() {
        let temp_dir = TempDir::new().unwrap();
        let page = FakePage::with(&[r#"input[name="mobile"]"#], &["Continue"], &[]);
        let mut signal = CountingSignal::default();

        let err = bootstrapper(temp_dir.path().join("dump.html"))
            .establish_session(&page, &mut signal)
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::OtpTimeout(_)));
        assert_eq!(signal.calls, 0);
    }

    #[test]
    fn test_missing_credential_is_rejected() {
        for credential in [None, Some("  ".to_string())] {
            let result = SessionBootstrapper::new(
                SelectorStrategy::default(),
                "https://site.test/signin".to_string(),
                "https://site.test/".to_string(),
                credential,
                PathBuf::from("dump.html"),
            );
            assert!(matches!(result, Err(AuditError::MissingCredential(_))));
        }
    }
}
