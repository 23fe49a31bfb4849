//! lh-audit - repeated Lighthouse audits with averaged summaries
//!
//! A CLI tool that logs into a site with a manually entered OTP, then
//! audits public and authenticated pages several times each, keeping the
//! latest report per page and an averaged summary.json.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (configuration, login, browser, Lighthouse, filesystem)

mod analysis;
mod audit;
mod browser;
mod cli;
mod config;
mod error;
mod models;
mod prompt;
mod report;
mod session;

use anyhow::{Context, Result};
use audit::{AuditOrchestrator, LighthouseEngine, RunExecutor};
use browser::LaunchOptions;
use cli::{Args, Command};
use config::{Config, CONFIG_FILE};
use prompt::Console;
use session::{SelectorStrategy, SessionBootstrapper};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Name of the page dump written when the login form cannot be found.
const LOGIN_DUMP_FILE: &str = "debug_login_page.html";

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up MOBILE_NUMBER / RUNS from .env before clap reads the environment
    dotenv::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration; the file can turn on verbose logging
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("lh-audit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Audit failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .lh-audit.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the URLs to audit and the login page.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args, config: Config) -> Result<()> {
    if args.command == Some(Command::Open) {
        return handle_open(&config);
    }

    config.validate()?;
    run_audit(&args, &config).await
}

/// Handle `open`: show every saved HTML report.
fn handle_open(config: &Config) -> Result<()> {
    let dir = &config.general.output_dir;
    let opened = report::open_reports(dir)?;

    if opened == 0 {
        println!("No HTML reports found in {}", dir.display());
    } else {
        println!("📂 Opened {} report(s) from {}", opened, dir.display());
    }
    Ok(())
}

/// Run the complete workflow: device, login, public pages, then
/// authenticated pages.
async fn run_audit(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();
    let output_dir = config.general.output_dir.clone();
    let profile_dir = config.general.profile_dir.clone();

    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    tokio::fs::create_dir_all(&profile_dir)
        .await
        .with_context(|| format!("Failed to create {}", profile_dir.display()))?;

    let mut console = Console::stdio();

    let device = match args.device {
        Some(device) => device,
        None => console.select_device().await?,
    };
    info!("Device profile: {}", device);

    // Step 1: Log in so the profile carries the session cookies
    match config.login.login_url {
        Some(ref login_url) if !args.skip_login => {
            let home_url = config.home_url().unwrap_or(login_url.as_str()).to_string();
            let strategy = SelectorStrategy {
                selector_timeout: Duration::from_secs(config.login.selector_timeout_secs),
                otp_timeout: Duration::from_secs(config.login.otp_timeout_secs),
                ..Default::default()
            };
            let bootstrapper = SessionBootstrapper::new(
                strategy,
                login_url.clone(),
                home_url,
                config.login.mobile_number.clone(),
                output_dir.join(LOGIN_DUMP_FILE),
            )?
            .with_timing(
                Duration::from_secs(60),
                Duration::from_millis(config.login.settle_millis),
            );

            let launch = LaunchOptions::for_login(
                profile_dir.clone(),
                config.browser.executable.clone(),
                config.browser.no_sandbox,
            );
            session::establish_session(&launch, &bootstrapper, &mut console).await?;
            info!("Login complete. Session saved in {}", profile_dir.display());
        }
        Some(_) => info!("Skipping login (--skip-login)"),
        None => warn!("No login_url configured; auditing without a login step"),
    }

    // Step 2: Audit
    let engine = LighthouseEngine::new(
        config.lighthouse.binary.clone(),
        config.lighthouse.max_wait_for_load_ms,
        LaunchOptions::for_audit(
            profile_dir,
            config.browser.executable.clone(),
            config.browser.no_sandbox,
        ),
    );
    let executor = RunExecutor::new(engine, output_dir.clone(), device);
    let orchestrator = AuditOrchestrator::new(executor, config.general.runs, !args.quiet);

    let mut summaries = Vec::new();

    let public = &config.targets.public_urls;
    if !public.is_empty() {
        info!("Auditing {} public page(s)", public.len());
        summaries.extend(orchestrator.audit_urls(public).await?);
    }

    let authenticated = &config.targets.authenticated_urls;
    if !authenticated.is_empty() {
        info!("Auditing {} authenticated page(s)", authenticated.len());
        summaries.extend(orchestrator.audit_urls(authenticated).await?);
    }

    // Print summary
    if !args.quiet {
        print_summary(device, &summaries);
    }

    println!(
        "\n✅ Done. Reports saved in: {} ({:.1}s)",
        output_dir.display(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_summary(device: models::DeviceProfile, summaries: &[audit::UrlSummary]) {
    println!("\n📊 Audit Summary ({}):", device);
    for entry in summaries {
        let categories = &entry.summary.categories;
        println!(
            "   {} -> Perf: {} | A11y: {} | BP: {} | SEO: {} | PWA: {}",
            entry.url,
            score(categories.performance),
            score(categories.accessibility),
            score(categories.best_practices),
            score(categories.seo),
            score(categories.pwa)
        );
    }
}

fn score(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Load configuration from `--config`, else `.lh-audit.toml` in the
/// working directory, else defaults. A broken file is an error.
fn load_config(args: &Args) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    Config::resolve(args.config.as_deref(), &cwd)
}
