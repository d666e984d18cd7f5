//! EnvScreen - Environmental Site Screening
//!
//! A CLI tool that screens a geographic point against several regulatory
//! data domains concurrently and produces one aggregated, risk-annotated
//! report in a per-run workspace.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (workspace I/O, configuration, no domain succeeded)
//!   2 - Overall risk at or above --fail-on threshold

mod adapters;
mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod orchestrator;
mod report;
mod workspace;

use adapters::AdapterRegistry;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::ProgressBar;
use models::{ComplianceStatus, ReadyPolicy, RiskTier};
use orchestrator::{Orchestrator, ScreeningOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
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

    // Initialize logging
    init_logging(&args);

    info!("EnvScreen v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the screening
    match run_screening(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Screening failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .envscreen.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".envscreen.toml");

    if path.exists() {
        eprintln!("⚠️  .envscreen.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .envscreen.toml")?;

    println!("✅ Created .envscreen.toml with default settings.");
    println!("   Edit it to customize endpoints, timeouts, and the readiness policy.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

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

/// Run the complete screening workflow. Returns exit code (0 or 2).
async fn run_screening(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Handle --dry-run: list the capability set and exit
    if args.dry_run {
        return handle_dry_run(&config);
    }

    let request = args
        .request()
        .context("Coordinates and a project name are required")?;

    let ready_policy =
        ReadyPolicy::parse(&config.general.ready_policy).map_err(anyhow::Error::msg)?;

    // Assemble the fixed adapter registry for this process
    let registry = AdapterRegistry::from_config(&config);
    let orchestrator = Orchestrator::new(registry)
        .with_adapter_timeout(Duration::from_secs(
            config.orchestrator.adapter_timeout_seconds,
        ))
        .with_ready_policy(ready_policy)
        .with_workspace_base(&config.general.workspace_base)
        .with_workspace_override(config.general.workspace.as_ref().map(PathBuf::from));

    let domains: Vec<&str> = orchestrator.domains().iter().map(|d| d.key()).collect();
    println!(
        "🌎 Screening ({:.4}, {:.4}) for project: {}",
        request.latitude, request.longitude, request.project_name
    );
    println!("   Domains: {}", domains.join(", "));
    println!(
        "   Buffer: {} mi | Per-domain timeout: {}s\n",
        request.buffer_miles, config.orchestrator.adapter_timeout_seconds
    );

    // One spinner covers the fan-out; per-domain progress goes to the log.
    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Running {} domain analyses...", domains.len()));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let outcome = orchestrator.run(&request).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let outcome = outcome?;

    print_summary(&outcome);

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    }

    // Check --fail-on threshold
    if let Some(threshold) = args.fail_threshold() {
        if outcome.report.overall_risk >= threshold {
            eprintln!(
                "\n⛔ Overall risk {} is at or above the --fail-on threshold. Failing (exit code 2).",
                outcome.report.overall_risk
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Print the human-readable run summary.
fn print_summary(outcome: &ScreeningOutcome) {
    let summary = &outcome.summary;
    let report = &outcome.report;

    println!("\n📊 Screening Summary:");
    println!(
        "   Domains: {} total | ✅ {} succeeded | ❌ {} failed",
        summary.total, summary.successful, summary.failed
    );
    for failure in &summary.failures {
        println!("   - ⚠️  {}: {}", failure.domain, failure.error);
    }

    println!("\n   Compliance checklist:");
    for entry in &report.checklist {
        let icon = match (entry.status, entry.risk) {
            (ComplianceStatus::Compliant, _) => "🟢",
            (ComplianceStatus::Review, RiskTier::High) => "🔴",
            (ComplianceStatus::Review, _) => "🟡",
        };
        println!(
            "   {} {} - {} / {} ({})",
            icon, entry.domain, entry.status, entry.risk, entry.action
        );
    }

    println!(
        "\n   Overall risk: {} ({})",
        report.overall_risk, report.risk_class
    );
    println!(
        "   Ready for report generation: {}",
        if summary.ready { "yes" } else { "no" }
    );

    println!(
        "   Artifacts written: {}",
        outcome.artifacts.written.len()
    );
    for failure in &outcome.artifacts.failed {
        println!(
            "   ⚠️  Failed to write {}: {}",
            failure.path.display(),
            failure.error
        );
    }

    println!(
        "\n✅ Screening complete! Artifacts saved to: {}",
        outcome.workspace.root().display()
    );
}

/// Handle --dry-run: list registered domains and endpoints, exit.
fn handle_dry_run(config: &Config) -> Result<i32> {
    println!("\n🔍 Dry run: registered domain adapters (no network calls)...\n");

    let enabled = config.enabled_domains();
    if enabled.is_empty() {
        println!("   No domains are enabled.");
    } else {
        for (key, endpoint) in &enabled {
            println!("   📡 {} -> {}", key, endpoint);
        }
        println!("\n   Total: {} domains", enabled.len());
    }

    println!("\n✅ Dry run complete. No queries were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .envscreen.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
