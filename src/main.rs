//! url-sentry main entry point
//!
//! Command-line interface for checking a list of URLs.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url_sentry::config::{hash_content, load_config_with_hash, validate, Config, OutputFormat};
use url_sentry::output::{generate_markdown_summary, print_summary};
use url_sentry::url::read_url_list;
use url_sentry::{Dispatcher, HttpProbe, OutputTarget, ProbeKind, UrlTask};

/// url-sentry: a concurrent URL checker
///
/// Reads one URL per line from INPUT, runs the selected check against every
/// URL with bounded concurrency, and writes one result row per URL as soon as
/// it completes.
#[derive(Parser, Debug)]
#[command(name = "url-sentry")]
#[command(version)]
#[command(about = "Check reachability, redirects and content of many URLs", long_about = None)]
struct Cli {
    /// File with one URL per line (blank lines and # comments are skipped)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Check to run against every URL
    #[arg(short, long, default_value = "status")]
    mode: ProbeKind,

    /// Result file path (overrides the config file)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Result file format (overrides the config file)
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of URLs checked at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-URL timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Verify TLS certificates (disabled by default)
    #[arg(long)]
    verify_tls: bool,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Validate config and input, show what would be checked, and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Sqlite,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Sqlite => OutputFormat::Sqlite,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_effective_config(&cli)?;

    let urls = read_url_list(&cli.input)
        .with_context(|| format!("Failed to read URL list {}", cli.input.display()))?;
    if urls.is_empty() {
        bail!("No URLs found in {}", cli.input.display());
    }
    tracing::info!("Loaded {} URLs from {}", urls.len(), cli.input.display());

    if cli.dry_run {
        handle_dry_run(&config, &urls, cli.mode);
        return Ok(());
    }

    let probe = HttpProbe::from_config(&config).context("Failed to build HTTP client")?;
    let dispatcher =
        Dispatcher::new(Arc::new(probe), &config.checker).with_config_hash(config_hash);
    let target = OutputTarget::from_config(&config.output);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            on_signal.cancel();
        }
    });

    let summary = dispatcher
        .run_batch(&urls, cli.mode, &target, &cancel)
        .await
        .context("Batch failed")?;

    if !cli.quiet {
        print_summary(&summary);
    }

    if let Some(path) = config.output.summary_path.as_deref() {
        generate_markdown_summary(&summary, Path::new(path))
            .with_context(|| format!("Failed to write summary {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}

/// Loads the config file (if any), applies CLI overrides, and validates
///
/// Returns the config and the hash of the config file content.
fn load_effective_config(cli: &Cli) -> anyhow::Result<(Config, String)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), hash_content("")),
    };

    if let Some(concurrency) = cli.concurrency {
        config.checker.concurrency = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.checker.timeout_ms = timeout_ms;
    }
    if cli.verify_tls {
        config.checker.verify_tls = true;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Some(summary) = &cli.summary {
        config.output.summary_path = Some(summary.display().to_string());
    }

    validate(&config).context("Invalid configuration")?;
    Ok((config, hash))
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("url_sentry=info,warn"),
            1 => EnvFilter::new("url_sentry=debug,info"),
            2 => EnvFilter::new("url_sentry=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings and the first URLs
fn handle_dry_run(config: &Config, urls: &[String], mode: ProbeKind) {
    println!("=== url-sentry Dry Run ===\n");

    println!("Check: {}", mode);
    if !mode.needs_network() {
        println!("  (no network access needed)");
    }

    println!("\nChecker Configuration:");
    println!("  Concurrency: {}", config.checker.concurrency);
    println!("  Timeout: {}ms", config.checker.timeout_ms);
    println!("  Verify TLS: {}", config.checker.verify_tls);
    println!("  Max redirects: {}", config.checker.max_redirects);
    println!("  User agent: {}", config.checker.user_agent);

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Format: {:?}", config.output.format);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    if mode == ProbeKind::Classify {
        println!(
            "\nSectors ({}, min confidence {:.2}):",
            config.classifier.sectors.len(),
            config.classifier.min_confidence
        );
        for sector in &config.classifier.sectors {
            println!("  - {} ({} keywords)", sector.name, sector.keywords.len());
        }
    }

    println!("\nURLs ({}):", urls.len());
    for task in UrlTask::from_list(urls).iter().take(20) {
        if task.had_scheme() {
            println!("  - {}", task.normalized());
        } else {
            println!("  - {} (from {})", task.normalized(), task.original());
        }
    }
    if urls.len() > 20 {
        println!("  ... and {} more", urls.len() - 20);
    }

    println!("\n=== Dry run complete. No requests were sent. ===");
}
