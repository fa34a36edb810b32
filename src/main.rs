//! Fang-Comments main entry point
//!
//! This is the command-line interface for the new-home comment crawler.

use anyhow::Context;
use clap::Parser;
use fang_comments::config::{load_config, Config, LoggingConfig};
use fang_comments::crawler::{crawl, Coordinator};
use fang_comments::logging::{file_layers, WorkerGuard};
use fang_comments::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Fang-Comments: crawls every listed new-home project and saves its reviews
///
/// Without arguments the crawl runs with the built-in site, retry and output
/// settings. A TOML file can override any of them.
#[derive(Parser, Debug)]
#[command(name = "fang-comments")]
#[command(version = "1.0.0")]
#[command(about = "Crawls new-home listings and saves every user review", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Directory for the comment files (overrides the config file)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Derive the page count and exit without crawling items
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(dir) = cli.output_dir {
        config.output.directory = dir;
    }

    // Dropping the guards flushes the log files, so they live until main returns
    let _log_guards = setup_logging(cli.verbose, cli.quiet, &config.logging)?;

    if let Some(path) = &cli.config {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    if cli.dry_run {
        handle_dry_run(config).await
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the console subscriber and the per-level log files
///
/// Verbosity only affects the console; the log files always receive INFO and
/// ERROR lines.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    logging: &LoggingConfig,
) -> anyhow::Result<Vec<WorkerGuard>> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fang_comments=info,warn"),
            1 => EnvFilter::new("fang_comments=debug,info"),
            2 => EnvFilter::new("fang_comments=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let (files, guards) = file_layers::<Registry>(logging).with_context(|| {
        format!(
            "Failed to open log files in {}",
            logging.directory.display()
        )
    })?;

    let console = fmt::layer()
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(files)
        .with(console)
        .init();

    Ok(guards)
}

/// Handles the --dry-run mode: shows the plan without fetching items
async fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    println!("=== Fang-Comments Dry Run ===\n");

    println!("Site:");
    println!("  Listing URL: {}", config.site.listing_url_template);
    println!("  Listing encoding: {}", config.site.listing_encoding);
    println!("  Comment path: {}", config.site.comment_path);
    println!("  City: {}", config.site.city);

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Attempts: {} (backoff {}-{}ms)",
        config.http.max_attempts, config.http.backoff_min_ms, config.http.backoff_max_ms
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());

    if config.logging.file_output {
        println!(
            "  Logs: {} ({}, {})",
            config.logging.directory.display(),
            config.logging.info_file,
            config.logging.error_file
        );
    }

    let coordinator = Coordinator::new(config)?;
    let pages = coordinator
        .derive_page_count()
        .await
        .context("Failed to derive the listing page count")?;

    println!("\n✓ Would crawl {} listing page(s)", pages);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Writing comments to {} (page size {}, {} attempt(s) per request)",
        config.output.directory.display(),
        config.crawler.page_size,
        config.http.max_attempts
    );

    match crawl(config).await {
        Ok(summary) => {
            print_statistics(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e).context("Crawl aborted before any page was scheduled")
        }
    }
}
