//! Kumo-Loom main entry point
//!
//! Command-line interface for the crawl-job dispatcher. The binary is the
//! scheduler's owning caller: it submits the seed URLs, watches completion
//! events, and decides which discovered requests feed back into the queue.

use anyhow::Context;
use clap::Parser;
use kumo_loom::browser::{BrowserRuntime, HttpRenderer};
use kumo_loom::cache::{CompletionCache, MemoryCache, SqliteCache};
use kumo_loom::config::{load_config_with_hash, Config};
use kumo_loom::crawler::{FetchDriver, Scheduler, SchedulerHealth, Submission};
use kumo_loom::job::{CrawlTarget, JobOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Kumo-Loom: a crawl-job dispatcher for a shared rendering runtime
///
/// Kumo-Loom crawls the configured seed URLs through a pool-limited,
/// periodically-recycled rendering runtime, deduplicating work against a
/// completion cache.
#[derive(Parser, Debug)]
#[command(name = "kumo-loom")]
#[command(version = "1.0.0")]
#[command(about = "A crawl-job dispatcher for a shared rendering runtime", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) =
        load_config_with_hash(&cli.config).context("Failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo_loom=info,warn"),
            1 => EnvFilter::new("kumo_loom=debug,info"),
            2 => EnvFilter::new("kumo_loom=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) {
    println!("=== Kumo-Loom Dry Run ===\n");

    println!("Scheduler:");
    println!("  Max concurrent units: {}", config.scheduler.max_concurrent);
    println!("  Reset threshold: {}", config.scheduler.reset_threshold);

    println!("\nBrowser:");
    println!(
        "  Request timeout: {}s",
        config.browser.request_timeout_secs
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nCache:");
    match &config.cache.database_path {
        Some(path) => println!("  SQLite database: {}", path),
        None => println!("  In-memory"),
    }

    println!("\nCrawl policy:");
    println!("  Follow links: {}", config.crawl.follow_links);
    println!("  Same host only: {}", config.crawl.same_host_only);
    println!("  Max pages: {}", config.crawl.max_pages);

    println!("\nSeeds ({}):", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let runtime = Arc::new(HttpRenderer::new(
        &config.user_agent,
        Duration::from_secs(config.browser.request_timeout_secs),
    ));
    let handle = runtime
        .initialize()
        .await
        .context("Failed to initialize render runtime")?;

    let cache: Arc<dyn CompletionCache> = match &config.cache.database_path {
        Some(path) => Arc::new(
            SqliteCache::new(Path::new(path)).context("Failed to open cache database")?,
        ),
        None => Arc::new(MemoryCache::new()),
    };

    let (scheduler, mut completions) = Scheduler::new(
        config.scheduler.clone(),
        runtime,
        Arc::new(FetchDriver),
        cache,
        handle,
    );
    let mut health = scheduler.health();

    let seed_hosts: HashSet<String> = config
        .crawl
        .seeds
        .iter()
        .filter_map(|seed| Url::parse(seed).ok())
        .filter_map(|url| url.host_str().map(str::to_string))
        .collect();

    let mut submitted: u32 = 0;
    for seed in &config.crawl.seeds {
        match scheduler.submit(CrawlTarget::url(seed.clone())) {
            Ok(Submission::Enqueued) => submitted += 1,
            Ok(Submission::Finished(_)) => {
                tracing::info!("Seed already finished in cache: {}", seed)
            }
            Ok(Submission::InFlight(_)) => {}
            Err(e) => tracing::warn!("Rejected seed {}: {}", seed, e),
        }
    }

    let start_time = std::time::Instant::now();
    let mut finished: u32 = 0;
    let mut failures: u32 = 0;

    loop {
        let status = scheduler.status();
        if status.queue_depth == 0 && status.running_count == 0 {
            break;
        }

        tokio::select! {
            event = completions.recv() => {
                let Some(event) = event else { break };
                finished += 1;

                match &event.outcome {
                    JobOutcome::Success(capture) => {
                        if config.crawl.follow_links {
                            for request in &capture.discovered {
                                if submitted >= config.crawl.max_pages {
                                    break;
                                }
                                if config.crawl.same_host_only
                                    && !has_seed_host(&request.url, &seed_hosts)
                                {
                                    continue;
                                }
                                match scheduler.submit(CrawlTarget::request(request.clone())) {
                                    Ok(Submission::Enqueued) => submitted += 1,
                                    Ok(_) => {}
                                    Err(e) => tracing::debug!(
                                        "Skipping discovered request {}: {}",
                                        request.url,
                                        e
                                    ),
                                }
                            }
                        }
                    }
                    JobOutcome::Failure { error } => {
                        failures += 1;
                        tracing::warn!("Crawl failed for {}: {}", event.identity, error);
                    }
                }

                if finished % 10 == 0 {
                    let status = scheduler.status();
                    let rate = finished as f64 / start_time.elapsed().as_secs_f64();
                    tracing::info!(
                        "Progress: {} finished, {} queued, {} running, {:.2} pages/sec",
                        finished,
                        status.queue_depth,
                        status.running_count,
                        rate
                    );
                }
            }
            result = health.changed() => {
                if result.is_err() {
                    break;
                }
                let state = health.borrow().clone();
                if let SchedulerHealth::Failed(error) = state {
                    anyhow::bail!("Scheduler failed: {}", error);
                }
            }
        }
    }

    tracing::info!(
        "Crawl completed: {} finished ({} failures) in {:?}",
        finished,
        failures,
        start_time.elapsed()
    );

    Ok(())
}

/// Returns whether a discovered URL points at one of the seed hosts
fn has_seed_host(url: &str, seed_hosts: &HashSet<String>) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .map(|host| seed_hosts.contains(&host))
        .unwrap_or(false)
}
