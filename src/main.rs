//! isbn-lookup CLI - book metadata lookup by ISBN.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use isbn_lookup::{
    sites, BulkPipeline, ChromeLauncher, Config, DriverPool, OutputFormat, Progress, ResultCache,
    SearchOutcome, Searcher, StatusChecker,
};

/// isbn-lookup - find title, author and publisher for ISBNs
#[derive(Parser)]
#[command(name = "isbn-lookup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of browser sessions
    #[arg(long, global = true)]
    pool_size: Option<usize>,

    /// Show the browser windows
    #[arg(long, global = true)]
    headed: bool,

    /// Rows per window when reading input files
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Stop reading input above this resident memory (MB)
    #[arg(long, global = true)]
    memory_limit: Option<u64>,

    /// Cache lifetime of a found book (seconds)
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more ISBNs
    Search(SearchArgs),

    /// Look up every ISBN in the first column of a spreadsheet
    Bulk(BulkArgs),

    /// List retailer sites in the order they are tried
    Sites,

    /// Check whether each retailer site is reachable
    Status,
}

#[derive(Parser)]
struct SearchArgs {
    /// ISBN-10 or ISBN-13, separators allowed
    #[arg(required = true)]
    isbns: Vec<String>,

    /// Print found books as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct BulkArgs {
    /// Input file (.xlsx, .csv or one ISBN per line)
    file: PathBuf,

    /// Directory for the result file (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Result file format: xlsx or csv
    #[arg(short, long, default_value = "xlsx")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    let launcher = Arc::new(ChromeLauncher::new(config.pool.clone()));
    let pool = Arc::new(DriverPool::new(launcher, config.pool.size));
    let cache = Arc::new(ResultCache::new(&config.cache));
    let cleanup = cache.spawn_cleanup();
    let searcher = Arc::new(Searcher::new(
        sites::default_registry(),
        Arc::clone(&pool),
        cache,
        config.search.clone(),
    ));

    // Ctrl-C closes the pool and lets the command wind down, so a bulk run
    // still writes what it found. A second Ctrl-C exits at once.
    let interrupt = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("Interrupted, finishing current lookups and saving results");
            pool.close().await;
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        })
    };

    let result = run(cli.command, &config, searcher).await;

    interrupt.abort();
    pool.close().await;
    cleanup.abort();
    result
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(size) = cli.pool_size {
        config.pool.size = size;
    }
    if cli.headed {
        config.pool.headless = false;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.bulk.chunk_size = chunk_size;
    }
    if let Some(limit) = cli.memory_limit {
        config.bulk.memory_limit_mb = Some(limit);
    }
    if let Some(ttl) = cli.cache_ttl {
        config.cache.ttl_secs = ttl;
    }

    config.validate()?;
    Ok(config)
}

async fn run(command: Commands, config: &Config, searcher: Arc<Searcher>) -> Result<()> {
    match command {
        Commands::Search(args) => run_search(args, &searcher).await,
        Commands::Bulk(args) => run_bulk(args, config, searcher).await,
        Commands::Sites => list_sites(&searcher),
        Commands::Status => check_status(&searcher).await,
    }
}

async fn run_search(args: SearchArgs, searcher: &Searcher) -> Result<()> {
    for raw in &args.isbns {
        let outcome = searcher.search_first(raw).await;

        match (&outcome, args.json) {
            (SearchOutcome::Found { book, .. }, true) => {
                println!("{}", serde_json::to_string_pretty(book)?);
            }
            (SearchOutcome::Found { book, cached }, false) => {
                let origin = if *cached { " (cached)" } else { "" };
                println!("Found on {}{}:", book.source_site, origin);
                println!("{}\n", outcome.message());
            }
            (SearchOutcome::NotFound { attempts, .. }, _) => {
                println!("{}", outcome.message());
                for attempt in attempts {
                    println!("  {}", attempt);
                }
                println!();
            }
            _ => println!("{}\n", outcome.message()),
        }
    }
    Ok(())
}

async fn run_bulk(args: BulkArgs, config: &Config, searcher: Arc<Searcher>) -> Result<()> {
    let output_dir = match args.output_dir {
        Some(dir) => dir,
        None => input_dir(&args.file),
    };

    let pipeline = BulkPipeline::new(searcher, config.bulk.clone());
    let progress = |p: &Progress| eprintln!("{}", p);

    let summary = pipeline
        .run(&args.file, &output_dir, args.format, &progress)
        .await
        .with_context(|| format!("Failed to process {}", args.file.display()))?;

    println!("\n{}", summary);
    if let Some(error) = &summary.write_error {
        anyhow::bail!("Results were not saved: {}", error);
    }
    info!("Bulk run complete");
    Ok(())
}

fn input_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn list_sites(searcher: &Searcher) -> Result<()> {
    println!("Retailer sites (tried in this order):\n");
    for (i, registration) in searcher.registry().iter().enumerate() {
        let scraper = registration.create();
        println!("  {}. {:<10} {}", i + 1, registration.name(), scraper.base_url());
    }
    Ok(())
}

async fn check_status(searcher: &Searcher) -> Result<()> {
    let checker = StatusChecker::new()?;
    for report in checker.check_sites(searcher.registry()).await {
        println!("  {:<10} {:<28} {}", report.name, report.base_url, report.status);
    }
    Ok(())
}
