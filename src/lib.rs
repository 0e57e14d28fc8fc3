//! # isbn-lookup
//!
//! Looks up book metadata by ISBN across online book retailers that only
//! serve their catalogue to a real browser.
//!
//! The library provides:
//!
//! - A bounded pool of browser sessions with FIFO waiters
//! - An ordered registry of site scrapers
//! - A search orchestrator that tries sites in order and caches hits
//! - An LRU cache with per-entry expiry and a background sweep
//! - A memory-bounded bulk pipeline for spreadsheets of ISBNs
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use isbn_lookup::{
//!     sites, ChromeLauncher, Config, DriverPool, ResultCache, Searcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let launcher = Arc::new(ChromeLauncher::new(config.pool.clone()));
//!     let pool = Arc::new(DriverPool::new(launcher, config.pool.size));
//!     let cache = Arc::new(ResultCache::new(&config.cache));
//!
//!     let searcher = Searcher::new(sites::default_registry(), pool.clone(), cache, config.search);
//!     let outcome = searcher.search_first("978-0-13-419044-0").await;
//!     println!("{}", outcome.message());
//!
//!     pool.close().await;
//!     Ok(())
//! }
//! ```

mod book;
mod bulk;
mod cache;
mod config;
mod error;
mod isbn;
mod memory;
mod pool;
mod progress;
mod registry;
mod search;
mod session;
mod site;
mod status;

pub mod ingest;
pub mod output;
pub mod sites;

#[cfg(feature = "headless")]
mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;

#[cfg(test)]
mod test_support;

pub use book::{Book, Lookup, NOT_FOUND};
pub use bulk::{BulkConfig, BulkPipeline, BulkSummary};
pub use cache::{CacheConfig, LruTtlCache, ResultCache};
pub use config::Config;
pub use error::{LookupError, Result};
pub use ingest::{IngestReport, RowSource, Window};
pub use isbn::{Isbn, ValidationError};
pub use memory::{MemoryProbe, ProcessMemory};
pub use output::{OutputFormat, ResultRow};
pub use pool::{DriverPool, PoolConfig, PooledSession};
pub use progress::{NullProgress, Phase, Progress, ProgressSink};
pub use registry::{ScraperFactory, ScraperRegistry, SiteRegistration};
pub use search::{AttemptOutcome, SearchConfig, SearchOutcome, Searcher, SiteAttempt};
pub use session::{DriverSession, SessionFactory, WaitStrategy};
pub use site::{SiteConfig, SiteScraper};
pub use status::{SiteReport, SiteStatus, StatusChecker};

#[cfg(feature = "headless")]
pub use browser::{BrowserSession, ChromeLauncher};
