//! Search orchestration.
//!
//! A [`Searcher`] answers one ISBN at a time: validate, consult the cache,
//! then walk the registered sites in order, borrowing one pooled session per
//! site, until a site lists the book.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::book::{Book, Lookup};
use crate::cache::ResultCache;
use crate::isbn::{Isbn, ValidationError};
use crate::pool::{DriverPool, PooledSession};
use crate::progress::{Progress, ProgressSink};
use crate::registry::ScraperRegistry;
use crate::{LookupError, Result};

/// Time budgets and parallelism for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound on one site's lookup, in seconds.
    #[serde(default = "default_site_timeout")]
    pub site_timeout_secs: u64,
    /// How long one acquire attempt waits for a free session, in seconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Acquire attempts per site before the ISBN is reported as failed.
    #[serde(default = "default_acquire_attempts")]
    pub acquire_attempts: u32,
    /// ISBNs searched concurrently by [`Searcher::search_many`].
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_site_timeout() -> u64 {
    45
}

fn default_acquire_timeout() -> u64 {
    120
}

fn default_acquire_attempts() -> u32 {
    3
}

fn default_workers() -> usize {
    1
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            site_timeout_secs: default_site_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            acquire_attempts: default_acquire_attempts(),
            workers: default_workers(),
        }
    }
}

impl SearchConfig {
    pub fn site_timeout(&self) -> Duration {
        Duration::from_secs(self.site_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Why a site did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The site does not list the ISBN.
    NotFound,
    /// The scraper failed; the message is kept for diagnostics.
    Failed(String),
    /// The scraper exceeded the site timeout.
    TimedOut,
}

/// One site tried during a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAttempt {
    pub site: String,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for SiteAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::NotFound => write!(f, "{}: not listed", self.site),
            AttemptOutcome::Failed(e) => write!(f, "{}: failed ({})", self.site, e),
            AttemptOutcome::TimedOut => write!(f, "{}: timed out", self.site),
        }
    }
}

/// Result of searching one ISBN.
#[derive(Debug)]
pub enum SearchOutcome {
    /// A site listed the book. `cached` is set when no site was contacted.
    Found { book: Book, cached: bool },
    /// Every site was tried without a hit.
    NotFound {
        isbn: Isbn,
        attempts: Vec<SiteAttempt>,
    },
    /// The input is not a well-formed ISBN; nothing was looked up.
    Invalid {
        input: String,
        error: ValidationError,
    },
    /// The search could not run to completion, e.g. the pool closed.
    Failed { isbn: Isbn, error: LookupError },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Name of the site that listed the book.
    pub fn site(&self) -> Option<&str> {
        match self {
            Self::Found { book, .. } => Some(&book.source_site),
            _ => None,
        }
    }

    pub fn book(&self) -> Option<&Book> {
        match self {
            Self::Found { book, .. } => Some(book),
            _ => None,
        }
    }

    /// The ISBN as typed for invalid input, normalized otherwise.
    pub fn isbn(&self) -> &str {
        match self {
            Self::Found { book, .. } => &book.isbn,
            Self::NotFound { isbn, .. } | Self::Failed { isbn, .. } => isbn.as_str(),
            Self::Invalid { input, .. } => input,
        }
    }

    /// Human-readable summary: the book on success, the reason otherwise.
    pub fn message(&self) -> String {
        match self {
            Self::Found { book, .. } => book.describe(),
            Self::NotFound { isbn, attempts } => {
                let sites: Vec<_> = attempts.iter().map(|a| a.site.as_str()).collect();
                if sites.is_empty() {
                    format!("ISBN {} not found: no site is enabled", isbn)
                } else {
                    format!("ISBN {} not found on any site ({})", isbn, sites.join(", "))
                }
            }
            Self::Invalid { input, error } => format!("'{}' is not a valid ISBN: {}", input, error),
            Self::Failed { isbn, error } => format!("Search for ISBN {} failed: {}", isbn, error),
        }
    }
}

/// Looks up ISBNs across the registered sites.
pub struct Searcher {
    registry: ScraperRegistry,
    pool: Arc<DriverPool>,
    cache: Arc<ResultCache>,
    config: SearchConfig,
}

impl Searcher {
    /// Creates a searcher over shared pool and cache instances.
    pub fn new(
        registry: ScraperRegistry,
        pool: Arc<DriverPool>,
        cache: Arc<ResultCache>,
        config: SearchConfig,
    ) -> Self {
        Self {
            registry,
            pool,
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &ScraperRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<DriverPool> {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches one ISBN given as free-form input.
    ///
    /// Invalid input is reported without touching the pool or the cache.
    pub async fn search_first(&self, raw: &str) -> SearchOutcome {
        match Isbn::parse(raw) {
            Ok(isbn) => self.search_isbn(isbn).await,
            Err(error) => {
                debug!("Rejected ISBN input '{}': {}", raw, error);
                SearchOutcome::Invalid {
                    input: raw.trim().to_string(),
                    error,
                }
            }
        }
    }

    /// Searches an already validated ISBN.
    pub async fn search_isbn(&self, isbn: Isbn) -> SearchOutcome {
        if let Some(book) = self.cache.get(&isbn).await {
            debug!("Cache hit for {} ({})", isbn, book.source_site);
            return SearchOutcome::Found { book, cached: true };
        }

        let mut attempts = Vec::new();
        for registration in self.registry.iter() {
            let scraper = registration.create();
            if !scraper.is_enabled() {
                continue;
            }
            let name = registration.name();

            let session = match self.acquire().await {
                Ok(session) => session,
                Err(error) => {
                    warn!("No driver session for {} on {}: {}", isbn, name, error);
                    return SearchOutcome::Failed { isbn, error };
                }
            };

            debug!("Trying {} for {}", name, isbn);
            let result = timeout(self.config.site_timeout(), scraper.lookup(&*session, &isbn)).await;

            let outcome = match result {
                Ok(Ok(Lookup::Found(mut book))) => {
                    drop(session);
                    book.source_site = name.to_string();
                    info!("Found {} on {}: {}", isbn, name, book.title);
                    self.cache.put(isbn, book.clone()).await;
                    return SearchOutcome::Found {
                        book,
                        cached: false,
                    };
                }
                Ok(Ok(Lookup::NotFound)) => {
                    drop(session);
                    debug!("{} not listed on {}", isbn, name);
                    AttemptOutcome::NotFound
                }
                Ok(Err(e)) => {
                    session.discard();
                    warn!("Site {} failed for {}: {}", name, isbn, e);
                    AttemptOutcome::Failed(e.to_string())
                }
                Err(_) => {
                    session.discard();
                    warn!("Site {} timed out for {}", name, isbn);
                    AttemptOutcome::TimedOut
                }
            };
            attempts.push(SiteAttempt {
                site: name.to_string(),
                outcome,
            });
        }

        info!("{} not found on any site", isbn);
        SearchOutcome::NotFound { isbn, attempts }
    }

    /// Searches every input in order, reporting progress after each one.
    ///
    /// Up to `workers` ISBNs are in flight at once; outcomes are returned and
    /// reported in input order either way. Copies of the same ISBN never run
    /// side by side: a later copy waits for the earlier one and then finds a
    /// hit in the cache.
    pub async fn search_many<S>(&self, isbns: &[S], progress: &dyn ProgressSink) -> Vec<SearchOutcome>
    where
        S: AsRef<str> + Sync,
    {
        let total = isbns.len();
        let workers = self.config.workers.max(1);

        let mut seen = HashSet::new();
        let gates: HashMap<Isbn, Mutex<()>> = isbns
            .iter()
            .filter_map(|raw| Isbn::parse(raw.as_ref()).ok())
            .filter(|isbn| !seen.insert(isbn.clone()))
            .map(|isbn| (isbn, Mutex::new(())))
            .collect();
        let gates = &gates;

        let mut outcomes = Vec::with_capacity(total);
        let mut pending = stream::iter(isbns)
            .map(|raw| async move {
                let raw = raw.as_ref();
                let gate = Isbn::parse(raw).ok().and_then(|isbn| gates.get(&isbn));
                let _turn = match gate {
                    Some(gate) => Some(gate.lock().await),
                    None => None,
                };
                self.search_first(raw).await
            })
            .buffered(workers);

        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
            progress.report(&Progress::search(outcomes.len(), total));
        }
        outcomes
    }

    async fn acquire(&self) -> Result<PooledSession> {
        let limit = self.config.acquire_timeout();
        let attempts = self.config.acquire_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.pool.acquire_timeout(Some(limit)).await {
                Ok(session) => return Ok(session),
                Err(LookupError::PoolClosed) => return Err(LookupError::PoolClosed),
                Err(e) if attempt < attempts => {
                    warn!("Acquire attempt {}/{} failed: {}", attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
