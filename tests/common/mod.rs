//! Stub sites and sessions shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use isbn_lookup::{
    Book, CacheConfig, DriverPool, DriverSession, Isbn, Lookup, ResultCache, Result,
    ScraperRegistry, SearchConfig, Searcher, SessionFactory, SiteConfig, SiteScraper,
    WaitStrategy,
};

/// A session that renders nothing.
pub struct BlankSession;

#[async_trait]
impl DriverSession for BlankSession {
    async fn render(&self, _url: &str, _wait: &WaitStrategy) -> Result<String> {
        Ok("<html><body></body></html>".to_string())
    }
}

/// Creates blank sessions and counts them.
#[derive(Default)]
pub struct BlankFactory {
    pub created: AtomicUsize,
}

#[async_trait]
impl SessionFactory for BlankFactory {
    async fn create(&self) -> Result<Box<dyn DriverSession>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(BlankSession))
    }
}

/// A site that lists exactly the ISBNs it was given.
#[derive(Clone)]
pub struct CatalogueSite {
    config: SiteConfig,
    titles: Vec<(String, String)>,
    pub calls: Arc<AtomicUsize>,
}

impl CatalogueSite {
    pub fn new(name: &str) -> Self {
        Self {
            config: SiteConfig {
                name: name.to_string(),
                base_url: format!("https://{}.example", name.to_lowercase()),
                ..Default::default()
            },
            titles: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn listing(mut self, isbn: &str, title: &str) -> Self {
        self.titles.push((isbn.to_string(), title.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteScraper for CatalogueSite {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, _session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hit = self.titles.iter().find(|(listed, _)| listed == isbn.as_str());
        Ok(match hit {
            Some((_, title)) => Lookup::Found(
                Book::new(isbn.as_str(), title.as_str())
                    .with_author("Integration Author")
                    .with_url(format!("{}/p/{}", self.config.base_url, isbn)),
            ),
            None => Lookup::NotFound,
        })
    }
}

/// Registers `sites` in order.
pub fn registry(sites: &[CatalogueSite]) -> ScraperRegistry {
    let mut registry = ScraperRegistry::new();
    for site in sites {
        let site = site.clone();
        registry
            .register(site.name().to_string(), move || Box::new(site.clone()))
            .unwrap();
    }
    registry
}

/// A searcher over `sites` with a two-session pool.
pub fn searcher(sites: &[CatalogueSite]) -> (Searcher, Arc<BlankFactory>) {
    let factory = Arc::new(BlankFactory::default());
    let searcher = Searcher::new(
        registry(sites),
        Arc::new(DriverPool::new(factory.clone(), 2)),
        Arc::new(ResultCache::new(&CacheConfig::default())),
        SearchConfig::default(),
    );
    (searcher, factory)
}
