//! BKM Kitap scraper.

use async_trait::async_trait;

use super::catalog::Catalog;
use crate::book::Lookup;
use crate::isbn::Isbn;
use crate::session::DriverSession;
use crate::site::{SiteConfig, SiteScraper};
use crate::Result;

const CATALOG: Catalog = Catalog {
    search_paths: &[
        "/arama?q={isbn}",
        "/search?query={isbn}",
        "/kitap/arama?isbn={isbn}",
    ],
    containers: &[
        ".product-box",
        ".book-item",
        ".product-item",
        ".product-card",
        "[data-product]",
        ".search-item",
    ],
    titles: &[
        ".product-title a",
        ".productName a",
        ".book-title",
        ".title",
        "h3 a",
        ".name",
    ],
    authors: &[".product-author", ".writer", ".author", ".yazar"],
    publishers: &[".product-brand", ".publisher", ".yayinevi"],
};

/// BKM Kitap online bookstore.
pub struct BkmKitap {
    config: SiteConfig,
}

impl BkmKitap {
    /// Creates a new BKM Kitap scraper.
    pub fn new() -> Self {
        Self {
            config: SiteConfig {
                name: "BKM Kitap".to_string(),
                base_url: "https://www.bkmkitap.com".to_string(),
                ..Default::default()
            },
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for BkmKitap {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteScraper for BkmKitap {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        CATALOG.lookup(session, &self.config, isbn).await
    }
}
