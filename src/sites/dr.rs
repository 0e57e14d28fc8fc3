//! D&R (dr.com.tr) scraper.

use async_trait::async_trait;

use super::catalog::Catalog;
use crate::book::Lookup;
use crate::isbn::Isbn;
use crate::session::DriverSession;
use crate::site::{SiteConfig, SiteScraper};
use crate::Result;

const CATALOG: Catalog = Catalog {
    search_paths: &[
        "/kitap/arama?q={isbn}",
        "/search?q={isbn}",
        "/arama?query={isbn}",
        "/Kitap?Isbn={isbn}",
    ],
    containers: &[
        ".prd-item",
        ".product-item",
        ".book-item",
        ".product-card",
        ".item-card",
        "[data-product-id]",
        "[data-book-id]",
        ".search-item",
        ".result-item",
    ],
    titles: &[
        ".prd-name a",
        ".prd-name",
        ".product-title a",
        ".book-title",
        ".title",
        "h3 a",
        "h2 a",
        ".name",
    ],
    authors: &[".prd-author", ".product-author", ".author", ".yazar", ".writer"],
    publishers: &[".prd-publisher", ".publisher", ".yayinevi"],
};

/// D&R bookstore chain.
pub struct Dr {
    config: SiteConfig,
}

impl Dr {
    /// Creates a new D&R scraper.
    pub fn new() -> Self {
        Self {
            config: SiteConfig {
                name: "D&R".to_string(),
                base_url: "https://www.dr.com.tr".to_string(),
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

impl Default for Dr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteScraper for Dr {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        CATALOG.lookup(session, &self.config, isbn).await
    }
}
