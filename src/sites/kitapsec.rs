//! Kitapsec.com scraper.

use async_trait::async_trait;

use super::catalog::Catalog;
use crate::book::Lookup;
use crate::isbn::Isbn;
use crate::session::DriverSession;
use crate::site::{SiteConfig, SiteScraper};
use crate::Result;

const CATALOG: Catalog = Catalog {
    search_paths: &["/Arama/index.php?a={isbn}", "/arama?q={isbn}", "/search?q={isbn}"],
    containers: &[
        ".Ks_UrunSatir",
        ".product-item",
        ".book-item",
        ".product-card",
        ".search-result",
    ],
    titles: &[".img-baslik a", ".Ks_UrunAdi a", ".product-title a", ".title", "h3 a", ".name"],
    authors: &[".yazar", ".Ks_Yazar", ".product-author", ".author"],
    publishers: &[".yayinevi", ".Ks_Yayinevi", ".publisher"],
};

/// Kitapsec online bookstore.
pub struct Kitapsec {
    config: SiteConfig,
}

impl Kitapsec {
    /// Creates a new Kitapsec scraper.
    pub fn new() -> Self {
        Self {
            config: SiteConfig {
                name: "Kitapsec".to_string(),
                base_url: "https://www.kitapsec.com".to_string(),
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

impl Default for Kitapsec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteScraper for Kitapsec {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        CATALOG.lookup(session, &self.config, isbn).await
    }
}
