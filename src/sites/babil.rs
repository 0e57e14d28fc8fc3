//! Babil.com scraper.

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
        "/arama?query={isbn}",
        "/search?q={isbn}",
        "/ara?k={isbn}",
    ],
    containers: &[
        ".product-item",
        ".book-item",
        ".product-card",
        ".book-card",
        "[data-product]",
        "[data-book]",
        ".search-result",
        ".result-item",
    ],
    titles: &[".product-title a", ".book-title", ".title", "h3 a", "h2 a", ".name"],
    authors: &[".product-author", ".author", ".yazar", ".writer"],
    publishers: &[".product-publisher", ".publisher", ".yayinevi"],
};

/// Babil online bookstore.
pub struct Babil {
    config: SiteConfig,
}

impl Babil {
    /// Creates a new Babil scraper.
    pub fn new() -> Self {
        Self {
            config: SiteConfig {
                name: "Babil".to_string(),
                base_url: "https://www.babil.com".to_string(),
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

impl Default for Babil {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SiteScraper for Babil {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        CATALOG.lookup(session, &self.config, isbn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSession;

    const RESULTS: &str = r#"
        <div class="search-list">
            <div class="product-item">
                <div class="product-title"><a href="/kitap/temiz-kod-p-12345">Temiz Kod</a></div>
                <div class="product-author">Robert C. Martin</div>
                <div class="product-publisher">Kodlab</div>
            </div>
        </div>
    "#;

    #[test]
    fn test_babil_new() {
        let babil = Babil::new();
        assert_eq!(babil.name(), "Babil");
        assert_eq!(babil.base_url(), "https://www.babil.com");
        assert!(babil.is_enabled());
    }

    #[test]
    fn test_babil_with_config() {
        let babil = Babil::new().with_config(SiteConfig {
            name: "Babil Mirror".to_string(),
            base_url: "https://mirror.babil.test".to_string(),
            ..Default::default()
        });
        assert_eq!(babil.name(), "Babil Mirror");
    }

    #[test]
    fn test_babil_parse_results() {
        let product = CATALOG
            .parse(RESULTS, "https://www.babil.com/kitap/arama?q=9786058")
            .unwrap()
            .unwrap();
        assert_eq!(product.title, "Temiz Kod");
        assert_eq!(product.author, "Robert C. Martin");
        assert_eq!(product.publisher, "Kodlab");
        assert_eq!(product.url, "https://www.babil.com/kitap/temiz-kod-p-12345");
    }

    #[tokio::test]
    async fn test_babil_lookup() {
        let session = FakeSession::empty().with_page("babil.com/kitap/arama?q=", RESULTS);
        let isbn = Isbn::parse("9786058000000").unwrap();
        let book = Babil::new()
            .lookup(&session, &isbn)
            .await
            .unwrap()
            .into_book()
            .unwrap();
        assert_eq!(book.title, "Temiz Kod");
        assert_eq!(book.isbn, "9786058000000");
        assert_eq!(book.source_site, "Babil");
        assert_eq!(session.renders(), 1);
    }
}
