//! Shared search-and-parse flow for retailer catalogue pages.
//!
//! A retailer is described by a table of candidate search routes and
//! priority-ordered CSS selectors. The first product card that yields a
//! title wins.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::book::{Book, Lookup};
use crate::isbn::Isbn;
use crate::session::{DriverSession, WaitStrategy};
use crate::site::SiteConfig;
use crate::{LookupError, Result};

/// Search routes and selectors for one retailer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Catalog {
    /// Search paths relative to the base URL; `{isbn}` is substituted.
    pub search_paths: &'static [&'static str],
    /// Product card selectors, most specific first.
    pub containers: &'static [&'static str],
    pub titles: &'static [&'static str],
    pub authors: &'static [&'static str],
    pub publishers: &'static [&'static str],
}

/// Fields read from one product card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Product {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub url: String,
}

impl Product {
    fn into_book(self, isbn: &Isbn, site: &str) -> Book {
        Book::new(isbn.as_str(), self.title)
            .with_author(self.author)
            .with_publisher(self.publisher)
            .with_site(site)
            .with_url(self.url)
    }
}

impl Catalog {
    /// Candidate search URLs in try order.
    pub fn search_urls(&self, base_url: &str, isbn: &Isbn) -> Vec<String> {
        let base = base_url.trim_end_matches('/');
        self.search_paths
            .iter()
            .map(|path| format!("{}{}", base, path.replace("{isbn}", isbn.as_str())))
            .collect()
    }

    /// Renders each candidate search URL until one shows a product.
    ///
    /// Fails only if no candidate could be rendered at all.
    pub async fn lookup(
        &self,
        session: &dyn DriverSession,
        config: &SiteConfig,
        isbn: &Isbn,
    ) -> Result<Lookup> {
        let wait = WaitStrategy::selector(self.containers.join(", "), config.render_timeout_ms);
        let mut last_error = None;
        let mut rendered = false;

        for url in self.search_urls(&config.base_url, isbn) {
            let html = match session.render(&url, &wait).await {
                Ok(html) => html,
                Err(e) => {
                    debug!("{}: failed to render {}: {}", config.name, url, e);
                    last_error = Some(e);
                    continue;
                }
            };
            rendered = true;

            if let Some(product) = self.parse(&html, &url)? {
                return Ok(Lookup::Found(product.into_book(isbn, &config.name)));
            }
        }

        match last_error {
            Some(e) if !rendered => Err(e),
            _ => Ok(Lookup::NotFound),
        }
    }

    /// Reads the first product card with a non-empty title.
    pub fn parse(&self, html: &str, page_url: &str) -> Result<Option<Product>> {
        let document = Html::parse_document(html);
        let titles = parse_selectors(self.titles)?;
        let authors = parse_selectors(self.authors)?;
        let publishers = parse_selectors(self.publishers)?;
        let link = parse_selector("a[href]")?;

        for container in parse_selectors(self.containers)? {
            for card in document.select(&container) {
                let title = first_text(&card, &titles);
                if title.is_empty() {
                    continue;
                }

                let url = card
                    .select(&link)
                    .filter_map(|a| a.value().attr("href"))
                    .find_map(|href| resolve(page_url, href))
                    .unwrap_or_else(|| page_url.to_string());

                return Ok(Some(Product {
                    title,
                    author: first_text(&card, &authors),
                    publisher: first_text(&card, &publishers),
                    url,
                }));
            }
        }

        Ok(None)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| LookupError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

fn parse_selectors(list: &[&str]) -> Result<Vec<Selector>> {
    list.iter().map(|css| parse_selector(css)).collect()
}

fn first_text(card: &ElementRef<'_>, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .flat_map(|selector| card.select(selector))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn resolve(page_url: &str, href: &str) -> Option<String> {
    if href.starts_with("javascript:") || href.starts_with('#') {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
