//! Name to scraper-factory registry.
//!
//! Sites are tried in registration order, so registering a name twice is
//! rejected rather than silently reordering or replacing an earlier entry.

use std::fmt;
use std::sync::Arc;

use crate::site::SiteScraper;
use crate::{LookupError, Result};

/// Builds a fresh scraper instance for one site.
pub type ScraperFactory = Arc<dyn Fn() -> Box<dyn SiteScraper> + Send + Sync>;

/// One registered site.
#[derive(Clone)]
pub struct SiteRegistration {
    name: String,
    factory: ScraperFactory,
}

impl SiteRegistration {
    /// Site name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds a scraper for this site.
    pub fn create(&self) -> Box<dyn SiteScraper> {
        (self.factory)()
    }
}

impl fmt::Debug for SiteRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of site scrapers.
#[derive(Debug, Clone, Default)]
pub struct ScraperRegistry {
    sites: Vec<SiteRegistration>,
}

impl ScraperRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a site under `name`.
    ///
    /// Fails with [`LookupError::DuplicateSite`] if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn SiteScraper> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(LookupError::DuplicateSite(name));
        }
        self.sites.push(SiteRegistration {
            name,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Registered names in try order.
    pub fn names_in_order(&self) -> Vec<&str> {
        self.sites.iter().map(|site| site.name()).collect()
    }

    /// Builds a scraper for `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn SiteScraper>> {
        self.sites
            .iter()
            .find(|site| site.name == name)
            .map(SiteRegistration::create)
            .ok_or_else(|| LookupError::UnknownSite(name.to_string()))
    }

    /// Iterates over registrations in try order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteRegistration> {
        self.sites.iter()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.sites.iter().any(|site| site.name == name)
    }

    /// Number of registered sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no site is registered.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
