//! Site scraper trait and configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::book::Lookup;
use crate::isbn::Isbn;
use crate::session::DriverSession;
use crate::Result;

/// Configuration for a retailer site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name of the site; also its registry key.
    pub name: String,
    /// Site root, e.g. `https://www.babil.com`.
    pub base_url: String,
    /// How long to wait for result markup to appear, in milliseconds.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_ms: u64,
    /// Whether the site is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_render_timeout() -> u64 {
    10_000
}

fn default_enabled() -> bool {
    true
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            render_timeout_ms: default_render_timeout(),
            enabled: default_enabled(),
        }
    }
}

/// Trait for implementing retailer scrapers.
///
/// `lookup` drives the borrowed session through the site's search flow and
/// returns [`Lookup::NotFound`] when the site does not list the ISBN. An
/// `Err` means the site or the browser failed unexpectedly.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Returns the site configuration.
    fn config(&self) -> &SiteConfig;

    /// Looks up one ISBN using the given session.
    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup>;

    /// Returns the site name.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Returns the site root URL.
    fn base_url(&self) -> &str {
        &self.config().base_url
    }

    /// Returns whether the site is enabled.
    fn is_enabled(&self) -> bool {
        self.config().enabled
    }
}
