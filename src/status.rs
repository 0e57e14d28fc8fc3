//! Reachability check for registered sites.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tracing::debug;

use crate::registry::ScraperRegistry;
use crate::Result;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; isbn-lookup/0.3)";
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Reachability of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteStatus {
    /// The site answered with a success or redirect status.
    Active,
    /// The site answered with an error status.
    Inactive(u16),
    /// The request itself failed.
    Error(String),
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive(code) => write!(f, "inactive (HTTP {})", code),
            Self::Error(e) => write!(f, "error ({})", e),
        }
    }
}

/// Status of one registered site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub name: String,
    pub base_url: String,
    pub status: SiteStatus,
}

/// Sends `HEAD` requests to site roots.
pub struct StatusChecker {
    client: Client,
}

impl StatusChecker {
    /// Creates a checker with a short request timeout.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(CHECK_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Creates a checker with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Checks one URL.
    pub async fn check(&self, url: &str) -> SiteStatus {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("HEAD {} -> {}", url, status);
                if status.is_success() || status.is_redirection() {
                    SiteStatus::Active
                } else {
                    SiteStatus::Inactive(status.as_u16())
                }
            }
            Err(e) => SiteStatus::Error(e.to_string()),
        }
    }

    /// Checks every registered site concurrently; reports keep registration
    /// order.
    pub async fn check_sites(&self, registry: &ScraperRegistry) -> Vec<SiteReport> {
        let checks = registry.iter().map(|registration| async move {
            let scraper = registration.create();
            let base_url = scraper.base_url().to_string();
            let status = self.check(&base_url).await;
            SiteReport {
                name: registration.name().to_string(),
                base_url,
                status,
            }
        });
        join_all(checks).await
    }
}
