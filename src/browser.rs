//! Headless Chrome sessions over the Chrome DevTools Protocol.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! Every [`BrowserSession`] owns its own browser process; the
//! [`DriverPool`](crate::DriverPool) bounds how many exist at once.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pool::PoolConfig;
use crate::session::{DriverSession, SessionFactory, WaitStrategy};
use crate::{LookupError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Launches Chrome processes for the driver pool.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: PoolConfig,
}

impl ChromeLauncher {
    /// Creates a launcher from the pool configuration.
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();

        if self.config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let (chrome, origin) = crate::browser_setup::find_chrome(&self.config)?;
        debug!("Launching Chrome from {}: {}", origin, chrome.display());
        builder = builder.chrome_executable(chrome);

        // --headless=new puts "HeadlessChrome" into the UA, which retailers block
        builder = builder.arg(format!("--user-agent={}", USER_AGENT));

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg("--no-first-run")
            .arg("--lang=tr-TR");

        for arg in &self.config.launch_args {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| LookupError::Browser(format!("Failed to build browser config: {}", e)))
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    async fn create(&self) -> Result<Box<dyn DriverSession>> {
        let browser_config = self.browser_config()?;

        debug!("Launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| LookupError::SessionCreate(format!("Failed to launch browser: {}", e)))?;

        // Spawn the CDP event handler as a background task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
        });

        Ok(Box::new(BrowserSession {
            browser,
            handler: Some(handler),
        }))
    }
}

/// One Chrome process driven over CDP.
///
/// Each `render()` call opens a new tab, navigates, waits according to the
/// given [`WaitStrategy`], extracts the rendered HTML and closes the tab.
pub struct BrowserSession {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
}

#[async_trait]
impl DriverSession for BrowserSession {
    async fn render(&self, url: &str, wait: &WaitStrategy) -> Result<String> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| LookupError::Browser(format!("Failed to open tab: {}", e)))?;

        match wait {
            WaitStrategy::Load => {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| LookupError::Browser(format!("Navigation wait failed: {}", e)))?;
            }
            WaitStrategy::Selector { css, timeout_ms } => {
                // A missing selector is not an error: "no results" pages lack
                // the product markup and the scraper reports NotFound.
                let found = tokio::time::timeout(Duration::from_millis(*timeout_ms), async {
                    page.find_element(css.as_str()).await
                })
                .await;
                if let Err(_) | Ok(Err(_)) = found {
                    debug!(
                        "Selector '{}' not found within {}ms on {}",
                        css, timeout_ms, url
                    );
                }
            }
            WaitStrategy::Delay { ms } => {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| LookupError::Browser(format!("Navigation wait failed: {}", e)))?;
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }

        let html = page
            .content()
            .await
            .map_err(|e| LookupError::Browser(format!("Failed to get page content: {}", e)))?;

        // Close the tab (best-effort, don't fail the render)
        if let Err(e) = page.close().await {
            warn!("Failed to close browser tab: {}", e);
        }

        Ok(html)
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("Browser session shut down");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
