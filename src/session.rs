//! Driver session abstraction.
//!
//! A driver session is one browser-automation instance that can render a page.
//! Sessions are created by a [`SessionFactory`] and handed out by the
//! [`DriverPool`](crate::DriverPool); site scrapers only ever see a borrowed
//! `&dyn DriverSession`.

use async_trait::async_trait;

use crate::Result;

/// Strategy for waiting until a rendered page has settled.
#[derive(Debug, Clone, Default)]
pub enum WaitStrategy {
    /// Wait for the page load event only.
    #[default]
    Load,
    /// Wait until a CSS selector matches an element on the page.
    Selector {
        /// CSS selector to wait for.
        css: String,
        /// Maximum time to wait in milliseconds before giving up.
        timeout_ms: u64,
    },
    /// Wait a fixed delay after the page load event.
    Delay {
        /// Milliseconds to wait after page load.
        ms: u64,
    },
}

impl WaitStrategy {
    /// Wait for `css`, bounded by `timeout_ms`.
    pub fn selector(css: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Selector {
            css: css.into(),
            timeout_ms,
        }
    }
}

/// One browser-automation instance.
///
/// `render` navigates to `url`, waits according to `wait` and returns the
/// rendered HTML. A session may be left on any page afterwards; the next
/// caller always navigates first.
#[async_trait]
pub trait DriverSession: Send + Sync {
    /// Renders `url` and returns the resulting document.
    async fn render(&self, url: &str, wait: &WaitStrategy) -> Result<String>;

    /// Releases the underlying browser resources.
    async fn shutdown(&mut self) {}
}

/// Creates new driver sessions on demand.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Launches a fresh session.
    async fn create(&self) -> Result<Box<dyn DriverSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_strategy_default() {
        assert!(matches!(WaitStrategy::default(), WaitStrategy::Load));
    }

    #[test]
    fn test_wait_strategy_selector() {
        match WaitStrategy::selector(".product-item", 5000) {
            WaitStrategy::Selector { css, timeout_ms } => {
                assert_eq!(css, ".product-item");
                assert_eq!(timeout_ms, 5000);
            }
            other => panic!("Expected Selector, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_strategy_delay_debug() {
        let debug = format!("{:?}", WaitStrategy::Delay { ms: 2000 });
        assert!(debug.contains("Delay"));
        assert!(debug.contains("2000"));
    }

    #[tokio::test]
    async fn test_session_trait_object() {
        struct Static(&'static str);

        #[async_trait]
        impl DriverSession for Static {
            async fn render(&self, _url: &str, _wait: &WaitStrategy) -> Result<String> {
                Ok(self.0.to_string())
            }
        }

        let mut session: Box<dyn DriverSession> = Box::new(Static("<html></html>"));
        let html = session
            .render("https://example.com", &WaitStrategy::Load)
            .await
            .unwrap();
        assert_eq!(html, "<html></html>");
        session.shutdown().await;
    }
}
