//! In-memory sessions and sites shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::book::{Book, Lookup};
use crate::isbn::Isbn;
use crate::session::{DriverSession, SessionFactory, WaitStrategy};
use crate::site::{SiteConfig, SiteScraper};
use crate::{LookupError, Result};

const EMPTY_PAGE: &str = "<html><body></body></html>";

/// Serves canned HTML for URLs containing a registered fragment.
pub(crate) struct FakeSession {
    pages: Vec<(String, String)>,
    renders: Arc<AtomicUsize>,
    shutdowns: Option<Arc<AtomicUsize>>,
    wedged: bool,
}

impl FakeSession {
    pub(crate) fn empty() -> Self {
        Self {
            pages: Vec::new(),
            renders: Arc::new(AtomicUsize::new(0)),
            shutdowns: None,
            wedged: false,
        }
    }

    /// A session whose browser hangs: neither rendering nor shutdown ever
    /// completes.
    pub(crate) fn wedged() -> Self {
        Self {
            wedged: true,
            ..Self::empty()
        }
    }

    pub(crate) fn with_page(mut self, url_fragment: &str, html: &str) -> Self {
        self.pages.push((url_fragment.to_string(), html.to_string()));
        self
    }

    pub(crate) fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverSession for FakeSession {
    async fn render(&self, url: &str, _wait: &WaitStrategy) -> Result<String> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.wedged {
            std::future::pending::<()>().await;
        }
        let html = self
            .pages
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, html)| html.clone())
            .unwrap_or_else(|| EMPTY_PAGE.to_string());
        Ok(html)
    }

    async fn shutdown(&mut self) {
        if self.wedged {
            std::future::pending::<()>().await;
        }
        if let Some(counter) = &self.shutdowns {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

type MakeSession = Box<dyn Fn(usize) -> Result<FakeSession> + Send + Sync>;

/// Builds fake sessions and counts launches and shutdowns.
pub(crate) struct FakeFactory {
    make: MakeSession,
    attempts: AtomicUsize,
    created: AtomicUsize,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub(crate) fn new<F>(make: F) -> Self
    where
        F: Fn(usize) -> Result<FakeSession> + Send + Sync + 'static,
    {
        Self {
            make: Box::new(make),
            attempts: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn create(&self) -> Result<Box<dyn DriverSession>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut session = (self.make)(attempt)?;
        session.shutdowns = Some(Arc::clone(&self.shutdowns));
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(session))
    }
}

#[derive(Clone)]
enum Behavior {
    Found(String),
    Missing,
    Fail,
    Render,
}

/// A site that answers without touching the session.
#[derive(Clone)]
pub(crate) struct StubSite {
    config: SiteConfig,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl StubSite {
    fn with_behavior(name: &str, behavior: Behavior) -> Self {
        Self {
            config: SiteConfig {
                name: name.to_string(),
                base_url: format!("https://{}.test", name.to_lowercase()),
                ..Default::default()
            },
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    pub(crate) fn found(name: &str, title: &str) -> Self {
        Self::with_behavior(name, Behavior::Found(title.to_string()))
    }

    pub(crate) fn missing(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Missing)
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Fail)
    }

    /// Renders its base URL through the session, then reports a miss.
    pub(crate) fn rendering(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Render)
    }

    pub(crate) fn counting(mut self, calls: &Arc<AtomicUsize>) -> Self {
        self.calls = Arc::clone(calls);
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SiteScraper for StubSite {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn lookup(&self, session: &dyn DriverSession, isbn: &Isbn) -> Result<Lookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Found(title) => Ok(Lookup::Found(
                Book::new(isbn.as_str(), title.as_str())
                    .with_author("Stub Author")
                    .with_publisher("Stub Press")
                    .with_site(self.name())
                    .with_url(format!("{}/book/{}", self.base_url(), isbn)),
            )),
            Behavior::Missing => Ok(Lookup::NotFound),
            Behavior::Fail => Err(LookupError::Browser("renderer crashed".to_string())),
            Behavior::Render => {
                session.render(self.base_url(), &WaitStrategy::Load).await?;
                Ok(Lookup::NotFound)
            }
        }
    }
}
