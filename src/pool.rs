//! Bounded pool of driver sessions.
//!
//! Each session is a full browser process, so the pool enforces a hard cap on
//! how many exist at once. Waiters are served in FIFO order by a fair
//! semaphore; sessions are created lazily on the first acquire that finds no
//! idle one, and creation failures do not shrink the pool.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::session::{DriverSession, SessionFactory};
use crate::{LookupError, Result};

/// Upper bound on a single session shutdown. A wedged browser is dropped
/// after this, which kills its process.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the driver pool and the browsers it launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of live sessions.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Whether to run browsers headless.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    #[serde(default)]
    pub chrome_path: Option<String>,
    /// Additional launch arguments for Chrome.
    #[serde(default)]
    pub launch_args: Vec<String>,
}

fn default_size() -> usize {
    2
}

fn default_headless() -> bool {
    true
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            headless: default_headless(),
            chrome_path: None,
            launch_args: Vec::new(),
        }
    }
}

struct Shared {
    idle: Mutex<Vec<Box<dyn DriverSession>>>,
    closed: AtomicBool,
    in_use: AtomicUsize,
}

impl Shared {
    fn idle(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn DriverSession>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn give_back(&self, session: Box<dyn DriverSession>) {
        // `closed` is only set while the idle lock is held, so a session
        // pushed here is always seen by `close`.
        let mut idle = self.idle();
        if self.closed.load(Ordering::Acquire) {
            drop(idle);
            shutdown_detached(session);
        } else {
            idle.push(session);
        }
    }
}

async fn shutdown_bounded(session: &mut dyn DriverSession) {
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, session.shutdown())
        .await
        .is_err()
    {
        warn!(
            "Driver session did not shut down within {:?}, dropping it",
            SHUTDOWN_TIMEOUT
        );
    }
}

fn shutdown_detached(mut session: Box<dyn DriverSession>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { shutdown_bounded(session.as_mut()).await });
        }
        // no runtime left; dropping the session kills the browser process
        Err(_) => drop(session),
    }
}

/// A bounded, FIFO-fair pool of driver sessions.
pub struct DriverPool {
    factory: Arc<dyn SessionFactory>,
    permits: Arc<Semaphore>,
    shared: Arc<Shared>,
    max_size: usize,
}

impl DriverPool {
    /// Creates a pool that launches at most `max_size` sessions through
    /// `factory`. No session is launched until the first acquire.
    pub fn new(factory: Arc<dyn SessionFactory>, max_size: usize) -> Self {
        Self {
            factory,
            permits: Arc::new(Semaphore::new(max_size)),
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                in_use: AtomicUsize::new(0),
            }),
            max_size,
        }
    }

    /// Waits until a session is free and checks it out.
    pub async fn acquire(&self) -> Result<PooledSession> {
        self.acquire_timeout(None).await
    }

    /// Like [`acquire`](Self::acquire), but gives up after `limit` if one is
    /// given.
    pub async fn acquire_timeout(&self, limit: Option<Duration>) -> Result<PooledSession> {
        if self.is_closed() {
            return Err(LookupError::PoolClosed);
        }

        let wait = Arc::clone(&self.permits).acquire_owned();
        let permit = match limit {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| LookupError::PoolTimeout(limit))?,
            None => wait.await,
        }
        .map_err(|_| LookupError::PoolClosed)?;

        if self.is_closed() {
            return Err(LookupError::PoolClosed);
        }

        let reused = self.shared.idle().pop();
        let session = match reused {
            Some(session) => session,
            None => {
                debug!("Launching new driver session");
                // on failure the permit drops here and the slot stays usable
                self.factory.create().await.map_err(|e| match e {
                    LookupError::SessionCreate(_) => e,
                    other => LookupError::SessionCreate(other.to_string()),
                })?
            }
        };

        self.shared.in_use.fetch_add(1, Ordering::AcqRel);
        Ok(PooledSession {
            session: Some(session),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Returns a session to the pool. Equivalent to dropping it.
    pub fn release(&self, session: PooledSession) {
        drop(session);
    }

    /// Shuts down every idle session and fails all current and future
    /// acquires. Sessions still checked out are shut down when released.
    ///
    /// Calling this more than once has no further effect.
    pub async fn close(&self) {
        let idle: Vec<_> = {
            let mut idle = self.shared.idle();
            if self.shared.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            idle.drain(..).collect()
        };
        self.permits.close();

        debug!("Closing driver pool ({} idle sessions)", idle.len());
        for mut session in idle {
            shutdown_bounded(session.as_mut()).await;
        }

        let in_use = self.in_use();
        if in_use > 0 {
            warn!(
                "Driver pool closed with {} sessions still checked out",
                in_use
            );
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of sessions currently checked out.
    pub fn in_use(&self) -> usize {
        self.shared.in_use.load(Ordering::Acquire)
    }

    /// Number of launched sessions waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.shared.idle().len()
    }

    /// Maximum number of sessions.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// A checked-out session.
///
/// Dropping it returns the session to the pool, so release happens on every
/// exit path including errors and cancellation.
pub struct PooledSession {
    session: Option<Box<dyn DriverSession>>,
    shared: Arc<Shared>,
    // released after the session is back in the idle list
    _permit: OwnedSemaphorePermit,
}

impl PooledSession {
    /// Shuts the session down instead of returning it, so the pool launches a
    /// fresh one next time. Used after the browser was left in a bad state.
    ///
    /// The shutdown runs on a background task; the pool slot is free as soon
    /// as this returns.
    pub fn discard(mut self) {
        if let Some(session) = self.session.take() {
            debug!("Discarding driver session");
            shutdown_detached(session);
        }
    }
}

impl Deref for PooledSession {
    type Target = dyn DriverSession;

    fn deref(&self) -> &Self::Target {
        match &self.session {
            Some(session) => session.as_ref(),
            // only `discard` and `drop` take the session, both consume self
            None => unreachable!("pooled session used after release"),
        }
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        self.shared.in_use.fetch_sub(1, Ordering::AcqRel);
        if let Some(session) = self.session.take() {
            self.shared.give_back(session);
        }
    }
}
