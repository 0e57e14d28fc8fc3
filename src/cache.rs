//! Bounded LRU cache with per-entry expiry.
//!
//! The map and the recency order live behind one lock so eviction order can
//! never disagree with the stored entries. Expired entries are dropped lazily
//! on access and by a periodic sweep (see [`LruTtlCache::spawn_cleanup`]).

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::book::Book;
use crate::isbn::Isbn;

/// Cache of successful lookups keyed by ISBN.
pub type ResultCache = LruTtlCache<Isbn, Book>;

/// Cache sizing and expiry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Entry lifetime in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Seconds between background sweeps of expired entries.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_max_size() -> usize {
    1000
}

fn default_ttl() -> u64 {
    3600
}

fn default_cleanup_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            ttl_secs: default_ttl(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
    stamp: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    // stamp -> key, oldest first
    recency: BTreeMap<u64, K>,
    next_stamp: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn touch(&mut self, key: &K) {
        let stamp = self.next_stamp;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.stamp);
            entry.stamp = stamp;
            self.recency.insert(stamp, key.clone());
            self.next_stamp += 1;
        }
    }

    fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.stamp);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// A size-bounded key/value store whose entries expire after a fixed TTL.
///
/// Reads refresh recency but never extend expiry; writes reset both.
#[derive(Debug)]
pub struct LruTtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_size: usize,
    ttl: Duration,
    cleanup_interval: Duration,
}

impl<K, V> LruTtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates an empty cache.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_stamp: 0,
            }),
            max_size: config.max_size,
            ttl: config.ttl(),
            cleanup_interval: config.cleanup_interval(),
        }
    }

    /// Returns a live value, refreshing its recency.
    ///
    /// An expired entry counts as a miss and is removed.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        let expired = inner.entries.get(key)?.is_expired(now);
        if expired {
            inner.remove(key);
            return None;
        }

        inner.touch(key);
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts or overwrites a value, evicting the least recently used entry
    /// when a new key would exceed the size bound.
    pub async fn put(&self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }

        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        if inner.remove(&key).is_none() && inner.entries.len() >= self.max_size {
            inner.evict_oldest();
        }

        let stamp = inner.next_stamp;
        inner.next_stamp += 1;
        inner.recency.insert(stamp, key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                expires_at: now + self.ttl,
                stamp,
            },
        );
    }

    /// Removes a key. Returns whether it was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().await.remove(key).is_some()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        let expired: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Age of a live entry; `None` once it has expired, swept or not.
    pub async fn age(&self, key: &K) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| now.duration_since(entry.inserted_at))
    }

    /// Number of stored entries, including ones that expired but were not
    /// swept yet.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes everything.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Maximum number of entries.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Starts the periodic sweep on the current runtime.
    ///
    /// The task holds only a weak reference and stops once the cache is
    /// dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.cleanup_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
            debug!("Cache cleanup task exited");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_size: usize, ttl_secs: u64) -> CacheConfig {
        CacheConfig {
            max_size,
            ttl_secs,
            cleanup_interval_secs: 60,
        }
    }

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_cache_config_deserialization_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_size": 5}"#).unwrap();
        assert_eq!(config.max_size, 5);
        assert_eq!(config.ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = LruTtlCache::new(&config(4, 60));
        let book = Book::new("9780134190440", "Example Book").with_site("Babil");
        cache.put("9780134190440".to_string(), book.clone()).await;
        assert_eq!(cache.get(&"9780134190440".to_string()).await, Some(book));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache: LruTtlCache<String, u32> = LruTtlCache::new(&config(4, 60));
        assert_eq!(cache.get(&"nope".to_string()).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = LruTtlCache::new(&config(4, 10));
        cache.put("k", 1).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get(&"k").await, Some(1));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get(&"k").await, None);
        // removed lazily on the miss
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_does_not_extend_expiry() {
        let cache = LruTtlCache::new(&config(4, 10));
        cache.put("k", 1).await;

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"k").await, Some(1));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.get(&"k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_expiry() {
        let cache = LruTtlCache::new(&config(4, 10));
        cache.put("k", 1).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k", 2).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"k").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = LruTtlCache::new(&config(3, 60));
        cache.put("a", 1).await;
        cache.put("b", 2).await;
        cache.put("c", 3).await;
        cache.put("d", 4).await;

        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get(&"a").await, None);
        assert_eq!(cache.get(&"b").await, Some(2));
        assert_eq!(cache.get(&"c").await, Some(3));
        assert_eq!(cache.get(&"d").await, Some(4));
    }

    #[tokio::test]
    async fn test_access_protects_from_eviction() {
        let cache = LruTtlCache::new(&config(3, 60));
        cache.put("a", 1).await;
        cache.put("b", 2).await;
        cache.put("c", 3).await;

        assert_eq!(cache.get(&"a").await, Some(1));
        cache.put("d", 4).await;

        assert_eq!(cache.get(&"a").await, Some(1));
        assert_eq!(cache.get(&"b").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_existing_key_does_not_evict() {
        let cache = LruTtlCache::new(&config(2, 60));
        cache.put("a", 1).await;
        cache.put("b", 2).await;
        cache.put("a", 10).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&"a").await, Some(10));
        assert_eq!(cache.get(&"b").await, Some(2));
    }

    #[tokio::test]
    async fn test_zero_capacity_stores_nothing() {
        let cache = LruTtlCache::new(&config(0, 60));
        cache.put("a", 1).await;
        assert_eq!(cache.get(&"a").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = LruTtlCache::new(&config(10, 5));
        cache.put("old1", 1).await;
        cache.put("old2", 2).await;
        tokio::time::advance(Duration::from_secs(4)).await;
        cache.put("fresh", 3).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired().await, 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"fresh").await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_cleanup_sweeps() {
        let cache = Arc::new(LruTtlCache::new(&CacheConfig {
            max_size: 10,
            ttl_secs: 5,
            cleanup_interval_secs: 30,
        }));
        let handle = cache.spawn_cleanup();

        cache.put("a", 1).await;
        cache.put("b", 2).await;
        assert_eq!(cache.len().await, 2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len().await, 0);

        drop(cache);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = LruTtlCache::new(&config(4, 60));
        cache.put("a", 1).await;
        cache.put("b", 2).await;
        assert!(cache.invalidate(&"a").await);
        assert!(!cache.invalidate(&"a").await);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_age() {
        let cache = LruTtlCache::new(&config(4, 60));
        cache.put("a", 1).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.age(&"a").await, Some(Duration::from_secs(3)));
        assert_eq!(cache.age(&"z").await, None);

        // expired but not swept yet
        tokio::time::advance(Duration::from_secs(58)).await;
        assert_eq!(cache.age(&"a").await, None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_puts_respect_bound() {
        let cache = Arc::new(LruTtlCache::new(&config(8, 60)));
        let mut handles = Vec::new();
        for worker in 0..4u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..50u32 {
                    cache.put(worker * 1000 + i, i).await;
                    let _ = cache.get(&(worker * 1000 + i / 2)).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len().await, 8);
    }
}
