//! Configuration file loading.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```toml
//! [cache]
//! max_size = 1000
//! ttl_secs = 3600
//!
//! [pool]
//! size = 2
//! headless = true
//!
//! [bulk]
//! chunk_size = 1000
//! memory_limit_mb = 2048
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bulk::BulkConfig;
use crate::cache::CacheConfig;
use crate::pool::PoolConfig;
use crate::search::SearchConfig;
use crate::{LookupError, Result};

/// All settings, grouped by component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
}

impl Config {
    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| LookupError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
            .map_err(|e| LookupError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LookupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would stall or disable a component.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.pool.size == 0, "pool.size must be at least 1"),
            (self.cache.max_size == 0, "cache.max_size must be at least 1"),
            (
                self.cache.cleanup_interval_secs == 0,
                "cache.cleanup_interval_secs must be at least 1",
            ),
            (self.bulk.chunk_size == 0, "bulk.chunk_size must be at least 1"),
            (self.search.workers == 0, "search.workers must be at least 1"),
            (
                self.search.acquire_attempts == 0,
                "search.acquire_attempts must be at least 1",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(LookupError::Config(message.to_string())),
            None => Ok(()),
        }
    }
}
