//! Process memory sampling.

use memory_stats::memory_stats;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reports resident memory of the current process.
pub trait MemoryProbe: Send + Sync {
    /// Resident set size in megabytes, or `None` if the platform cannot tell.
    fn resident_mb(&self) -> Option<f64>;
}

/// Reads the real process memory through `memory-stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl MemoryProbe for ProcessMemory {
    fn resident_mb(&self) -> Option<f64> {
        memory_stats().map(|stats| stats.physical_mem as f64 / BYTES_PER_MB)
    }
}
