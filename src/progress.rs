//! Progress reporting for long-running lookups.
//!
//! Frontends implement [`ProgressSink`] to surface status to users. Any
//! `Fn(&Progress)` closure is a sink.

use std::fmt;

/// Stage of a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading and validating input windows.
    Ingest,
    /// Looking up validated ISBNs.
    Search,
}

/// One progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub phase: Phase,
    /// Rows read (ingest) or ISBNs completed (search) so far.
    pub processed: usize,
    /// Known total, if any. Ingest does not know the row count up front.
    pub total: Option<usize>,
    /// Resident memory at the time of the update.
    pub memory_mb: Option<f64>,
}

impl Progress {
    pub fn ingest(processed: usize, memory_mb: Option<f64>) -> Self {
        Self {
            phase: Phase::Ingest,
            processed,
            total: None,
            memory_mb,
        }
    }

    pub fn search(processed: usize, total: usize) -> Self {
        Self {
            phase: Phase::Search,
            processed,
            total: Some(total),
            memory_mb: None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Ingest => "read",
            Phase::Search => "searched",
        };
        match self.total {
            Some(total) => write!(f, "{} {}/{}", phase, self.processed, total)?,
            None => write!(f, "{} {}", phase, self.processed)?,
        }
        if let Some(mb) = self.memory_mb {
            write!(f, " ({:.1} MB)", mb)?;
        }
        Ok(())
    }
}

/// Receives progress updates.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn report(&self, progress: &Progress) {
        self(progress)
    }
}

/// A no-op progress sink.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _progress: &Progress) {}
}
