//! Bulk lookup of ISBN files.
//!
//! A run reads the input window by window, searches every valid ISBN in
//! input order, and writes one result row per ISBN. Per-ISBN failures become
//! not-found rows; a failed write keeps the rows in the summary so only the
//! write needs retrying.

use std::fmt;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{error, info, warn};

use crate::ingest::{self, IngestReport, RowSource};
use crate::memory::{MemoryProbe, ProcessMemory};
use crate::output::{self, OutputFormat, ResultRow};
use crate::progress::{Progress, ProgressSink};
use crate::search::Searcher;
use crate::Result;

/// Settings for bulk runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Rows per window.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Resident memory ceiling in MB; `None` disables the check.
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,
    /// Shrink working buffers every this many windows; 0 disables.
    #[serde(default = "default_reclaim_every")]
    pub reclaim_every: usize,
    /// How many rejected values to keep for the report.
    #[serde(default = "default_invalid_sample")]
    pub invalid_sample: usize,
    /// Result file name without extension.
    #[serde(default = "default_output_stem")]
    pub output_stem: String,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_reclaim_every() -> usize {
    5
}

fn default_invalid_sample() -> usize {
    10
}

fn default_output_stem() -> String {
    "isbn_results".to_string()
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            memory_limit_mb: None,
            reclaim_every: default_reclaim_every(),
            invalid_sample: default_invalid_sample(),
            output_stem: default_output_stem(),
        }
    }
}

/// Outcome of a bulk run.
#[derive(Debug, Clone)]
pub struct BulkSummary {
    pub ingest: IngestReport,
    /// One row per searched ISBN, in input order.
    pub rows: Vec<ResultRow>,
    pub found: usize,
    pub not_found: usize,
    pub elapsed: Duration,
    /// Not every input row was searched (memory ceiling or pool shutdown).
    pub partial: bool,
    /// Where the results were written.
    pub output: Option<PathBuf>,
    /// Why the last write failed, if it did.
    pub write_error: Option<String>,
}

impl BulkSummary {
    /// Whether a result file exists for this run.
    pub fn is_written(&self) -> bool {
        self.output.is_some()
    }
}

impl fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        writeln!(f, "Rows read:     {}", self.ingest.total_rows)?;
        writeln!(f, "Valid ISBNs:   {}", self.ingest.valid_count())?;
        write!(f, "Invalid ISBNs: {}", self.ingest.invalid_count)?;
        if !self.ingest.invalid_sample.is_empty() {
            write!(f, " (e.g. {})", self.ingest.invalid_sample.join(", "))?;
        }
        writeln!(f)?;
        writeln!(f, "Found:         {}", self.found)?;
        writeln!(f, "Not found:     {}", self.not_found)?;
        writeln!(f, "Elapsed:       {}m {}s", secs / 60, secs % 60)?;
        if let (Some(start), Some(end)) = (self.ingest.memory_start_mb, self.ingest.memory_end_mb) {
            writeln!(f, "Memory:        {:.1} MB -> {:.1} MB", start, end)?;
        }
        if self.partial {
            writeln!(f, "Partial run:   yes")?;
        }
        match (&self.output, &self.write_error) {
            (Some(path), _) => write!(f, "Output:        {}", path.display()),
            (None, Some(e)) => write!(f, "Output:        not written ({})", e),
            (None, None) => write!(f, "Output:        not written"),
        }
    }
}

/// Runs input files through a [`Searcher`].
pub struct BulkPipeline {
    searcher: Arc<Searcher>,
    config: BulkConfig,
    probe: Arc<dyn MemoryProbe>,
}

impl BulkPipeline {
    /// Creates a pipeline sampling the real process memory.
    pub fn new(searcher: Arc<Searcher>, config: BulkConfig) -> Self {
        Self {
            searcher,
            config,
            probe: Arc::new(ProcessMemory),
        }
    }

    /// Replaces the memory probe.
    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Opens `input` and runs it; see [`run_source`](Self::run_source).
    pub async fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        format: OutputFormat,
        progress: &dyn ProgressSink,
    ) -> Result<BulkSummary> {
        info!("Starting bulk run for {}", input.display());
        let input = input.to_path_buf();
        let start = Instant::now();
        let report = self
            .read_input(move || ingest::open_source(&input), progress)
            .await?;
        self.finish(report, start, output_dir, format, progress).await
    }

    /// Ingests `source`, searches every valid ISBN and writes the results.
    ///
    /// Reading and writing happen on the blocking thread pool. Only an
    /// unreadable input is an `Err`. A failed write is recorded in the
    /// summary and can be retried with [`write_results`](Self::write_results).
    /// If the driver pool is closed while the run searches, the remaining
    /// ISBNs become not-found rows and a `_partial` file is written.
    pub async fn run_source(
        &self,
        source: Box<dyn RowSource>,
        output_dir: &Path,
        format: OutputFormat,
        progress: &dyn ProgressSink,
    ) -> Result<BulkSummary> {
        let start = Instant::now();
        let report = self.read_input(move || Ok(source), progress).await?;
        self.finish(report, start, output_dir, format, progress).await
    }

    /// Runs `open` and the ingest loop on a blocking thread, forwarding its
    /// progress updates to `progress`.
    async fn read_input<F>(&self, open: F, progress: &dyn ProgressSink) -> Result<IngestReport>
    where
        F: FnOnce() -> Result<Box<dyn RowSource>> + Send + 'static,
    {
        let (updates, mut received) = mpsc::unbounded_channel::<Progress>();
        let config = self.config.clone();
        let probe = Arc::clone(&self.probe);

        let reader = task::spawn_blocking(move || {
            let mut source = open()?;
            let forward = move |p: &Progress| {
                let _ = updates.send(p.clone());
            };
            ingest::ingest(source.as_mut(), &config, probe.as_ref(), &forward)
        });

        // ends when the reader drops its sender
        while let Some(update) = received.recv().await {
            progress.report(&update);
        }
        reader.await.map_err(io::Error::from)?
    }

    async fn finish(
        &self,
        report: IngestReport,
        start: Instant,
        output_dir: &Path,
        format: OutputFormat,
        progress: &dyn ProgressSink,
    ) -> Result<BulkSummary> {
        if report.valid.is_empty() {
            warn!("No valid ISBN in input");
        }

        let outcomes = self.searcher.search_many(report.valid.as_slice(), progress).await;
        let rows: Vec<ResultRow> = outcomes.iter().map(ResultRow::from_outcome).collect();
        let found = outcomes.iter().filter(|o| o.is_found()).count();

        let interrupted = self.searcher.pool().is_closed();
        if interrupted {
            warn!("Driver pool closed during bulk run; results are partial");
        }

        let mut summary = BulkSummary {
            partial: report.stopped_early || interrupted,
            ingest: report,
            not_found: rows.len() - found,
            rows,
            found,
            elapsed: start.elapsed(),
            output: None,
            write_error: None,
        };

        // a write failure is reported, not propagated
        let _ = self.write_results(&mut summary, output_dir, format).await;

        info!(
            "Bulk run finished: {} found, {} not found in {:?}",
            summary.found, summary.not_found, summary.elapsed
        );
        Ok(summary)
    }

    /// Writes the rows of `summary` into `output_dir` under a fresh name.
    ///
    /// Partial runs use the `<stem>_partial` name. On success the path is
    /// stored in the summary; on failure the error is stored and returned.
    pub async fn write_results(
        &self,
        summary: &mut BulkSummary,
        output_dir: &Path,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let stem = if summary.partial {
            format!("{}_partial", self.config.output_stem)
        } else {
            self.config.output_stem.clone()
        };

        let dir = output_dir.to_path_buf();
        let rows = mem::take(&mut summary.rows);
        let written = task::spawn_blocking(move || {
            let written = output::write_results(&dir, &stem, format, &rows);
            (rows, written)
        })
        .await;

        let result = match written {
            Ok((rows, written)) => {
                summary.rows = rows;
                written
            }
            Err(e) => Err(io::Error::from(e).into()),
        };

        match result {
            Ok(path) => {
                summary.output = Some(path.clone());
                summary.write_error = None;
                Ok(path)
            }
            Err(e) => {
                error!("Could not write results: {}", e);
                summary.write_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
