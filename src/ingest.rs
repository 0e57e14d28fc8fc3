//! Windowed reading and validation of ISBN input files.
//!
//! Sources hand rows to the caller one window at a time and stop reading as
//! soon as the caller breaks, so a run that hits the memory ceiling never
//! touches the rest of the file. Only the first column is read.

use std::fs::File;
use std::io::{BufReader, Read};
use std::mem;
use std::ops::ControlFlow;
use std::path::Path;

use calamine::{open_workbook, DataRef, Reader, Xlsx};
use tracing::{debug, info, warn};

use crate::bulk::BulkConfig;
use crate::isbn::Isbn;
use crate::memory::MemoryProbe;
use crate::progress::{Progress, ProgressSink};
use crate::{LookupError, Result};

/// A contiguous block of input rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// 1-based window number.
    pub index: usize,
    /// Rows covered, including rows with an empty first cell and blank
    /// lines between data rows. Trailing blank rows are not counted.
    pub rows: usize,
    /// Non-empty first-column values, trimmed.
    pub values: Vec<String>,
}

/// Callback receiving each window; `Break` stops the source.
pub type WindowVisitor<'a> = dyn FnMut(Window) -> ControlFlow<()> + 'a;

/// A tabular input read window by window.
///
/// Sources are `Send` so a bulk run can read them off the async runtime.
pub trait RowSource: Send {
    /// Feeds windows of `chunk_size` rows to `visit` until the input ends or
    /// `visit` breaks.
    fn for_each_window(&mut self, chunk_size: usize, visit: &mut WindowVisitor<'_>) -> Result<()>;
}

/// Opens `path` as `.xlsx`, or as headerless CSV for any other extension.
pub fn open_source(path: &Path) -> Result<Box<dyn RowSource>> {
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));

    if is_xlsx {
        Ok(Box::new(XlsxSource::open(path)?))
    } else {
        Ok(Box::new(CsvSource::open(path)?))
    }
}

/// Cuts a row stream into windows.
struct Windower<'v, 'a> {
    chunk_size: usize,
    index: usize,
    start: usize,
    end: usize,
    values: Vec<String>,
    visit: &'v mut WindowVisitor<'a>,
}

impl<'v, 'a> Windower<'v, 'a> {
    fn new(chunk_size: usize, visit: &'v mut WindowVisitor<'a>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            index: 0,
            start: 0,
            end: 0,
            values: Vec::new(),
            visit,
        }
    }

    /// Marks row `row` (0-based) as present, emitting every window it has
    /// moved past.
    fn row(&mut self, row: usize) -> ControlFlow<()> {
        while row >= self.start + self.chunk_size {
            self.emit(self.chunk_size)?;
        }
        self.end = self.end.max(row + 1);
        ControlFlow::Continue(())
    }

    fn value(&mut self, value: String) {
        self.values.push(value);
    }

    fn finish(mut self) -> ControlFlow<()> {
        if self.end > self.start {
            let rows = self.end - self.start;
            self.emit(rows)?;
        }
        ControlFlow::Continue(())
    }

    fn emit(&mut self, rows: usize) -> ControlFlow<()> {
        self.index += 1;
        self.start += self.chunk_size;
        let window = Window {
            index: self.index,
            rows,
            values: mem::take(&mut self.values),
        };
        (self.visit)(window)
    }
}

/// Headerless CSV (or one-ISBN-per-line text) input.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
}

impl CsvSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self { reader }
    }
}

impl<R: Read + Send> RowSource for CsvSource<R> {
    fn for_each_window(&mut self, chunk_size: usize, visit: &mut WindowVisitor<'_>) -> Result<()> {
        let mut windows = Windower::new(chunk_size, visit);
        let mut record = csv::StringRecord::new();
        let mut next_row = 0;

        while self
            .reader
            .read_record(&mut record)
            .map_err(|e| LookupError::Spreadsheet(e.to_string()))?
        {
            // the reader skips blank lines; the line number keeps them counted
            let row = record
                .position()
                .map(|pos| (pos.line() as usize).saturating_sub(1))
                .unwrap_or(next_row)
                .max(next_row);
            if windows.row(row).is_break() {
                return Ok(());
            }
            if let Some(value) = record.get(0).filter(|v| !v.is_empty()) {
                windows.value(value.to_string());
            }
            next_row = row + 1;
        }

        let _ = windows.finish();
        Ok(())
    }
}

/// First worksheet of an `.xlsx` workbook, read cell by cell.
pub struct XlsxSource {
    workbook: Xlsx<BufReader<File>>,
    sheet: String,
}

impl XlsxSource {
    pub fn open(path: &Path) -> Result<Self> {
        let workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| LookupError::Spreadsheet(format!("{}: {}", path.display(), e)))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LookupError::Spreadsheet(format!("{}: no worksheet", path.display())))?;
        Ok(Self { workbook, sheet })
    }
}

impl RowSource for XlsxSource {
    fn for_each_window(&mut self, chunk_size: usize, visit: &mut WindowVisitor<'_>) -> Result<()> {
        let mut cells = self
            .workbook
            .worksheet_cells_reader(&self.sheet)
            .map_err(|e| LookupError::Spreadsheet(e.to_string()))?;
        let mut windows = Windower::new(chunk_size, visit);

        while let Some(cell) = cells
            .next_cell()
            .map_err(|e| LookupError::Spreadsheet(e.to_string()))?
        {
            let (row, col) = cell.get_position();
            if windows.row(row as usize).is_break() {
                return Ok(());
            }
            if col == 0 {
                if let Some(value) = cell_text(cell.get_value()) {
                    windows.value(value);
                }
            }
        }

        let _ = windows.finish();
        Ok(())
    }
}

fn cell_text(value: &DataRef<'_>) -> Option<String> {
    let text = match value {
        DataRef::String(s) => s.trim().to_string(),
        DataRef::SharedString(s) => s.trim().to_string(),
        DataRef::Int(i) => i.to_string(),
        // ISBNs typed as numbers come back as floats
        DataRef::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataRef::Float(f) => f.to_string(),
        DataRef::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Outcome of reading and validating an input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Rows read, including rows with an empty first cell.
    pub total_rows: usize,
    /// Windows processed.
    pub windows: usize,
    /// Valid ISBNs in input order.
    pub valid: Vec<Isbn>,
    /// Number of rejected values.
    pub invalid_count: usize,
    /// The first rejected values, as found in the input.
    pub invalid_sample: Vec<String>,
    /// Reading stopped at the memory ceiling; the rest of the input was skipped.
    pub stopped_early: bool,
    pub memory_start_mb: Option<f64>,
    pub memory_end_mb: Option<f64>,
}

impl IngestReport {
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }
}

/// Reads `source` window by window, validating each first-column value.
///
/// After every window the process memory is sampled and progress reported;
/// if `memory_limit_mb` is exceeded, reading stops and the report is marked
/// `stopped_early`. Every `reclaim_every` windows the working buffers are
/// shrunk.
pub fn ingest(
    source: &mut dyn RowSource,
    config: &BulkConfig,
    probe: &dyn MemoryProbe,
    progress: &dyn ProgressSink,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        memory_start_mb: probe.resident_mb(),
        ..Default::default()
    };
    if let Some(mb) = report.memory_start_mb {
        info!("Memory before ingest: {:.1} MB", mb);
    }

    source.for_each_window(config.chunk_size, &mut |window| {
        report.windows += 1;
        report.total_rows += window.rows;
        let values = window.values.len();

        for value in window.values {
            match Isbn::parse(&value) {
                Ok(isbn) => report.valid.push(isbn),
                Err(e) => {
                    debug!("Invalid ISBN '{}': {}", value, e);
                    report.invalid_count += 1;
                    if report.invalid_sample.len() < config.invalid_sample {
                        report.invalid_sample.push(value);
                    }
                }
            }
        }

        let memory = probe.resident_mb();
        report.memory_end_mb = memory;
        info!(
            "Window {} read: {} rows, {} values",
            window.index, window.rows, values
        );
        progress.report(&Progress::ingest(report.total_rows, memory));

        if let (Some(limit), Some(mb)) = (config.memory_limit_mb, memory) {
            if mb > limit as f64 {
                warn!(
                    "Memory limit exceeded ({:.1} MB > {} MB), stopping after window {}",
                    mb, limit, window.index
                );
                report.stopped_early = true;
                return ControlFlow::Break(());
            }
        }

        if config.reclaim_every > 0 && window.index % config.reclaim_every == 0 {
            report.valid.shrink_to_fit();
            report.invalid_sample.shrink_to_fit();
            debug!("Reclaimed buffers after window {}", window.index);
        }

        ControlFlow::Continue(())
    })?;

    if report.memory_end_mb.is_none() {
        report.memory_end_mb = probe.resident_mb();
    }
    if report.invalid_count > 0 {
        warn!(
            "{} invalid ISBNs (sample: {})",
            report.invalid_count,
            report.invalid_sample.join(", ")
        );
    }
    info!(
        "Ingest finished: {} rows, {} valid, {} invalid",
        report.total_rows,
        report.valid.len(),
        report.invalid_count
    );
    Ok(report)
}
