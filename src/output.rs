//! Result file writing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::book::{or_placeholder, NOT_FOUND};
use crate::search::SearchOutcome;
use crate::{LookupError, Result};

/// Column headers of every result file.
pub const HEADERS: [&str; 5] = ["ISBN", "Title", "Author", "Publisher", "Source URL"];

const SHEET_NAME: &str = "Results";
const COLUMN_WIDTHS: [f64; 5] = [20.0, 40.0, 30.0, 30.0, 40.0];

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub url: String,
}

impl ResultRow {
    /// Builds a row, filling every missing field with the not-found marker.
    pub fn from_outcome(outcome: &SearchOutcome) -> Self {
        match outcome.book() {
            Some(book) => Self {
                isbn: book.isbn.clone(),
                title: or_placeholder(&book.title).to_string(),
                author: or_placeholder(&book.author).to_string(),
                publisher: or_placeholder(&book.publisher).to_string(),
                url: or_placeholder(&book.source_url).to_string(),
            },
            None => Self {
                isbn: outcome.isbn().to_string(),
                title: NOT_FOUND.to_string(),
                author: NOT_FOUND.to_string(),
                publisher: NOT_FOUND.to_string(),
                url: NOT_FOUND.to_string(),
            },
        }
    }

    fn fields(&self) -> [&str; 5] {
        [
            self.isbn.as_str(),
            self.title.as_str(),
            self.author.as_str(),
            self.publisher.as_str(),
            self.url.as_str(),
        ]
    }
}

/// Result file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    fn writer(self) -> Box<dyn ResultWriter> {
        match self {
            Self::Xlsx => Box::new(XlsxWriter),
            Self::Csv => Box::new(CsvWriter),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format '{}' (expected xlsx or csv)", other)),
        }
    }
}

/// Writes result rows to a file.
pub trait ResultWriter {
    fn write(&self, path: &Path, rows: &[ResultRow]) -> Result<()>;
}

/// Excel workbook with not-found cells highlighted in red.
pub struct XlsxWriter;

impl ResultWriter for XlsxWriter {
    fn write(&self, path: &Path, rows: &[ResultRow]) -> Result<()> {
        write_xlsx(path, rows).map_err(|e| LookupError::Output(format!("{}: {}", path.display(), e)))
    }
}

fn write_xlsx(path: &Path, rows: &[ResultRow]) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let missing = Format::new()
        .set_background_color(Color::RGB(0xFFC7CE))
        .set_font_color(Color::RGB(0x9C0006));

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }
    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, value) in row.fields().iter().enumerate() {
            if col > 0 && *value == NOT_FOUND {
                sheet.write_string_with_format(r, col as u16, *value, &missing)?;
            } else {
                sheet.write_string(r, col as u16, *value)?;
            }
        }
    }

    workbook.save(path)
}

/// Plain CSV with a header line.
pub struct CsvWriter;

impl ResultWriter for CsvWriter {
    fn write(&self, path: &Path, rows: &[ResultRow]) -> Result<()> {
        let output = |e: csv::Error| LookupError::Output(format!("{}: {}", path.display(), e));
        let mut writer = csv::Writer::from_path(path).map_err(output)?;
        writer.write_record(HEADERS).map_err(output)?;
        for row in rows {
            writer.write_record(row.fields()).map_err(output)?;
        }
        writer
            .flush()
            .map_err(|e| LookupError::Output(format!("{}: {}", path.display(), e)))
    }
}

/// First of `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... that does not exist.
pub fn next_available_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, extension));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Writes `rows` under a fresh name in `dir` and returns the path used.
pub fn write_results(
    dir: &Path,
    stem: &str,
    format: OutputFormat,
    rows: &[ResultRow],
) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(LookupError::Output(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let path = next_available_path(dir, stem, format.extension());
    format.writer().write(&path, rows)?;
    info!("Wrote {} result rows to {}", rows.len(), path.display());
    Ok(path)
}
