//! Error types for the lookup library.

use std::time::Duration;

use thiserror::Error;

use crate::isbn::ValidationError;

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Errors that can occur during lookup operations.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The input is not a well-formed ISBN.
    #[error("Invalid ISBN: {0}")]
    InvalidIsbn(#[from] ValidationError),

    /// Browser automation failed (launch, navigation, rendering).
    #[error("Browser error: {0}")]
    Browser(String),

    /// A rendered page could not be parsed.
    #[error("Failed to parse page: {0}")]
    Parse(String),

    /// The driver pool has been closed.
    #[error("Driver pool is closed")]
    PoolClosed,

    /// No driver session became free in time.
    #[error("No driver session available within {0:?}")]
    PoolTimeout(Duration),

    /// A new driver session could not be created.
    #[error("Failed to create driver session: {0}")]
    SessionCreate(String),

    /// A site with this name is already registered.
    #[error("Site '{0}' is already registered")]
    DuplicateSite(String),

    /// No site with this name is registered.
    #[error("Unknown site '{0}'")]
    UnknownSite(String),

    /// The input spreadsheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The result file could not be written.
    #[error("Failed to write results: {0}")]
    Output(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// Whether the error came from the driver pool rather than from a site.
    pub fn is_pool_error(&self) -> bool {
        matches!(
            self,
            Self::PoolClosed | Self::PoolTimeout(_) | Self::SessionCreate(_)
        )
    }
}
