//! ISBN normalization and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a raw string was rejected as an ISBN.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing left after stripping separators.
    #[error("ISBN is empty")]
    Empty,
    /// Digit count is neither 10 nor 13.
    #[error("ISBN must have 10 or 13 digits, got {0}")]
    BadLength(usize),
    /// A character other than a digit or separator was found.
    #[error("ISBN may only contain digits, found '{0}'")]
    NonDigit(char),
}

/// A validated ISBN: 10 or 13 ASCII digits, separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Normalizes and validates raw user or spreadsheet input.
    ///
    /// Hyphens and whitespace are treated as separators and dropped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::Empty);
        }
        if let Some(bad) = cleaned.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ValidationError::NonDigit(bad));
        }
        match cleaned.len() {
            10 | 13 => Ok(Self(cleaned)),
            n => Err(ValidationError::BadLength(n)),
        }
    }

    /// Returns the normalized digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a 13-digit ISBN.
    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Isbn {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
