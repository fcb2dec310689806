//! Errors from the Template Catalog (spec.md §4.B).

use std::fmt;

#[derive(Debug)]
pub enum CatalogError {
    /// A `sqlx` error that survived the retry budget.
    Database(String),
    /// An I/O failure writing or removing an image blob.
    Io(String),
    /// The upload didn't satisfy the multipart/MIME contract in spec.md §4.B.
    InvalidUpload(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Database(msg) => write!(f, "catalog database error: {msg}"),
            CatalogError::Io(msg) => write!(f, "catalog io error: {msg}"),
            CatalogError::InvalidUpload(msg) => write!(f, "invalid image upload: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}
