//! Error types for pagestruct library.

use std::io;
use thiserror::Error;

/// Result type alias for pagestruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reconstructing page structure.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The annotation dump could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is neither JSON nor gzip-compressed JSON.
    #[error("Unknown input format: expected JSON or gzip-compressed JSON")]
    UnknownFormat,

    /// A bounding box attribute could not be parsed.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// A configuration file contains a malformed record.
    #[error("Invalid configuration at line {line}: {message}")]
    InvalidConfig {
        /// 1-based line number of the offending record
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// A configured match pattern is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// The interactive correction step failed.
    #[error("Correction error: {0}")]
    Correction(String),

    /// Error during rendering (JSON, text).
    #[error("Rendering error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownFormat;
        assert_eq!(
            err.to_string(),
            "Unknown input format: expected JSON or gzip-compressed JSON"
        );

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidConfig {
            line: 3,
            message: "missing digit".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration at line 3: missing digit"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
