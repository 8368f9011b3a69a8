//! Error types for webarc operations.
//!
//! This module provides the error type shared by all webarc crates, covering
//! I/O failures, record framing violations, header syntax errors, and typed
//! field-access failures.

use std::io;
use thiserror::Error;

/// The main error type for webarc operations.
#[derive(Debug, Error)]
pub enum WebArcError {
    /// I/O error from the underlying source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bytes between two records are not exactly two CRLF pairs.
    #[error("records not separated correctly at offset {offset}")]
    Framing {
        /// Byte offset immediately following the record that lacked its
        /// trailing delimiter.
        offset: u64,
    },

    /// Malformed record or field header.
    #[error("invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Content-Length field absent or not an unsigned integer.
    #[error("record {record_id:?} has no usable Content-Length")]
    MissingLength {
        /// WARC-Record-ID of the offending record, empty if absent.
        record_id: String,
    },

    /// A typed field accessor could not parse or format its value.
    #[error("invalid value for field {name}: {message}")]
    FieldValue {
        /// Name of the field.
        name: String,
        /// Description of the coercion failure.
        message: String,
    },
}

/// Result type alias for webarc operations.
pub type Result<T> = std::result::Result<T, WebArcError>;

impl WebArcError {
    /// Create a framing error.
    pub fn framing(offset: u64) -> Self {
        Self::Framing { offset }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a missing length error.
    pub fn missing_length(record_id: impl Into<String>) -> Self {
        Self::MissingLength {
            record_id: record_id.into(),
        }
    }

    /// Create a field value error.
    pub fn field_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldValue {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebArcError::framing(1234);
        assert!(err.to_string().contains("1234"));

        let err = WebArcError::invalid_header("field line without a colon");
        assert!(err.to_string().contains("without a colon"));

        let err = WebArcError::missing_length("<urn:uuid:1>");
        assert!(err.to_string().contains("Content-Length"));

        let err = WebArcError::field_value("WARC-Date", "not an ISO-8601 date");
        assert!(err.to_string().contains("WARC-Date"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: WebArcError = io_err.into();
        assert!(matches!(err, WebArcError::Io(_)));
    }
}
