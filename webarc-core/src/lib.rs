//! # webarc Core
//!
//! Core components for the webarc WARC toolkit.
//!
//! This crate provides the building blocks the container layer is made of:
//!
//! - [`fields`]: ordered name/value field lists with line folding and
//!   case-insensitive lookup, shared by WARC headers, HTTP headers, and
//!   `warc-fields` blocks
//! - [`source`]: lazy byte-range references into plain or gzip-compressed
//!   files, resolved through an explicit LRU handle cache
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```rust
//! use webarc_core::fields::FieldList;
//!
//! let fields = FieldList::parse("WARC-Type: response\r\nContent-Length: 4\r\n").unwrap();
//! assert_eq!(fields.get("warc-type"), Some("response"));
//! assert_eq!(fields.to_string(), "WARC-Type: response\r\nContent-Length: 4\r\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod fields;
pub mod source;

// Re-exports for convenience
pub use error::{Result, WebArcError};
pub use fields::{CRLF, FIELD_DELIM, FieldList, HttpFields};
pub use source::{ByteChunks, ByteRange, HandleCache, SourceSpec};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, WebArcError};
    pub use crate::fields::{CRLF, FIELD_DELIM, FieldList, HttpFields};
    pub use crate::source::{ByteChunks, ByteRange, HandleCache, SourceSpec};
}
