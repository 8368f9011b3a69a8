//! # webarc Container
//!
//! WARC (Web ARChive) container format support for webarc.
//!
//! A WARC file is a sequence of self-describing records, each an
//! RFC822-style header plus a content block that may itself embed HTTP
//! headers or `warc-fields` before an opaque payload. This crate models
//! that structure:
//!
//! - [`header`]: the `WARC/x.y` version line and header fields
//! - [`block`]: content blocks - opaque bytes, or embedded header + payload,
//!   dispatched on the record's content-type
//! - [`record`]: one record, with typed accessors over its header fields
//! - [`container`]: sequential whole-file reading with framing validation,
//!   and whole-file serialization
//! - [`stream`]: the offset-tracking cursor containers read through, over
//!   plain, gzip-compressed, or in-memory sources
//!
//! Content blocks stay lazy: parsing records offsets into the source and
//! copies nothing; payload bytes are produced on demand through the handle
//! cache in `webarc-core`.
//!
//! ## Example
//!
//! ```rust
//! use webarc_container::WarcContainer;
//!
//! let data = b"WARC/1.0\r\nWARC-Type: warcinfo\r\nContent-Length: 0\r\n\r\n\r\n\r\n".to_vec();
//! let container = WarcContainer::from_bytes(data).unwrap();
//! assert_eq!(container.len(), 1);
//! assert_eq!(container.records[0].warc_type(), Some("warcinfo"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod container;
pub mod header;
pub mod record;
pub mod stream;

// Re-exports
pub use block::{BinaryBlock, BlockFields, BlockKind, BlockWithPayload, ContentBlock};
pub use container::WarcContainer;
pub use header::WarcHeader;
pub use record::{Record, RecordChunks};
pub use stream::SourceStream;
