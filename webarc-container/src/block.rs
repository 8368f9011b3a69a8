//! Record content blocks.
//!
//! A content block is either opaque bytes or an embedded header followed by
//! a payload. Which one a record gets is decided by [`BlockKind::classify`]
//! over the record's content-type - a closed dispatch, so every content
//! type lands in exactly one variant.

use webarc_core::error::{Result, WebArcError};
use webarc_core::fields::{FieldList, HttpFields};
use webarc_core::source::ByteRange;

use crate::stream::SourceStream;

/// How a content block is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Opaque bytes, no interpretation.
    Binary,
    /// Embedded `warc-fields` header followed by a payload.
    WarcFields,
    /// Embedded HTTP header (status line + fields) followed by a payload.
    Http,
}

impl BlockKind {
    /// Classify a record's content-type value.
    pub fn classify(content_type: Option<&str>) -> Self {
        match content_type {
            Some(value) if value.starts_with("application/http") => Self::Http,
            Some("application/warc-fields") => Self::WarcFields,
            _ => Self::Binary,
        }
    }
}

/// The embedded header of a [`BlockWithPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFields {
    /// Plain `warc-fields` header.
    Warc(FieldList),
    /// HTTP header with its leading status line.
    Http(HttpFields),
}

impl BlockFields {
    fn parse(kind: BlockKind, text: &str) -> Result<Self> {
        match kind {
            BlockKind::WarcFields => Ok(Self::Warc(FieldList::parse(text)?)),
            BlockKind::Http => Ok(Self::Http(HttpFields::parse(text)?)),
            BlockKind::Binary => Err(WebArcError::invalid_header(
                "binary blocks carry no embedded header",
            )),
        }
    }

    /// The name/value fields, ignoring any status line.
    pub fn fields(&self) -> &FieldList {
        match self {
            Self::Warc(fields) => fields,
            Self::Http(http) => &http.fields,
        }
    }

    /// Mutable access to the name/value fields.
    pub fn fields_mut(&mut self) -> &mut FieldList {
        match self {
            Self::Warc(fields) => fields,
            Self::Http(http) => &mut http.fields,
        }
    }

    /// Serialized length in bytes.
    pub fn byte_len(&self) -> u64 {
        match self {
            Self::Warc(fields) => fields.byte_len(),
            Self::Http(http) => http.byte_len(),
        }
    }

    /// Serialize to bytes, without the trailing blank line.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Warc(fields) => fields.to_bytes(),
            Self::Http(http) => http.to_bytes(),
        }
    }
}

/// A content block of opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBlock {
    /// The block's bytes.
    pub source: ByteRange,
}

impl BinaryBlock {
    fn parse(stream: &mut SourceStream, declared_length: u64) -> Result<Self> {
        let source = ByteRange::bind(stream.spec().clone(), stream.offset(), Some(declared_length));
        stream.skip(declared_length)?;
        tracing::debug!(length = declared_length, "binary content block");
        Ok(Self { source })
    }
}

/// A content block holding an embedded header and a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWithPayload {
    /// The embedded header.
    pub fields: BlockFields,
    /// The payload bytes following the embedded header.
    pub payload: ByteRange,
}

impl BlockWithPayload {
    fn parse(stream: &mut SourceStream, declared_length: u64, kind: BlockKind) -> Result<Self> {
        let mut header_bytes: Vec<u8> = Vec::new();
        let mut remaining = declared_length;
        let mut found_delim = false;

        while remaining > 0 {
            let mut line = Vec::new();
            let n = stream.read_line_limited(remaining, &mut line)? as u64;
            if n == 0 {
                break;
            }
            remaining -= n;
            found_delim = line == b"\r\n" || line == b"\n";
            header_bytes.extend_from_slice(&line);
            if found_delim {
                break;
            }
        }

        if !found_delim {
            // No delimiter within the declared bounds: the whole window is
            // header text and the payload is empty. Lenient on purpose; see
            // DESIGN.md.
            tracing::debug!(length = declared_length, "content block has no field delimiter");
        }

        let text = std::str::from_utf8(&header_bytes)
            .map_err(|_| WebArcError::invalid_header("embedded header is not valid UTF-8"))?;
        let fields = BlockFields::parse(kind, text)?;

        let payload = ByteRange::bind(stream.spec().clone(), stream.offset(), Some(remaining));
        stream.skip(remaining)?;

        tracing::debug!(
            field_length = header_bytes.len(),
            payload_length = remaining,
            "content block with payload"
        );

        Ok(Self { fields, payload })
    }
}

/// A record's content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Opaque bytes.
    Binary(BinaryBlock),
    /// Embedded header plus payload.
    WithPayload(BlockWithPayload),
}

impl ContentBlock {
    /// Parse the next `declared_length` bytes of the stream as a content
    /// block.
    ///
    /// `preserve_block` forces a [`BinaryBlock`] regardless of content type,
    /// keeping the block bytes exactly as stored (for digest verification).
    /// The cursor always advances exactly `declared_length` bytes.
    pub fn parse(
        stream: &mut SourceStream,
        declared_length: u64,
        content_type: Option<&str>,
        preserve_block: bool,
    ) -> Result<Self> {
        let kind = if preserve_block {
            BlockKind::Binary
        } else {
            BlockKind::classify(content_type)
        };

        match kind {
            BlockKind::Binary => Ok(Self::Binary(BinaryBlock::parse(stream, declared_length)?)),
            BlockKind::WarcFields | BlockKind::Http => Ok(Self::WithPayload(
                BlockWithPayload::parse(stream, declared_length, kind)?,
            )),
        }
    }

    /// The recomputed structural length of the block.
    ///
    /// For a block with payload this is the serialized embedded header, one
    /// field delimiter, and the payload - authoritative even when the
    /// declared Content-Length disagrees.
    pub fn length(&self) -> u64 {
        match self {
            Self::Binary(block) => block.source.length.unwrap_or(0),
            Self::WithPayload(block) => {
                block.fields.byte_len() + 2 + block.payload.length.unwrap_or(0)
            }
        }
    }
}
