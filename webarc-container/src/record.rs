//! WARC records.

use std::io::Write;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use webarc_core::error::{Result, WebArcError};
use webarc_core::fields::{CRLF, FIELD_DELIM};
use webarc_core::source::{ByteChunks, HandleCache};

use crate::block::ContentBlock;
use crate::header::WarcHeader;
use crate::stream::SourceStream;

/// Header field naming the record's globally unique identifier.
pub const FIELD_RECORD_ID: &str = "WARC-Record-ID";
/// Header field declaring the content block length.
pub const FIELD_CONTENT_LENGTH: &str = "Content-Length";
/// Header field carrying the content block's media type.
pub const FIELD_CONTENT_TYPE: &str = "Content-Type";
/// Header field carrying the record's ISO-8601 timestamp.
pub const FIELD_DATE: &str = "WARC-Date";
/// Header field naming the record type.
pub const FIELD_TYPE: &str = "WARC-Type";
/// Header field carrying the captured resource's URI.
pub const FIELD_TARGET_URI: &str = "WARC-Target-URI";

/// One WARC record: header, content block, and its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record header.
    pub header: WarcHeader,
    /// The record's content block.
    pub content_block: ContentBlock,
    /// Offset of the record's first byte in the source.
    pub file_offset: u64,
}

impl Record {
    /// Parse one record from the stream.
    ///
    /// Reads the header block, dispatches the content block on the
    /// content-type (or forces an uninterpreted block when `preserve_block`
    /// is set), and reconciles the declared Content-Length against the
    /// recomputed structural length - correcting the header, with a
    /// warning, when they disagree.
    pub fn parse(stream: &mut SourceStream, preserve_block: bool) -> Result<Self> {
        let file_offset = stream.offset();
        tracing::debug!(offset = file_offset, "record starts");

        let header_bytes = read_header_block(stream)?;
        let header = WarcHeader::parse(&header_bytes)?;

        let declared = declared_length(&header)?;
        tracing::debug!(length = declared, "content block declared length");

        let content_type = header.fields.get(FIELD_CONTENT_TYPE).map(str::to_owned);
        let content_block =
            ContentBlock::parse(stream, declared, content_type.as_deref(), preserve_block)?;

        let mut record = Self {
            header,
            content_block,
            file_offset,
        };

        let recomputed = record.content_block.length();
        if recomputed != declared {
            tracing::warn!(
                declared,
                recomputed,
                "content block length changed; correcting header"
            );
            record.set_content_length(recomputed);
        }

        Ok(record)
    }

    /// The `WARC-Record-ID` field.
    pub fn record_id(&self) -> Option<&str> {
        self.header.fields.get(FIELD_RECORD_ID)
    }

    /// Set the `WARC-Record-ID` field.
    pub fn set_record_id(&mut self, id: impl Into<String>) {
        self.header.fields.set(FIELD_RECORD_ID, id.into());
    }

    /// The `Content-Length` field as an integer.
    pub fn content_length(&self) -> Result<u64> {
        declared_length(&self.header)
    }

    /// Set the `Content-Length` field.
    pub fn set_content_length(&mut self, length: u64) {
        self.header
            .fields
            .set(FIELD_CONTENT_LENGTH, length.to_string());
    }

    /// The `WARC-Date` field, decoded through the ISO-8601 codec.
    pub fn date(&self) -> Result<DateTime<FixedOffset>> {
        let value = self
            .header
            .fields
            .get(FIELD_DATE)
            .ok_or_else(|| WebArcError::field_value(FIELD_DATE, "field is absent"))?;
        DateTime::parse_from_rfc3339(value)
            .map_err(|err| WebArcError::field_value(FIELD_DATE, err.to_string()))
    }

    /// Set the `WARC-Date` field from a timestamp.
    pub fn set_date(&mut self, date: &DateTime<FixedOffset>) {
        self.header
            .fields
            .set(FIELD_DATE, date.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    /// The `WARC-Type` field.
    pub fn warc_type(&self) -> Option<&str> {
        self.header.fields.get(FIELD_TYPE)
    }

    /// Set the `WARC-Type` field.
    pub fn set_warc_type(&mut self, warc_type: impl Into<String>) {
        self.header.fields.set(FIELD_TYPE, warc_type.into());
    }

    /// Serialize as a pull-based chunk sequence: header bytes, content block
    /// bytes, then the two-CRLF inter-record delimiter.
    pub fn chunks(&self, cache: &mut HandleCache) -> Result<RecordChunks> {
        let mut segments = Vec::new();
        segments.push(Segment::Ready(self.header.to_bytes()));

        match &self.content_block {
            ContentBlock::Binary(block) => {
                segments.push(Segment::Lazy(block.source.chunks(cache)?));
            }
            ContentBlock::WithPayload(block) => {
                let mut fields = block.fields.to_bytes();
                fields.extend_from_slice(CRLF.as_bytes());
                segments.push(Segment::Ready(fields));
                segments.push(Segment::Lazy(block.payload.chunks(cache)?));
            }
        }

        segments.push(Segment::Ready(FIELD_DELIM.to_vec()));

        Ok(RecordChunks {
            segments: segments.into_iter(),
            current: None,
        })
    }

    /// Stream the serialized record into a writer, returning the byte count.
    pub fn write_to<W: Write>(&self, writer: &mut W, cache: &mut HandleCache) -> Result<u64> {
        let mut written = 0u64;
        for chunk in self.chunks(cache)? {
            let chunk = chunk?;
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    /// Materialize the serialized record into one buffer.
    pub fn to_bytes(&self, cache: &mut HandleCache) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.write_to(&mut data, cache)?;
        Ok(data)
    }
}

fn read_header_block(stream: &mut SourceStream) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    loop {
        let mut line = Vec::new();
        let n = stream.read_line(&mut line)?;
        if n == 0 {
            return Err(WebArcError::invalid_header(
                "unexpected end of stream inside record header",
            ));
        }
        let blank = line == b"\r\n" || line == b"\n";
        bytes.extend_from_slice(&line);
        if blank {
            break;
        }
    }
    Ok(bytes)
}

fn declared_length(header: &WarcHeader) -> Result<u64> {
    let record_id = header.fields.get(FIELD_RECORD_ID).unwrap_or_default();
    let value = header
        .fields
        .get(FIELD_CONTENT_LENGTH)
        .ok_or_else(|| WebArcError::missing_length(record_id))?;
    value
        .trim()
        .parse()
        .map_err(|_| WebArcError::missing_length(record_id))
}

enum Segment {
    Ready(Vec<u8>),
    Lazy(ByteChunks),
}

/// Pull-based iterator over a record's serialized bytes.
///
/// Finite and not restartable; call [`Record::chunks`] again to reserialize.
pub struct RecordChunks {
    segments: std::vec::IntoIter<Segment>,
    current: Option<ByteChunks>,
}

impl Iterator for RecordChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunks) = &mut self.current {
                match chunks.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            match self.segments.next()? {
                Segment::Ready(bytes) => return Some(Ok(bytes)),
                Segment::Lazy(chunks) => self.current = Some(chunks),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockFields;

    const WARCINFO: &[u8] = b"WARC/1.0\r\n\
        WARC-Type: warcinfo\r\n\
        WARC-Record-ID: <urn:uuid:5f8ab464-c438-4b16-bdd9-6ff6f8e5ee8a>\r\n\
        WARC-Date: 2013-02-12T03:04:05Z\r\n\
        Content-Type: application/warc-fields\r\n\
        Content-Length: 23\r\n\
        \r\n\
        software: webarc\r\n\
        \r\n\
        abc";

    #[test]
    fn test_parse_and_accessors() {
        let mut stream = SourceStream::from_bytes(WARCINFO.to_vec());
        let record = Record::parse(&mut stream, false).unwrap();

        assert_eq!(record.file_offset, 0);
        assert_eq!(record.warc_type(), Some("warcinfo"));
        assert_eq!(
            record.record_id(),
            Some("<urn:uuid:5f8ab464-c438-4b16-bdd9-6ff6f8e5ee8a>")
        );
        assert_eq!(record.content_length().unwrap(), 23);
        assert_eq!(record.date().unwrap().to_rfc3339(), "2013-02-12T03:04:05+00:00");

        let ContentBlock::WithPayload(block) = &record.content_block else {
            panic!("expected a block with payload");
        };
        assert_eq!(block.fields.fields().get("software"), Some("webarc"));
        assert_eq!(block.payload.length, Some(3));
    }

    #[test]
    fn test_accessor_mutation_writes_through() {
        let mut stream = SourceStream::from_bytes(WARCINFO.to_vec());
        let mut record = Record::parse(&mut stream, false).unwrap();

        record.set_warc_type("metadata");
        assert_eq!(record.header.fields.get("WARC-Type"), Some("metadata"));

        let date = DateTime::parse_from_rfc3339("2020-06-01T10:20:30Z").unwrap();
        record.set_date(&date);
        assert_eq!(
            record.header.fields.get("WARC-Date"),
            Some("2020-06-01T10:20:30Z")
        );
        assert_eq!(record.date().unwrap(), date);
    }

    #[test]
    fn test_missing_content_length_is_fatal() {
        let data = b"WARC/1.0\r\nWARC-Type: warcinfo\r\n\r\n";
        let mut stream = SourceStream::from_bytes(data.to_vec());
        let err = Record::parse(&mut stream, false).unwrap_err();
        assert!(matches!(err, WebArcError::MissingLength { .. }));
    }

    #[test]
    fn test_non_integer_content_length_is_fatal() {
        let data = b"WARC/1.0\r\nContent-Length: twelve\r\n\r\n";
        let mut stream = SourceStream::from_bytes(data.to_vec());
        let err = Record::parse(&mut stream, false).unwrap_err();
        assert!(matches!(err, WebArcError::MissingLength { .. }));
    }

    #[test]
    fn test_bad_date_is_field_value_error() {
        let data = b"WARC/1.0\r\nWARC-Date: yesterday\r\nContent-Length: 0\r\n\r\n";
        let mut stream = SourceStream::from_bytes(data.to_vec());
        let record = Record::parse(&mut stream, false).unwrap();
        let err = record.date().unwrap_err();
        assert!(matches!(err, WebArcError::FieldValue { .. }));
    }

    #[test]
    fn test_length_reconciliation_corrects_header() {
        // The embedded field carries extra padding that parsing normalizes
        // away, so the declared length overstates the recomputed one.
        let body = b"Name:   padded\r\n\r\nxyz";
        let mut data = format!(
            "WARC/1.0\r\nContent-Type: application/warc-fields\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        data.extend_from_slice(body);

        let mut stream = SourceStream::from_bytes(data);
        let record = Record::parse(&mut stream, false).unwrap();

        // "Name: padded\r\n" + delimiter + "xyz"
        let recomputed: u64 = 14 + 2 + 3;
        assert_eq!(record.content_length().unwrap(), recomputed);
        assert_eq!(record.content_block.length(), recomputed);

        let ContentBlock::WithPayload(block) = &record.content_block else {
            panic!("expected a block with payload");
        };
        assert!(matches!(&block.fields, BlockFields::Warc(_)));
        assert_eq!(block.fields.fields().get("Name"), Some("padded"));
    }

    #[test]
    fn test_preserve_block_keeps_bytes_binary() {
        let mut stream = SourceStream::from_bytes(WARCINFO.to_vec());
        let record = Record::parse(&mut stream, true).unwrap();
        assert!(matches!(record.content_block, ContentBlock::Binary(_)));
        assert_eq!(record.content_length().unwrap(), 23);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut stream = SourceStream::from_bytes(WARCINFO.to_vec());
        let record = Record::parse(&mut stream, false).unwrap();

        let mut cache = HandleCache::default();
        let bytes = record.to_bytes(&mut cache).unwrap();

        let mut expected = WARCINFO.to_vec();
        expected.extend_from_slice(FIELD_DELIM);
        assert_eq!(bytes, expected);
    }
}
