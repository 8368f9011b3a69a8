//! Whole-file reading and writing.
//!
//! A [`WarcContainer`] is the ordered record sequence of one WARC file.
//! Reading follows the format's framing: parse a record, require exactly two
//! CRLF pairs, then look ahead one byte to decide between another record and
//! end of stream.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use webarc_core::error::{Result, WebArcError};
use webarc_core::fields::FIELD_DELIM;
use webarc_core::source::HandleCache;

use crate::record::Record;
use crate::stream::SourceStream;

/// A WARC file model: the ordered sequence of its records.
///
/// Records are appended as parsed and never removed or reordered.
#[derive(Debug, Default)]
pub struct WarcContainer {
    /// The records, in file order.
    pub records: Vec<Record>,
}

impl WarcContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records read so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the container holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Open a WARC file for sequential reading.
    ///
    /// Gzip compression is selected by the `.gz` file extension, or always
    /// when `force_gzip` is set.
    pub fn open(path: impl AsRef<Path>, force_gzip: bool) -> Result<SourceStream> {
        SourceStream::open(path, force_gzip)
    }

    /// Open and read every record of the given file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut stream = Self::open(path, false)?;
        let mut container = Self::new();
        container.read_stream(&mut stream)?;
        Ok(container)
    }

    /// Read every record of an in-memory WARC image.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let mut stream = SourceStream::from_bytes(data);
        let mut container = Self::new();
        container.read_stream(&mut stream)?;
        Ok(container)
    }

    /// Read records until the stream is exhausted, appending each.
    ///
    /// Any failure is terminal: records appended before it stay, and the
    /// stream position is unspecified afterwards.
    pub fn read_stream(&mut self, stream: &mut SourceStream) -> Result<()> {
        loop {
            let (record, has_more) = Self::read_record(stream, false)?;
            self.records.push(record);
            if !has_more {
                break;
            }
        }
        Ok(())
    }

    /// Read one record and report whether more follow.
    ///
    /// After the record, exactly two CRLF pairs must follow - anything else
    /// is a framing error carrying the offset where the delimiter was
    /// expected. A non-destructive look-ahead then decides whether the
    /// stream holds another record.
    pub fn read_record(stream: &mut SourceStream, preserve_block: bool) -> Result<(Record, bool)> {
        let record = Record::parse(stream, preserve_block)?;
        tracing::debug!(
            record_id = record.record_id().unwrap_or_default(),
            "finished reading a record"
        );

        let delim_offset = stream.offset();
        let delim = stream.read_at_most(FIELD_DELIM.len())?;
        if delim != FIELD_DELIM {
            tracing::debug!(delim = ?delim, "wrong inter-record delimiter");
            return Err(WebArcError::framing(delim_offset));
        }

        if stream.peek_nonempty()? {
            Ok((record, true))
        } else {
            tracing::info!("finished reading container");
            Ok((record, false))
        }
    }

    /// Stream the serialized container into a writer, returning the byte
    /// count.
    pub fn write_to<W: Write>(&self, writer: &mut W, cache: &mut HandleCache) -> Result<u64> {
        let mut written = 0u64;
        for record in &self.records {
            written += record.write_to(writer, cache)?;
        }
        Ok(written)
    }

    /// Materialize the serialized container into one buffer.
    pub fn to_bytes(&self, cache: &mut HandleCache) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.write_to(&mut data, cache)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_RECORD: &[u8] = b"WARC/1.0\r\nWARC-Type: warcinfo\r\nContent-Length: 0\r\n\r\n\r\n\r\n";

    fn two_record_file() -> Vec<u8> {
        let mut data = EMPTY_RECORD.to_vec();
        data.extend_from_slice(EMPTY_RECORD);
        data
    }

    #[test]
    fn test_two_record_file() {
        let container = WarcContainer::from_bytes(two_record_file()).unwrap();
        assert_eq!(container.len(), 2);
        for record in &container.records {
            assert_eq!(record.warc_type(), Some("warcinfo"));
            assert_eq!(record.content_block.length(), 0);
            assert!(matches!(
                record.content_block,
                crate::block::ContentBlock::Binary(_)
            ));
        }
        assert_eq!(container.records[1].file_offset, EMPTY_RECORD.len() as u64);
    }

    #[test]
    fn test_framing_error_carries_offset() {
        // Replace the inter-record delimiter with garbage.
        let mut data = EMPTY_RECORD[..EMPTY_RECORD.len() - 4].to_vec();
        let failed_record_end = data.len() as u64;
        data.extend_from_slice(b"XXXX");
        data.extend_from_slice(EMPTY_RECORD);

        let err = WarcContainer::from_bytes(data).unwrap_err();
        let WebArcError::Framing { offset } = err else {
            panic!("expected a framing error, got {err}");
        };
        assert_eq!(offset, failed_record_end);
    }

    #[test]
    fn test_single_delimiter_is_framing_error() {
        let mut data = EMPTY_RECORD[..EMPTY_RECORD.len() - 4].to_vec();
        data.extend_from_slice(b"\r\n");
        let err = WarcContainer::from_bytes(data).unwrap_err();
        assert!(matches!(err, WebArcError::Framing { .. }));
    }

    #[test]
    fn test_end_of_stream_after_last_record() {
        let mut stream = SourceStream::from_bytes(two_record_file());
        let (_, more) = WarcContainer::read_record(&mut stream, false).unwrap();
        assert!(more);
        let (_, more) = WarcContainer::read_record(&mut stream, false).unwrap();
        assert!(!more);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let data = two_record_file();
        let container = WarcContainer::from_bytes(data.clone()).unwrap();

        let mut cache = HandleCache::default();
        assert_eq!(container.to_bytes(&mut cache).unwrap(), data);
    }

    #[test]
    fn test_failure_keeps_earlier_records() {
        let mut data = two_record_file();
        data.extend_from_slice(b"not a warc record\r\n\r\n\r\n\r\n");

        let mut stream = SourceStream::from_bytes(data);
        let mut container = WarcContainer::new();
        let err = container.read_stream(&mut stream).unwrap_err();
        assert!(matches!(err, WebArcError::InvalidHeader { .. }));
        assert_eq!(container.len(), 2);
    }
}
