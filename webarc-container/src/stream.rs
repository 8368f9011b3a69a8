//! The byte cursor a container reads through.
//!
//! [`SourceStream`] owns the open source and tracks the logical offset of
//! every byte consumed. Gzip sources are decompressed transparently, so the
//! offset always counts decompressed bytes - the same coordinates
//! [`ByteRange`](webarc_core::ByteRange) uses.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;

use webarc_core::error::Result;
use webarc_core::source::SourceSpec;

/// A buffered, offset-tracking cursor over a WARC source.
pub struct SourceStream {
    spec: SourceSpec,
    reader: StreamReader,
    offset: u64,
}

enum StreamReader {
    Plain(BufReader<File>),
    Gzip(BufReader<GzDecoder<File>>),
    Buffer(Cursor<Arc<[u8]>>),
}

impl SourceStream {
    /// Open a file, decompressing transparently when its name carries the
    /// `.gz` extension or `force_gzip` is set.
    pub fn open(path: impl AsRef<Path>, force_gzip: bool) -> Result<Self> {
        let spec = SourceSpec::from_path(path.as_ref(), force_gzip);
        let reader = match &spec {
            SourceSpec::File { path, gzip: true } => {
                let file = File::open(path)?;
                tracing::info!(path = %path.display(), "opened gzip file");
                StreamReader::Gzip(BufReader::new(GzDecoder::new(file)))
            }
            SourceSpec::File { path, gzip: false } => {
                let file = File::open(path)?;
                tracing::info!(path = %path.display(), "opened file");
                StreamReader::Plain(BufReader::new(file))
            }
            SourceSpec::Buffer(_) => unreachable!("from_path never yields a buffer"),
        };

        Ok(Self {
            spec,
            reader,
            offset: 0,
        })
    }

    /// Read from an in-memory WARC image.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        Self {
            spec: SourceSpec::Buffer(Arc::clone(&data)),
            reader: StreamReader::Buffer(Cursor::new(data)),
            offset: 0,
        }
    }

    /// The source identity stamped into byte ranges created while parsing.
    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Logical offset of the next byte, in decompressed terms.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn buf_reader(&mut self) -> &mut dyn BufRead {
        match &mut self.reader {
            StreamReader::Plain(reader) => reader,
            StreamReader::Gzip(reader) => reader,
            StreamReader::Buffer(cursor) => cursor,
        }
    }

    /// Read up to and including the next LF, appending to `buf`.
    ///
    /// Returns the number of bytes consumed; 0 means end of stream.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let n = self.buf_reader().read_until(b'\n', buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Like [`read_line`](Self::read_line), but never consumes more than
    /// `limit` bytes even when no LF appears within them.
    pub fn read_line_limited(&mut self, limit: u64, buf: &mut Vec<u8>) -> Result<usize> {
        let mut taken: u64 = 0;
        let reader = self.buf_reader();

        while taken < limit {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                break;
            }
            let window = available.len().min((limit - taken) as usize);
            match available[..window].iter().position(|&b| b == b'\n') {
                Some(i) => {
                    buf.extend_from_slice(&available[..=i]);
                    reader.consume(i + 1);
                    taken += (i + 1) as u64;
                    break;
                }
                None => {
                    buf.extend_from_slice(&available[..window]);
                    reader.consume(window);
                    taken += window as u64;
                }
            }
        }

        self.offset += taken;
        Ok(taken as usize)
    }

    /// Read up to `n` bytes, stopping early only at end of stream.
    pub fn read_at_most(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(n);
        let reader = self.buf_reader();

        while data.len() < n {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                break;
            }
            let take = available.len().min(n - data.len());
            data.extend_from_slice(&available[..take]);
            reader.consume(take);
        }

        self.offset += data.len() as u64;
        Ok(data)
    }

    /// Advance the cursor past `n` bytes without keeping them.
    ///
    /// Seekable backings seek; gzip reads and discards. Skipping past the
    /// end of the source is not an error here - the next read fails instead.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        match &mut self.reader {
            StreamReader::Plain(reader) => {
                reader.seek_relative(n as i64)?;
                self.offset += n;
            }
            StreamReader::Buffer(cursor) => {
                cursor.seek(SeekFrom::Current(n as i64))?;
                self.offset += n;
            }
            StreamReader::Gzip(reader) => {
                let skipped = io::copy(&mut reader.take(n), &mut io::sink())?;
                self.offset += skipped;
            }
        }
        Ok(())
    }

    /// Whether at least one more byte is available, without consuming it.
    pub fn peek_nonempty(&mut self) -> Result<bool> {
        Ok(!self.buf_reader().fill_buf()?.is_empty())
    }
}
