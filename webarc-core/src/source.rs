//! Lazy byte-range access into archive sources.
//!
//! A [`ByteRange`] is plain data: a source identity plus an offset and
//! length. No file handle is embedded, so ranges are cheap to clone and
//! compare. Resolution to bytes goes through [`ByteRange::chunks`] with an
//! explicit [`HandleCache`] that owns the open handles for the session.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use lru::LruCache;

use crate::error::Result;

/// Read granularity for chunked materialization.
pub const CHUNK_SIZE: usize = 4096;

/// File extension that selects transparent gzip decompression.
pub const GZIP_EXTENSION: &str = "gz";

/// Default number of open handles a [`HandleCache`] retains.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identity of a byte source.
///
/// Whether a file is read through gzip is decided once, from its name (or a
/// caller override), and recorded here - offsets into a gzip source address
/// the decompressed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// An on-disk file, optionally gzip-compressed.
    File {
        /// Path of the file.
        path: PathBuf,
        /// Whether reads go through a gzip decoder.
        gzip: bool,
    },
    /// An in-memory byte image, shared between ranges.
    Buffer(Arc<[u8]>),
}

impl SourceSpec {
    /// Reference a file, detecting gzip by the `.gz` naming convention
    /// unless `force_gzip` overrides it.
    pub fn from_path(path: impl Into<PathBuf>, force_gzip: bool) -> Self {
        let path = path.into();
        let gzip = force_gzip
            || path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION));
        Self::File { path, gzip }
    }

    /// Reference an in-memory byte image.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Buffer(data.into())
    }
}

/// A lazy reference to a contiguous byte range within a source.
///
/// Holding a range does not hold the source open; bytes are produced on
/// demand by [`ByteRange::chunks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRange {
    /// The source the range points into.
    pub spec: SourceSpec,
    /// Offset of the first byte, in decompressed terms for gzip sources.
    pub offset: u64,
    /// Number of bytes, or `None` to read until the source is exhausted.
    pub length: Option<u64>,
}

impl ByteRange {
    /// Bind a range to a source.
    pub fn bind(spec: SourceSpec, offset: u64, length: Option<u64>) -> Self {
        Self {
            spec,
            offset,
            length,
        }
    }

    /// Produce the range's bytes as a pull-based chunk iterator.
    ///
    /// Chunks are at most [`CHUNK_SIZE`] bytes. Iteration stops after
    /// `length` bytes or at source end, whichever comes first; a bound
    /// length is never exceeded even when more data exists.
    pub fn chunks(&self, cache: &mut HandleCache) -> Result<ByteChunks> {
        let reader = match &self.spec {
            SourceSpec::Buffer(data) => {
                let len = data.len() as u64;
                let start = self.offset.min(len);
                let end = match self.length {
                    Some(bound) => start.saturating_add(bound).min(len),
                    None => len,
                };
                ChunkReader::Buffer {
                    data: Arc::clone(data),
                    pos: start as usize,
                    end: end as usize,
                }
            }
            SourceSpec::File { path, gzip } => {
                let mut file = cache.checkout(path)?;
                if *gzip {
                    // Gzip streams cannot seek; restart decompression and
                    // discard up to the offset.
                    file.seek(SeekFrom::Start(0))?;
                    let mut decoder = GzDecoder::new(file);
                    if self.offset > 0 {
                        io::copy(&mut (&mut decoder).take(self.offset), &mut io::sink())?;
                    }
                    ChunkReader::Gzip(Box::new(decoder))
                } else {
                    file.seek(SeekFrom::Start(self.offset))?;
                    ChunkReader::File(file)
                }
            }
        };

        Ok(ByteChunks {
            reader,
            remaining: self.length,
        })
    }

    /// Materialize the whole range into one buffer.
    pub fn read_all(&self, cache: &mut HandleCache) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        for chunk in self.chunks(cache)? {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }
}

/// Cache of open file handles, keyed by path, with LRU eviction.
///
/// The cache is an explicit value the caller constructs and threads into
/// each materialization; its lifetime is the caller's session, not the
/// process. Exclusive borrows keep use single-threaded.
#[derive(Debug)]
pub struct HandleCache {
    handles: LruCache<PathBuf, File>,
}

impl HandleCache {
    /// Create a cache retaining at most `capacity` open handles.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            handles: LruCache::new(capacity),
        }
    }

    /// Number of handles currently held.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the cache holds no handles.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether a handle for this path is cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.handles.contains(path)
    }

    /// Get a handle for the path, opening and caching it on first use.
    ///
    /// The returned handle shares its cursor with the cached one, so callers
    /// must seek before reading.
    fn checkout(&mut self, path: &Path) -> io::Result<File> {
        if let Some(file) = self.handles.get(path) {
            tracing::debug!(path = %path.display(), "reusing cached handle");
            return file.try_clone();
        }

        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "opened and cached handle");
        let clone = file.try_clone()?;
        self.handles.put(path.to_path_buf(), file);
        Ok(clone)
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).expect("capacity is non-zero"))
    }
}

enum ChunkReader {
    File(File),
    Gzip(Box<GzDecoder<File>>),
    Buffer {
        data: Arc<[u8]>,
        pos: usize,
        end: usize,
    },
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(file) => file.read(buf),
            Self::Gzip(decoder) => decoder.read(buf),
            Self::Buffer { data, pos, end } => {
                let n = buf.len().min(*end - *pos);
                buf[..n].copy_from_slice(&data[*pos..*pos + n]);
                *pos += n;
                Ok(n)
            }
        }
    }
}

/// Pull-based iterator over a range's byte chunks.
///
/// Finite and not restartable; re-invoke [`ByteRange::chunks`] to read the
/// range again.
pub struct ByteChunks {
    reader: ChunkReader,
    remaining: Option<u64>,
}

impl Iterator for ByteChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let want = match self.remaining {
            Some(0) => return None,
            Some(n) if n < CHUNK_SIZE as u64 => n as usize,
            _ => CHUNK_SIZE,
        };

        let mut buf = vec![0u8; want];
        match read_full(&mut self.reader, &mut buf) {
            Ok(0) => {
                self.remaining = Some(0);
                None
            }
            Ok(n) => {
                buf.truncate(n);
                if let Some(remaining) = &mut self.remaining {
                    *remaining -= n as u64;
                }
                Some(Ok(buf))
            }
            Err(err) => {
                self.remaining = Some(0);
                Some(Err(err.into()))
            }
        }
    }
}

/// Read until the buffer is full or the reader is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(total)
}
