//! WARC record headers.

use std::fmt;

use webarc_core::error::{Result, WebArcError};
use webarc_core::fields::{CRLF, FieldList};

/// The token every record header must start with.
pub const VERSION_PREFIX: &str = "WARC/";

/// A WARC record header: version token plus named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarcHeader {
    /// The version string following `WARC/` on the first line.
    pub version: String,
    /// The header fields.
    pub fields: FieldList,
}

impl WarcHeader {
    /// Create a header with the given version and no fields.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            fields: FieldList::new(),
        }
    }

    /// Parse a header block, including its trailing blank line.
    ///
    /// The first line must begin with `WARC/`; everything after the slash is
    /// the version. The remaining lines are parsed as fields.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| WebArcError::invalid_header("record header is not valid UTF-8"))?;

        let (version_line, field_text) = text.split_once(CRLF).ok_or_else(|| {
            WebArcError::invalid_header("record header has no version line terminator")
        })?;

        let version = version_line.strip_prefix(VERSION_PREFIX).ok_or_else(|| {
            WebArcError::invalid_header(format!("not a WARC version line: {version_line:?}"))
        })?;

        Ok(Self {
            version: version.to_string(),
            fields: FieldList::parse(field_text)?,
        })
    }

    /// Serialized length in bytes, trailing blank line included.
    pub fn byte_len(&self) -> u64 {
        VERSION_PREFIX.len() as u64 + self.version.len() as u64 + 2 + self.fields.byte_len() + 2
    }

    /// Serialize: version line, fields, then the blank line that closes the
    /// header block.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for WarcHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{VERSION_PREFIX}{}{CRLF}{}{CRLF}", self.version, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let header =
            WarcHeader::parse(b"WARC/1.0\r\nWARC-Type: warcinfo\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        assert_eq!(header.version, "1.0");
        assert_eq!(header.fields.get("warc-type"), Some("warcinfo"));
        assert_eq!(header.fields.len(), 2);
    }

    #[test]
    fn test_reject_wrong_prefix() {
        let err = WarcHeader::parse(b"HTTP/1.1 200 OK\r\nA: b\r\n\r\n").unwrap_err();
        assert!(matches!(err, WebArcError::InvalidHeader { .. }));

        // `WARC` without the slash is just as fatal.
        let err = WarcHeader::parse(b"WARC 1.0\r\n\r\n").unwrap_err();
        assert!(matches!(err, WebArcError::InvalidHeader { .. }));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut header = WarcHeader::new("1.0");
        header.fields.add("WARC-Type", "response");
        header.fields.add("Content-Length", "12");

        let bytes = header.to_bytes();
        assert_eq!(bytes.len() as u64, header.byte_len());
        assert!(bytes.starts_with(b"WARC/1.0\r\n"));
        assert!(bytes.ends_with(b"\r\n\r\n"));

        let reparsed = WarcHeader::parse(&bytes).unwrap();
        assert_eq!(reparsed, header);
    }
}
