//! End-to-end container behavior over on-disk sources.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use webarc_container::{BlockFields, ContentBlock, WarcContainer};
use webarc_core::source::HandleCache;

/// Append one record (header, body, inter-record delimiter) to `out`.
fn push_record(out: &mut Vec<u8>, extra_fields: &[(&str, &str)], body: &[u8]) {
    out.extend_from_slice(b"WARC/1.0\r\n");
    for (name, value) in extra_fields {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.extend_from_slice(b"\r\n\r\n");
}

fn sample_warc() -> Vec<u8> {
    let mut data = Vec::new();

    push_record(
        &mut data,
        &[
            ("WARC-Type", "warcinfo"),
            ("WARC-Record-ID", "<urn:uuid:00000000-0000-0000-0000-000000000001>"),
            ("WARC-Date", "2013-02-12T03:04:05Z"),
            ("Content-Type", "application/warc-fields"),
        ],
        b"software: webarc\r\n\r\n",
    );

    push_record(
        &mut data,
        &[
            ("WARC-Type", "response"),
            ("WARC-Record-ID", "<urn:uuid:00000000-0000-0000-0000-000000000002>"),
            ("WARC-Date", "2013-02-12T03:04:06Z"),
            ("WARC-Target-URI", "http://example.com/"),
            ("Content-Type", "application/http; msgtype=response"),
        ],
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello",
    );

    push_record(
        &mut data,
        &[
            ("WARC-Type", "resource"),
            ("WARC-Record-ID", "<urn:uuid:00000000-0000-0000-0000-000000000003>"),
            ("WARC-Date", "2013-02-12T03:04:07Z"),
            ("Content-Type", "image/png"),
        ],
        &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
    );

    data
}

#[test]
fn load_from_disk_and_materialize_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.warc");
    std::fs::write(&path, sample_warc()).unwrap();

    let container = WarcContainer::load(&path).unwrap();
    assert_eq!(container.len(), 3);
    assert_eq!(container.records[0].warc_type(), Some("warcinfo"));
    assert_eq!(container.records[1].warc_type(), Some("response"));
    assert_eq!(container.records[2].warc_type(), Some("resource"));

    let mut cache = HandleCache::default();

    let ContentBlock::WithPayload(block) = &container.records[1].content_block else {
        panic!("expected a block with payload");
    };
    let BlockFields::Http(http) = &block.fields else {
        panic!("expected HTTP fields");
    };
    assert_eq!(http.status, "HTTP/1.1 200 OK");
    assert_eq!(block.payload.read_all(&mut cache).unwrap(), b"hello");

    let ContentBlock::Binary(block) = &container.records[2].content_block else {
        panic!("expected a binary block");
    };
    assert_eq!(
        block.source.read_all(&mut cache).unwrap(),
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
    );

    // The materializations went through one cached handle.
    assert_eq!(cache.len(), 1);
}

#[test]
fn load_gzip_compressed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.warc.gz");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&sample_warc()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let container = WarcContainer::load(&path).unwrap();
    assert_eq!(container.len(), 3);

    // Payload offsets address the decompressed stream.
    let mut cache = HandleCache::default();
    let ContentBlock::WithPayload(block) = &container.records[1].content_block else {
        panic!("expected a block with payload");
    };
    assert_eq!(block.payload.read_all(&mut cache).unwrap(), b"hello");
}

#[test]
fn serialization_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.warc");
    let original = sample_warc();
    std::fs::write(&path, &original).unwrap();

    let container = WarcContainer::load(&path).unwrap();
    let mut cache = HandleCache::default();
    let bytes = container.to_bytes(&mut cache).unwrap();
    assert_eq!(bytes, original);

    let reparsed = WarcContainer::from_bytes(bytes).unwrap();
    assert_eq!(reparsed.len(), container.len());
    for (a, b) in container.records.iter().zip(&reparsed.records) {
        assert_eq!(a.header, b.header);
        assert_eq!(
            a.to_bytes(&mut cache).unwrap(),
            b.to_bytes(&mut cache).unwrap()
        );
    }
}

#[test]
fn preserve_block_keeps_exact_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.warc");
    let original = sample_warc();
    std::fs::write(&path, &original).unwrap();

    let mut stream = WarcContainer::open(&path, false).unwrap();
    let mut container = WarcContainer::new();
    loop {
        let (record, has_more) = WarcContainer::read_record(&mut stream, true).unwrap();
        container.records.push(record);
        if !has_more {
            break;
        }
    }

    for record in &container.records {
        assert!(matches!(record.content_block, ContentBlock::Binary(_)));
    }

    let mut cache = HandleCache::default();
    assert_eq!(container.to_bytes(&mut cache).unwrap(), original);
}

#[test]
fn corrected_length_survives_reparse() {
    // Padding in the embedded field value makes the declared length
    // overstate the recomputed one; the header is corrected on parse.
    let mut data = Vec::new();
    push_record(
        &mut data,
        &[("Content-Type", "application/warc-fields")],
        b"Name:    padded\r\n\r\npayload",
    );

    let container = WarcContainer::from_bytes(data).unwrap();
    let corrected = container.records[0].content_length().unwrap();
    assert_eq!(corrected, container.records[0].content_block.length());
    assert!(corrected < b"Name:    padded\r\n\r\npayload".len() as u64);

    // Reserializing and reparsing is stable: no further correction.
    let mut cache = HandleCache::default();
    let bytes = container.to_bytes(&mut cache).unwrap();
    let reparsed = WarcContainer::from_bytes(bytes).unwrap();
    assert_eq!(reparsed.records[0].content_length().unwrap(), corrected);
    assert_eq!(reparsed.records[0].header, container.records[0].header);
}
