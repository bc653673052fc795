use std::sync::Arc;

use binstream::{
    Backing, BufferStream, DecodeRequest, DecoderRegistry, Error, FileBacking, FileStream,
    Stream, StreamOptions, TextEncoding, Tracker, Value, Whence,
};
use tempfile::NamedTempFile;

fn file_with(bytes: &[u8]) -> NamedTempFile {
    use std::io::Write;
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    tmp
}

/// Properties both backings must share.
fn check_read_peek<B: Backing>(mut s: Stream<B>, backing_bytes: &[u8]) {
    let start = s.start() as usize;
    for k in 0..=s.remaining() as usize {
        s.rewind();
        let peeked = s.peek(Some(k)).unwrap();
        assert_eq!(peeked, s.peek(Some(k)).unwrap());
        assert_eq!(s.tell(), 0);
        let read = s.read(Some(k)).unwrap();
        assert_eq!(read, peeked);
        assert_eq!(read, &backing_bytes[start..start + k]);
        assert_eq!(s.tell(), k as u64);
    }

    s.rewind();
    let too_many = s.remaining() as usize + 1;
    assert!(matches!(
        s.read(Some(too_many)),
        Err(Error::Overrun { position: 0, .. })
    ));
    assert_eq!(s.tell(), 0);
}

#[test]
fn read_and_peek_agree_on_buffers() {
    let bytes: Vec<u8> = (0..16).collect();
    let opts = StreamOptions::new().start(3).max_length(7);
    check_read_peek(BufferStream::from_bytes(bytes.clone(), opts).unwrap(), &bytes);
}

#[test]
fn read_and_peek_agree_on_files() {
    let bytes: Vec<u8> = (0..16).collect();
    let tmp = file_with(&bytes);
    let opts = StreamOptions::new().start(3).max_length(7);
    check_read_peek(FileStream::open(tmp.path(), opts).unwrap(), &bytes);
}

#[test]
fn uint16_pairs() {
    let mut s = BufferStream::from_bytes(vec![0x01, 0x00, 0x02, 0x00], StreamOptions::default()).unwrap();
    let values = [s.read_uint16().unwrap(), s.read_uint16().unwrap()];
    assert_eq!(values, [1, 2]);

    let mut s = BufferStream::from_bytes(vec![0x00, 0x01], StreamOptions::default()).unwrap();
    assert_eq!(s.read_uint16_be().unwrap(), 1);
}

#[test]
fn null_terminated_field_consumes_full_span() {
    let tmp = file_with(b"AB\0CD\0!");
    let mut s = FileStream::open(tmp.path(), StreamOptions::default()).unwrap();
    assert_eq!(s.read_string(6, TextEncoding::Utf8).unwrap(), "AB");
    assert_eq!(s.tell(), 6);
    assert_eq!(s.read_string(1, TextEncoding::Ascii).unwrap(), "!");
}

#[test]
fn registry_over_file_slices_with_tracking() {
    let mut bytes = vec![0u8; 4];
    bytes.extend_from_slice(&3.5f32.to_be_bytes());
    bytes.push(1);
    bytes.extend_from_slice(&(-7i16).to_le_bytes());
    let tmp = file_with(&bytes);

    let tracker = Arc::new(Tracker::enabled());
    let mut s = FileStream::open(tmp.path(), StreamOptions::default())
        .unwrap()
        .with_sink(tracker.clone());
    s.seek(4, Whence::Start).unwrap();
    let mut body = s.slice(7, 0).unwrap();

    let registry = DecoderRegistry::<FileBacking>::default();
    let requests: Vec<DecodeRequest> = ["floatbe", "bool8", "int16le"]
        .iter()
        .map(|r| r.parse().unwrap())
        .collect();
    let values = registry.decode_all(&mut body, &requests).unwrap();
    assert_eq!(values, vec![Value::Float(3.5), Value::Bool(true), Value::Int(-7)]);
    assert_eq!(tracker.buffer(), values);
    assert!(s.is_eof());
}
