//! Sample ingestion from text streams.

use std::io::Cursor;

use mbench::input::read_samples;
use mbench::{catalog, Alignment, BenchError, Precision};

/// Samples are read in the precision of the operation they feed.
#[test]
fn test_reads_in_operation_precision() {
    let text = "0.1 0.2\n0.3";
    let single = read_samples(
        Cursor::new(text),
        catalog::resolve("expf").unwrap().precision(),
        Alignment::default(),
    )
    .unwrap();
    let double = read_samples(
        Cursor::new(text),
        catalog::resolve("exp").unwrap().precision(),
        Alignment::default(),
    )
    .unwrap();

    assert_eq!(single.as_f32(), Some(&[0.1f32, 0.2, 0.3][..]));
    assert_eq!(double.as_f64(), Some(&[0.1f64, 0.2, 0.3][..]));
}

/// The requested alignment is honoured, and never below the element's own.
#[test]
fn test_alignment() {
    for bytes in [1, 2, 8, 64, 4096] {
        let alignment = Alignment::new(bytes).unwrap();
        let samples = read_samples(Cursor::new("1 2 3"), Precision::Double, alignment).unwrap();
        let ptr = samples.as_f64().unwrap().as_ptr() as usize;
        let expected = (bytes as usize).max(8);
        assert_eq!(samples.alignment(), expected);
        assert_eq!(ptr % expected, 0);
    }
}

/// Invalid alignments are rejected.
#[test]
fn test_invalid_alignment() {
    for bytes in [0, -1, 3, 48] {
        assert!(matches!(
            Alignment::new(bytes),
            Err(BenchError::InvalidArgument { .. })
        ));
    }
}

/// Parse failures name the offending token.
#[test]
fn test_bad_literal() {
    let err = read_samples(Cursor::new("1.0 2,5"), Precision::Single, Alignment::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid numeric literal `2,5` at position 1");
}

/// Non-UTF-8 input is an I/O error, not a parse error.
#[test]
fn test_invalid_utf8() {
    let bytes: &[u8] = &[b'1', b' ', 0xff, 0xfe];
    let err = read_samples(bytes, Precision::Double, Alignment::default()).unwrap_err();
    assert!(matches!(err, BenchError::Io(_)));
}
