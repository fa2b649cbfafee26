//! Reading samples from a text stream.
//!
//! The format is a whitespace-separated list of floating-point literals
//! (decimal or exponent notation, `inf`, `nan`). Storage grows as needed and
//! a growth failure aborts the read instead of truncating the input.

use std::io::BufRead;

use tracing::debug;

use crate::buffer::{Element, Precision, SampleBuffer};
use crate::error::{BenchError, Result};
use crate::utils::{AlignedVec, Alignment};

/// Capacity reserved before the first literal is read.
pub const INITIAL_CAPACITY: usize = 32_768;

/// Parses every literal in `reader` into a buffer of the given precision.
///
/// # Errors
///
/// - [`BenchError::Parse`] on the first token that is not a valid literal.
/// - [`BenchError::Io`] if reading fails or the input is not UTF-8.
/// - [`BenchError::AllocationError`] if storage cannot grow.
///
/// # Examples
///
/// ```rust
/// use mbench::input::read_samples;
/// use mbench::{Alignment, Precision};
///
/// let samples = read_samples(&b"1 2.5\n-3e2"[..], Precision::Double, Alignment::default()).unwrap();
/// assert_eq!(samples.as_f64(), Some(&[1.0, 2.5, -300.0][..]));
/// ```
pub fn read_samples<R: BufRead>(
    reader: R,
    precision: Precision,
    alignment: Alignment,
) -> Result<SampleBuffer> {
    let samples = match precision {
        Precision::Single => read_typed::<f32, R>(reader, alignment).map(SampleBuffer::F32),
        Precision::Double => read_typed::<f64, R>(reader, alignment).map(SampleBuffer::F64),
    }?;
    debug!(len = samples.len(), %precision, "samples read");
    Ok(samples)
}

fn read_typed<T: Element, R: BufRead>(reader: R, alignment: Alignment) -> Result<AlignedVec<T>> {
    let mut values = AlignedVec::with_capacity(INITIAL_CAPACITY, alignment)?;
    let mut index = 0;
    for line in reader.lines() {
        let line = line?;
        for token in line.split_whitespace() {
            let value = token.parse::<T>().map_err(|_| BenchError::Parse {
                token: token.to_owned(),
                index,
            })?;
            values.push(value)?;
            index += 1;
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_mixed_whitespace() {
        let s = read_samples(&b"  1\t2\n\n3 \r\n4"[..], Precision::Single, Alignment::default())
            .unwrap();
        assert_eq!(s.as_f32(), Some(&[1.0f32, 2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_special_values() {
        let s = read_samples(&b"inf -inf nan 1e-310"[..], Precision::Double, Alignment::default())
            .unwrap();
        let v = s.as_f64().unwrap();
        assert_eq!(v[0], f64::INFINITY);
        assert_eq!(v[1], f64::NEG_INFINITY);
        assert!(v[2].is_nan());
        assert!(v[3] > 0.0 && v[3] < f64::MIN_POSITIVE);
    }

    #[test]
    fn test_parse_error_reports_token_and_position() {
        let err = read_samples(&b"1 2 x3 4"[..], Precision::Double, Alignment::default())
            .unwrap_err();
        match err {
            BenchError::Parse { token, index } => {
                assert_eq!(token, "x3");
                assert_eq!(index, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let s = read_samples(&b" \n "[..], Precision::Double, Alignment::new(64).unwrap()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.alignment(), 64);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let text: String = (0..INITIAL_CAPACITY + 10).map(|i| format!("{i} ")).collect();
        let s = read_samples(text.as_bytes(), Precision::Double, Alignment::default()).unwrap();
        assert_eq!(s.len(), INITIAL_CAPACITY + 10);
        assert_eq!(s.get(INITIAL_CAPACITY + 9), Some((INITIAL_CAPACITY + 9) as f64));
    }
}
