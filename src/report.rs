//! Text output: the one-line run summary and result dumps.
//!
//! Numbers follow C `printf` conventions (`%e`, `%*.*f`) so output stays
//! comparable with other benchmarking tools.

use std::io::{self, Write};

use crate::buffer::{Element, SampleBuffer};
use crate::driver::RunSummary;
use crate::fenv::ExceptionSummary;
use crate::reference::ErrorReport;

/// Formats `x` like C's `%.<precision>e`: at least two exponent digits and
/// an explicit exponent sign, e.g. `1.234568e-01`.
pub fn format_exp(x: f64, precision: usize) -> String {
    if let Some(s) = non_finite(x) {
        return s.to_owned();
    }
    let s = format!("{x:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

/// Formats `x` like C's `%*.*f` with the given field width and precision.
/// `None` selects C's default of six digits.
pub fn format_fixed(x: f64, width: usize, precision: Option<usize>) -> String {
    let precision = precision.unwrap_or(6);
    match non_finite(x) {
        Some(s) => format!("{s:>width$}"),
        None => format!("{x:>width$.precision$}"),
    }
}

fn non_finite(x: f64) -> Option<&'static str> {
    if x.is_nan() {
        Some(if x.is_sign_negative() { "-nan" } else { "nan" })
    } else if x.is_infinite() {
        Some(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        None
    }
}

/// Layout of printed result values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueFormat {
    /// Minimum field width.
    pub width: usize,
    /// Digits after the decimal point; `None` means six.
    pub precision: Option<usize>,
}

/// Writes every value, space-delimited, followed by a newline.
pub fn write_values<W: Write>(out: &mut W, values: &SampleBuffer, format: ValueFormat) -> io::Result<()> {
    match values {
        SampleBuffer::F32(v) => write_typed(out, v, format),
        SampleBuffer::F64(v) => write_typed(out, v, format),
    }
}

fn write_typed<W: Write, T: Element>(out: &mut W, values: &[T], format: ValueFormat) -> io::Result<()> {
    for (i, &x) in values.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        out.write_all(format_fixed(x.widen(), format.width, format.precision).as_bytes())?;
    }
    out.write_all(b"\n")
}

/// The summary line printed after a run, without a trailing newline.
///
/// `accuracy` is appended when a reference error report is available.
pub fn summary_line(
    run: &RunSummary,
    exceptions: ExceptionSummary,
    accuracy: Option<&ErrorReport>,
) -> String {
    let mut line = format!(
        "{:.6} seconds {} repetitions {} ops {:.6} Mops/s exceptions: {}",
        run.elapsed.as_secs_f64(),
        run.repetitions,
        run.ops,
        run.mops(),
        exceptions
    );
    if let Some(report) = accuracy {
        line.push_str(&format!(
            " absolute error: {} relative error: {} (exceptions: {})",
            format_exp(report.abs_error, 6),
            format_exp(report.rel_error, 6),
            report.exceptions
        ));
    }
    line
}
