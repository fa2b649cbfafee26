//! Accuracy measurement against an extended-precision reference.
//!
//! For every sample the exact function is recomputed with GNU MPFR at a
//! configurable working precision, and the largest absolute and relative
//! deviations of the measured results are reported together with the MPFR
//! exception flags raised along the way.
//!
//! The backend is compiled only with the `mpfr` cargo feature. Without it
//! [`estimate`] fails with [`crate::BenchError::Unsupported`], which callers treat
//! as "no accuracy report".

use std::fmt;

#[cfg(feature = "mpfr")]
use crate::batch::validate;
use crate::buffer::{ResultBuffer, SampleBuffer};
use crate::catalog::Operation;
use crate::error::{invalid_argument, Result};
use crate::round::RoundingMode;

#[cfg(feature = "mpfr")]
mod mpfr;

/// Number of significand bits used for the reference computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkingPrecision {
    /// MPFR's process-wide default precision (53 bits unless changed).
    #[default]
    Default,
    /// An explicit precision in bits.
    Bits(u32),
}

impl WorkingPrecision {
    /// Maps a command-line value: `-1` selects the default, positive values
    /// select that many bits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BenchError::InvalidArgument`] for `0`, for negative values
    /// other than `-1` and for values that do not fit in `u32`.
    pub fn from_arg(bits: i64) -> Result<Self> {
        match bits {
            -1 => Ok(WorkingPrecision::Default),
            b if b > 0 => u32::try_from(b)
                .map(WorkingPrecision::Bits)
                .map_err(|_| invalid_argument(format!("working precision {b} is too large"))),
            b => Err(invalid_argument(format!(
                "working precision must be positive or -1, got {b}"
            ))),
        }
    }
}

impl fmt::Display for WorkingPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkingPrecision::Default => f.write_str("default"),
            WorkingPrecision::Bits(b) => write!(f, "{b} bits"),
        }
    }
}

/// Exception flags raised by the reference computation.
///
/// Bit values follow MPFR's own flag layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReferenceFlags(u32);

impl ReferenceFlags {
    /// Result too small to represent.
    pub const UNDERFLOW: Self = ReferenceFlags(1);
    /// Result too large to represent.
    pub const OVERFLOW: Self = ReferenceFlags(2);
    /// A NaN was produced; rendered as `invalid`.
    pub const INVALID: Self = ReferenceFlags(4);
    /// A result was rounded.
    pub const INEXACT: Self = ReferenceFlags(8);
    /// A comparison or conversion was out of range, e.g. involving NaN.
    pub const RANGE: Self = ReferenceFlags(16);
    /// Exact infinite result from finite operands.
    pub const DIVIDE_BY_ZERO: Self = ReferenceFlags(32);

    const NAMES: [(ReferenceFlags, &'static str); 6] = [
        (ReferenceFlags::DIVIDE_BY_ZERO, "divide-by-zero"),
        (ReferenceFlags::INEXACT, "inexact"),
        (ReferenceFlags::INVALID, "invalid"),
        (ReferenceFlags::OVERFLOW, "overflow"),
        (ReferenceFlags::UNDERFLOW, "underflow"),
        (ReferenceFlags::RANGE, "range"),
    ];

    /// No flags.
    pub const fn empty() -> Self {
        ReferenceFlags(0)
    }

    /// Builds a set from raw MPFR flag bits, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        ReferenceFlags(bits & 0b11_1111)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ReferenceFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ReferenceFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for ReferenceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Maximum deviations of one batch from the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorReport {
    /// Largest `|reference - result|`.
    pub abs_error: f64,
    /// Largest `|reference - result| / |reference|`. Not guarded against a
    /// zero reference, so it may be infinite or NaN.
    pub rel_error: f64,
    /// Flags raised during the reference computation.
    pub exceptions: ReferenceFlags,
}

impl ErrorReport {
    /// The report of an empty batch.
    pub const fn zero() -> Self {
        ErrorReport {
            abs_error: 0.0,
            rel_error: 0.0,
            exceptions: ReferenceFlags::empty(),
        }
    }
}

/// `true` if this build can compute reference errors.
pub fn is_available() -> bool {
    cfg!(feature = "mpfr")
}

/// Measures how far `results` deviates from `op`'s exact values at
/// `samples`.
///
/// Samples and results are converted to the working precision with
/// `rounding`, and every reference operation rounds the same way. Runs
/// sequentially on the calling thread.
///
/// # Errors
///
/// - [`crate::BenchError::Unsupported`] when built without the `mpfr` feature.
/// - [`crate::BenchError::InvalidArgument`] if the working precision is outside
///   MPFR's bounds.
/// - [`crate::BenchError::SizeMismatch`] / [`crate::BenchError::TypeMismatch`] as for
///   [`crate::BatchExecutor::execute`].
pub fn estimate(
    op: &Operation,
    samples: &SampleBuffer,
    results: &ResultBuffer,
    rounding: RoundingMode,
    precision: WorkingPrecision,
) -> Result<ErrorReport> {
    #[cfg(feature = "mpfr")]
    {
        validate(op, samples, results)?;
        let bits = mpfr::resolve_precision(precision)?;
        if samples.is_empty() {
            return Ok(ErrorReport::zero());
        }
        let report = mpfr::estimate(op.function(), samples, results.values(), rounding, bits);
        tracing::debug!(
            op = op.name(),
            bits,
            abs = report.abs_error,
            rel = report.rel_error,
            exceptions = %report.exceptions,
            "reference error"
        );
        Ok(report)
    }

    #[cfg(not(feature = "mpfr"))]
    {
        let _ = (op, samples, results, rounding, precision);
        Err(crate::BenchError::Unsupported)
    }
}
