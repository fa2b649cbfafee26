//! Typed, aligned storage for samples and results.
//!
//! Operations come in two precision classes, so buffers are a small enum over
//! [`AlignedVec<f32>`] and [`AlignedVec<f64>`]. Generic code reaches the
//! typed slice through the [`Element`] trait instead of matching on the enum
//! at every call site.

use std::fmt;
use std::str::FromStr;

use crate::catalog::Operation;
use crate::error::{invalid_argument, BenchError, Result};
use crate::fenv::ExceptionSummary;
use crate::utils::{AlignedVec, Alignment};

/// Precision class of an operation or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// IEEE-754 binary32.
    Single,
    /// IEEE-754 binary64.
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => f.pad("f32"),
            Precision::Double => f.pad("f64"),
        }
    }
}

impl FromStr for Precision {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f32" | "single" => Ok(Precision::Single),
            "f64" | "double" => Ok(Precision::Double),
            other => Err(invalid_argument(format!("unknown precision `{other}`"))),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Floating-point element types a buffer can hold.
///
/// Implemented for `f32` and `f64` only. The all-zero bit pattern must be a
/// valid value, which [`AlignedVec`] relies on for zero-initialisation.
pub trait Element:
    num::Float
    + Default
    + Send
    + Sync
    + fmt::Debug
    + fmt::Display
    + FromStr
    + sealed::Sealed
    + 'static
{
    /// The precision class of this element type.
    const PRECISION: Precision;

    /// Borrows the typed contents of `buffer`, if it holds this type.
    fn slice(buffer: &SampleBuffer) -> Option<&[Self]>;

    /// Mutably borrows the typed contents of `buffer`, if it holds this type.
    fn slice_mut(buffer: &mut SampleBuffer) -> Option<&mut [Self]>;

    /// Wraps typed storage into the buffer enum.
    fn wrap(values: AlignedVec<Self>) -> SampleBuffer;

    /// Exact conversion to `f64`.
    fn widen(self) -> f64;
}

impl Element for f32 {
    const PRECISION: Precision = Precision::Single;

    fn slice(buffer: &SampleBuffer) -> Option<&[Self]> {
        match buffer {
            SampleBuffer::F32(v) => Some(&v[..]),
            SampleBuffer::F64(_) => None,
        }
    }

    fn slice_mut(buffer: &mut SampleBuffer) -> Option<&mut [Self]> {
        match buffer {
            SampleBuffer::F32(v) => Some(&mut v[..]),
            SampleBuffer::F64(_) => None,
        }
    }

    fn wrap(values: AlignedVec<Self>) -> SampleBuffer {
        SampleBuffer::F32(values)
    }

    #[inline(always)]
    fn widen(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f64 {
    const PRECISION: Precision = Precision::Double;

    fn slice(buffer: &SampleBuffer) -> Option<&[Self]> {
        match buffer {
            SampleBuffer::F64(v) => Some(&v[..]),
            SampleBuffer::F32(_) => None,
        }
    }

    fn slice_mut(buffer: &mut SampleBuffer) -> Option<&mut [Self]> {
        match buffer {
            SampleBuffer::F64(v) => Some(&mut v[..]),
            SampleBuffer::F32(_) => None,
        }
    }

    fn wrap(values: AlignedVec<Self>) -> SampleBuffer {
        SampleBuffer::F64(values)
    }

    #[inline(always)]
    fn widen(self) -> f64 {
        self
    }
}

/// A contiguous, aligned array of samples of one precision class.
///
/// The same storage type backs [`ResultBuffer`] values.
#[derive(Debug)]
pub enum SampleBuffer {
    /// Single-precision storage.
    F32(AlignedVec<f32>),
    /// Double-precision storage.
    F64(AlignedVec<f64>),
}

impl SampleBuffer {
    /// Creates `len` zeros of the given precision.
    pub fn zeroed(precision: Precision, len: usize, alignment: Alignment) -> Result<Self> {
        Ok(match precision {
            Precision::Single => SampleBuffer::F32(AlignedVec::zeroed(len, alignment)?),
            Precision::Double => SampleBuffer::F64(AlignedVec::zeroed(len, alignment)?),
        })
    }

    /// Copies `values` into a new aligned buffer.
    pub fn from_slice<T: Element>(values: &[T], alignment: Alignment) -> Result<Self> {
        AlignedVec::from_slice(values, alignment).map(T::wrap)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::F64(v) => v.len(),
        }
    }

    /// `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element precision.
    pub fn precision(&self) -> Precision {
        match self {
            SampleBuffer::F32(_) => Precision::Single,
            SampleBuffer::F64(_) => Precision::Double,
        }
    }

    /// Alignment of the underlying allocation in bytes.
    pub fn alignment(&self) -> usize {
        match self {
            SampleBuffer::F32(v) => v.alignment(),
            SampleBuffer::F64(v) => v.alignment(),
        }
    }

    /// The contents as `f32`, if this is single-precision storage.
    pub fn as_f32(&self) -> Option<&[f32]> {
        f32::slice(self)
    }

    /// The contents as `f64`, if this is double-precision storage.
    pub fn as_f64(&self) -> Option<&[f64]> {
        f64::slice(self)
    }

    /// Element at `index` widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            SampleBuffer::F32(v) => v.get(index).map(|x| x.widen()),
            SampleBuffer::F64(v) => v.get(index).copied(),
        }
    }

    /// Bitwise comparison, so two NaNs with the same payload compare equal.
    pub fn bitwise_eq(&self, other: &SampleBuffer) -> bool {
        match (self, other) {
            (SampleBuffer::F32(a), SampleBuffer::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (SampleBuffer::F64(a), SampleBuffer::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }

    fn zeroed_like(&self) -> Result<Self> {
        let alignment = Alignment::new(self.alignment() as i64)?;
        SampleBuffer::zeroed(self.precision(), self.len(), alignment)
    }
}

/// Output of a batch: one value per sample plus the exception summary of the
/// most recent batch.
///
/// Values are overwritten, never accumulated, by every batch.
#[derive(Debug)]
pub struct ResultBuffer {
    values: SampleBuffer,
    exceptions: ExceptionSummary,
}

impl ResultBuffer {
    /// Zero-initialised results of the given precision.
    pub fn zeroed(precision: Precision, len: usize, alignment: Alignment) -> Result<Self> {
        Ok(ResultBuffer {
            values: SampleBuffer::zeroed(precision, len, alignment)?,
            exceptions: ExceptionSummary::default(),
        })
    }

    /// Zero-initialised results sized for running `op` over `samples`.
    pub fn for_operation(op: &Operation, samples: &SampleBuffer) -> Result<Self> {
        let alignment = Alignment::new(samples.alignment() as i64)?;
        Self::zeroed(op.precision(), samples.len(), alignment)
    }

    /// A fresh zeroed buffer with this buffer's shape and alignment.
    pub fn zeroed_like(&self) -> Result<Self> {
        Ok(ResultBuffer {
            values: self.values.zeroed_like()?,
            exceptions: ExceptionSummary::default(),
        })
    }

    /// The result values.
    pub fn values(&self) -> &SampleBuffer {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut SampleBuffer {
        &mut self.values
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if there are no results.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Result precision.
    pub fn precision(&self) -> Precision {
        self.values.precision()
    }

    /// Exceptions raised by the most recent batch, inexact excluded.
    pub fn exceptions(&self) -> ExceptionSummary {
        self.exceptions
    }

    pub(crate) fn set_exceptions(&mut self, summary: ExceptionSummary) {
        self.exceptions = summary;
    }
}
