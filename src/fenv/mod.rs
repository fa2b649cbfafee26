//! Floating-point exception state and rounding control.
//!
//! The hardware keeps sticky exception flags and the rounding direction in a
//! per-thread control/status register. This module exposes that state through
//! the [`FloatingPointEnv`] capability so the executor never touches it
//! implicitly and tests can substitute a fake.
//!
//! # Platform Support
//!
//! - **x86-64**: MXCSR (SSE) together with the x87 status and control words
//! - **ARM64**: FPSR flags and the FPCR rounding field
//! - **Fallback**: tracking disabled, rounding fixed to nearest

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::error::{invalid_argument, Result};
use crate::round::RoundingMode;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "x86_64")]
mod x86_64;

#[cfg(target_arch = "aarch64")]
use aarch64 as arch;
#[cfg(target_arch = "x86_64")]
use x86_64 as arch;

pub mod errno;

/// Set of IEEE-754 exception categories.
///
/// Bit positions are private to this crate; use the associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExceptionFlags(u8);

impl ExceptionFlags {
    /// Invalid operation, e.g. `sqrt(-1)`.
    pub const INVALID: Self = ExceptionFlags(1 << 0);
    /// Exact infinite result from finite operands, e.g. `log(0)`.
    pub const DIVIDE_BY_ZERO: Self = ExceptionFlags(1 << 1);
    /// Rounded result exceeds the largest finite value.
    pub const OVERFLOW: Self = ExceptionFlags(1 << 2);
    /// Tiny, inexact result.
    pub const UNDERFLOW: Self = ExceptionFlags(1 << 3);
    /// Rounded result differs from the exact one.
    pub const INEXACT: Self = ExceptionFlags(1 << 4);
    /// Every category.
    pub const ALL: Self = ExceptionFlags(0b1_1111);

    /// Canonical rendering order.
    const NAMES: [(ExceptionFlags, &'static str); 5] = [
        (ExceptionFlags::DIVIDE_BY_ZERO, "divide-by-zero"),
        (ExceptionFlags::INEXACT, "inexact"),
        (ExceptionFlags::INVALID, "invalid"),
        (ExceptionFlags::OVERFLOW, "overflow"),
        (ExceptionFlags::UNDERFLOW, "underflow"),
    ];

    /// The empty set.
    pub const fn empty() -> Self {
        ExceptionFlags(0)
    }

    /// `true` if no category is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every category in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The categories of `self` not in `other`.
    pub const fn without(self, other: Self) -> Self {
        ExceptionFlags(self.0 & !other.0)
    }

    /// Names of the set categories in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl BitOr for ExceptionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ExceptionFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ExceptionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ExceptionFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ExceptionFlags(self.0 & rhs.0)
    }
}

impl Not for ExceptionFlags {
    type Output = Self;
    fn not(self) -> Self {
        ExceptionFlags(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for ExceptionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Exceptions observed by one batch, or the fact that they could not be
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionSummary {
    flags: ExceptionFlags,
    tracked: bool,
}

impl ExceptionSummary {
    /// A summary from a tracker that observed `flags`.
    pub const fn tracked(flags: ExceptionFlags) -> Self {
        ExceptionSummary {
            flags,
            tracked: true,
        }
    }

    /// A summary from a tracker that cannot observe exceptions.
    pub const fn disabled() -> Self {
        ExceptionSummary {
            flags: ExceptionFlags::empty(),
            tracked: false,
        }
    }

    /// The observed categories; empty when tracking is disabled.
    pub fn flags(&self) -> ExceptionFlags {
        self.flags
    }

    /// `false` when exceptions could not be observed.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Union of two summaries. Tracking survives only if both were tracked.
    pub fn merge(self, other: Self) -> Self {
        ExceptionSummary {
            flags: self.flags | other.flags,
            tracked: self.tracked && other.tracked,
        }
    }
}

impl Default for ExceptionSummary {
    fn default() -> Self {
        ExceptionSummary::tracked(ExceptionFlags::empty())
    }
}

impl fmt::Display for ExceptionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tracked {
            return f.write_str("disabled");
        }
        fmt::Display::fmt(&self.flags, f)
    }
}

/// Access to the calling thread's floating-point environment.
///
/// Every method acts on the current thread only. Implementations that cannot
/// observe exceptions return `false` from [`is_supported`] and make
/// [`clear`], [`capture`] and [`raise`] no-ops.
///
/// [`is_supported`]: FloatingPointEnv::is_supported
/// [`clear`]: FloatingPointEnv::clear
/// [`capture`]: FloatingPointEnv::capture
/// [`raise`]: FloatingPointEnv::raise
pub trait FloatingPointEnv: Sync {
    /// `true` if exception flags can be observed on this target.
    fn is_supported(&self) -> bool;

    /// Clears every exception flag.
    fn clear(&self);

    /// Reads the categories in `mask`; other categories are left untouched.
    fn capture(&self, mask: ExceptionFlags) -> ExceptionFlags;

    /// Sets the given flags without trapping.
    fn raise(&self, flags: ExceptionFlags);

    /// Current rounding direction, if it can be read.
    fn rounding(&self) -> Option<RoundingMode>;

    /// Changes the rounding direction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BenchError::InvalidArgument`] if the mode cannot be
    /// applied on this target.
    fn set_rounding(&self, mode: RoundingMode) -> Result<()>;

    /// Captures `mask` as a summary, or a disabled summary when unsupported.
    fn summary(&self, mask: ExceptionFlags) -> ExceptionSummary {
        if self.is_supported() {
            ExceptionSummary::tracked(self.capture(mask))
        } else {
            ExceptionSummary::disabled()
        }
    }
}

impl<E: FloatingPointEnv + ?Sized> FloatingPointEnv for &E {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }
    fn clear(&self) {
        (**self).clear()
    }
    fn capture(&self, mask: ExceptionFlags) -> ExceptionFlags {
        (**self).capture(mask)
    }
    fn raise(&self, flags: ExceptionFlags) {
        (**self).raise(flags)
    }
    fn rounding(&self) -> Option<RoundingMode> {
        (**self).rounding()
    }
    fn set_rounding(&self, mode: RoundingMode) -> Result<()> {
        (**self).set_rounding(mode)
    }
}

/// The processor's floating-point environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareEnv;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
impl FloatingPointEnv for HardwareEnv {
    #[inline]
    fn is_supported(&self) -> bool {
        true
    }

    #[inline]
    fn clear(&self) {
        arch::clear();
    }

    #[inline]
    fn capture(&self, mask: ExceptionFlags) -> ExceptionFlags {
        arch::capture() & mask
    }

    fn raise(&self, flags: ExceptionFlags) {
        arch::raise(flags);
    }

    fn rounding(&self) -> Option<RoundingMode> {
        Some(arch::rounding())
    }

    fn set_rounding(&self, mode: RoundingMode) -> Result<()> {
        arch::set_rounding(mode);
        Ok(())
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
impl FloatingPointEnv for HardwareEnv {
    fn is_supported(&self) -> bool {
        false
    }
    fn clear(&self) {}
    fn capture(&self, _mask: ExceptionFlags) -> ExceptionFlags {
        ExceptionFlags::empty()
    }
    fn raise(&self, _flags: ExceptionFlags) {}
    fn rounding(&self) -> Option<RoundingMode> {
        None
    }
    fn set_rounding(&self, mode: RoundingMode) -> Result<()> {
        DisabledEnv.set_rounding(mode)
    }
}

/// An environment that never observes exceptions.
///
/// Batches run under it report `"disabled"`. Rounding stays at the default
/// round-to-nearest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEnv;

impl FloatingPointEnv for DisabledEnv {
    fn is_supported(&self) -> bool {
        false
    }
    fn clear(&self) {}
    fn capture(&self, _mask: ExceptionFlags) -> ExceptionFlags {
        ExceptionFlags::empty()
    }
    fn raise(&self, _flags: ExceptionFlags) {}
    fn rounding(&self) -> Option<RoundingMode> {
        None
    }
    fn set_rounding(&self, mode: RoundingMode) -> Result<()> {
        match mode {
            RoundingMode::ToNearest => Ok(()),
            other => Err(invalid_argument(format!(
                "rounding mode `{other}` is not available on this target"
            ))),
        }
    }
}

/// RAII guard that applies a rounding mode and restores the previous one on
/// drop.
///
/// Rounding is per-thread state, so the guard only affects the thread that
/// created it.
pub struct RoundingGuard<'e, E: FloatingPointEnv + ?Sized> {
    env: &'e E,
    previous: Option<RoundingMode>,
}

impl<'e, E: FloatingPointEnv + ?Sized> RoundingGuard<'e, E> {
    /// Switches the current thread to `mode`.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`FloatingPointEnv::set_rounding`].
    pub fn new(env: &'e E, mode: RoundingMode) -> Result<Self> {
        let previous = env.rounding();
        env.set_rounding(mode)?;
        Ok(RoundingGuard { env, previous })
    }
}

impl<E: FloatingPointEnv + ?Sized> Drop for RoundingGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            // Restoring a mode the environment reported cannot fail.
            let _ = self.env.set_rounding(previous);
        }
    }
}
