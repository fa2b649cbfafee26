//! MPFR backend, via `rug` and `gmp-mpfr-sys`.

use std::cmp::Ordering;

use gmp_mpfr_sys::mpfr;
use rug::float::{self, Round};
use rug::ops::AssignRound;
use rug::Float;

use super::{ErrorReport, ReferenceFlags, WorkingPrecision};
use crate::buffer::{Element, SampleBuffer};
use crate::catalog::MathFunction;
use crate::error::{invalid_argument, Result};
use crate::round::RoundingMode;

pub(super) fn resolve_precision(precision: WorkingPrecision) -> Result<u32> {
    let bits = match precision {
        WorkingPrecision::Default => {
            // SAFETY: reads a global without side effects.
            let prec = unsafe { mpfr::get_default_prec() };
            u32::try_from(prec)
                .map_err(|_| invalid_argument(format!("MPFR default precision {prec} is out of range")))?
        }
        WorkingPrecision::Bits(bits) => bits,
    };
    if bits < float::prec_min() || bits > float::prec_max() {
        return Err(invalid_argument(format!(
            "working precision must be between {} and {} bits, got {bits}",
            float::prec_min(),
            float::prec_max()
        )));
    }
    Ok(bits)
}

/// Shapes have already been validated by the caller.
pub(super) fn estimate(
    function: MathFunction,
    samples: &SampleBuffer,
    results: &SampleBuffer,
    rounding: RoundingMode,
    bits: u32,
) -> ErrorReport {
    let round = rounding.to_mpfr();
    match (samples, results) {
        (SampleBuffer::F32(x), SampleBuffer::F32(y)) => measure(function, x, y, round, bits),
        (SampleBuffer::F64(x), SampleBuffer::F64(y)) => measure(function, x, y, round, bits),
        _ => ErrorReport::zero(),
    }
}

fn measure<T: Element>(
    function: MathFunction,
    samples: &[T],
    results: &[T],
    round: Round,
    bits: u32,
) -> ErrorReport {
    // SAFETY: MPFR flags are thread-local; only this thread's are touched.
    unsafe { mpfr::clear_flags() };

    let mut reference = Float::new(bits);
    let mut measured = Float::new(bits);
    let mut diff = Float::new(bits);
    let mut abs_max = Float::new(bits);
    let mut rel_max = Float::new(bits);

    for (&s, &r) in samples.iter().zip(results) {
        reference.assign_round(s.widen(), round);
        measured.assign_round(r.widen(), round);
        apply(function, &mut reference, round);

        diff.assign_round(&reference - &measured, round);
        diff.abs_mut();
        if greater(&diff, &abs_max) {
            abs_max.assign_round(&diff, round);
        }

        reference.abs_mut();
        measured.assign_round(&diff / &reference, round);
        if greater(&measured, &rel_max) {
            rel_max.assign_round(&measured, round);
        }
    }

    let abs_error = abs_max.to_f64_round(round);
    let rel_error = rel_max.to_f64_round(round);
    // SAFETY: as above.
    let flags = unsafe { mpfr::flags_save() };

    ErrorReport {
        abs_error,
        rel_error,
        exceptions: ReferenceFlags::from_bits_truncate(flags as u32),
    }
}

/// `a > b` with MPFR semantics: any NaN operand compares false and raises
/// the erange flag.
fn greater(a: &Float, b: &Float) -> bool {
    // SAFETY: both pointers come from live `Float`s.
    unsafe { mpfr::cmp(a.as_raw(), b.as_raw()) > 0 }
}

fn apply(function: MathFunction, x: &mut Float, round: Round) -> Ordering {
    match function {
        MathFunction::Cos => x.cos_round(round),
        MathFunction::Sin => x.sin_round(round),
        MathFunction::Tan => x.tan_round(round),
        MathFunction::Acos => x.acos_round(round),
        MathFunction::Asin => x.asin_round(round),
        MathFunction::Atan => x.atan_round(round),
        MathFunction::Cosh => x.cosh_round(round),
        MathFunction::Sinh => x.sinh_round(round),
        MathFunction::Tanh => x.tanh_round(round),
        MathFunction::Acosh => x.acosh_round(round),
        MathFunction::Asinh => x.asinh_round(round),
        MathFunction::Atanh => x.atanh_round(round),
        MathFunction::Exp => x.exp_round(round),
        MathFunction::Ln => x.ln_round(round),
        MathFunction::Log10 => x.log10_round(round),
        MathFunction::Exp2 => x.exp2_round(round),
        MathFunction::ExpM1 => x.exp_m1_round(round),
        MathFunction::Ln1p => x.ln_1p_round(round),
        MathFunction::Log2 => x.log2_round(round),
        MathFunction::Sqrt => x.sqrt_round(round),
        MathFunction::Cbrt => x.cbrt_round(round),
        MathFunction::Erf => x.erf_round(round),
        MathFunction::Erfc => x.erfc_round(round),
        MathFunction::Gamma => x.gamma_round(round),
        MathFunction::LnAbsGamma => {
            let (_sign, dir) = x.ln_abs_gamma_round(round);
            dir
        }
    }
}
