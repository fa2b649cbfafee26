//! x86-64 backend: SSE MXCSR plus the legacy x87 unit.
//!
//! Scalar `f32`/`f64` math runs on SSE, but the platform math library may
//! still use x87 instructions internally (e.g. for `long double` reductions),
//! so flags are read from both units and rounding is applied to both.

use super::ExceptionFlags;
use crate::round::RoundingMode;

// Status bits, identical in MXCSR and the x87 status word.
const INVALID: u32 = 1 << 0;
const DIVIDE_BY_ZERO: u32 = 1 << 2;
const OVERFLOW: u32 = 1 << 3;
const UNDERFLOW: u32 = 1 << 4;
const INEXACT: u32 = 1 << 5;
const STATUS_MASK: u32 = INVALID | (1 << 1) | DIVIDE_BY_ZERO | OVERFLOW | UNDERFLOW | INEXACT;

// MXCSR RC field, bits 13-14.
const MXCSR_ROUNDING_SHIFT: u32 = 13;
// x87 control word RC field, bits 10-11.
const X87_ROUNDING_SHIFT: u32 = 10;
const ROUNDING_MASK: u32 = 0b11;

pub(super) fn clear() {
    set_mxcsr(get_mxcsr() & !STATUS_MASK);
    x87_clear();
}

pub(super) fn capture() -> ExceptionFlags {
    from_bits(get_mxcsr() | u32::from(x87_status()))
}

pub(super) fn raise(flags: ExceptionFlags) {
    // Exceptions are masked, so setting the sticky bits never traps.
    set_mxcsr(get_mxcsr() | to_bits(flags));
}

pub(super) fn rounding() -> RoundingMode {
    match (get_mxcsr() >> MXCSR_ROUNDING_SHIFT) & ROUNDING_MASK {
        0b00 => RoundingMode::ToNearest,
        0b01 => RoundingMode::Downward,
        0b10 => RoundingMode::Upward,
        _ => RoundingMode::TowardZero,
    }
}

pub(super) fn set_rounding(mode: RoundingMode) {
    let rc = match mode {
        RoundingMode::ToNearest => 0b00,
        RoundingMode::Downward => 0b01,
        RoundingMode::Upward => 0b10,
        RoundingMode::TowardZero => 0b11,
    };
    let mxcsr = get_mxcsr() & !(ROUNDING_MASK << MXCSR_ROUNDING_SHIFT);
    set_mxcsr(mxcsr | (rc << MXCSR_ROUNDING_SHIFT));

    let cw = u32::from(x87_control()) & !(ROUNDING_MASK << X87_ROUNDING_SHIFT);
    x87_set_control((cw | (rc << X87_ROUNDING_SHIFT)) as u16);
}

fn from_bits(bits: u32) -> ExceptionFlags {
    let mut flags = ExceptionFlags::empty();
    for (bit, flag) in TABLE {
        if bits & bit != 0 {
            flags |= flag;
        }
    }
    flags
}

fn to_bits(flags: ExceptionFlags) -> u32 {
    TABLE
        .into_iter()
        .filter(|(_, flag)| flags.contains(*flag))
        .fold(0, |acc, (bit, _)| acc | bit)
}

const TABLE: [(u32, ExceptionFlags); 5] = [
    (INVALID, ExceptionFlags::INVALID),
    (DIVIDE_BY_ZERO, ExceptionFlags::DIVIDE_BY_ZERO),
    (OVERFLOW, ExceptionFlags::OVERFLOW),
    (UNDERFLOW, ExceptionFlags::UNDERFLOW),
    (INEXACT, ExceptionFlags::INEXACT),
];

// The asm blocks below may touch memory, so the compiler keeps stores of
// computed results on the correct side of a clear or capture.

#[inline(always)]
fn get_mxcsr() -> u32 {
    let mut mxcsr: u32 = 0;
    unsafe {
        core::arch::asm!(
            "stmxcsr [{}]",
            in(reg) &mut mxcsr,
            options(nostack, preserves_flags)
        );
    }
    mxcsr
}

#[inline(always)]
fn set_mxcsr(mxcsr: u32) {
    unsafe {
        core::arch::asm!(
            "ldmxcsr [{}]",
            in(reg) &mxcsr,
            options(nostack, preserves_flags)
        );
    }
}

#[inline(always)]
fn x87_status() -> u16 {
    let status: u16;
    unsafe {
        core::arch::asm!(
            "fnstsw ax",
            out("ax") status,
            options(nostack, preserves_flags)
        );
    }
    status
}

#[inline(always)]
fn x87_clear() {
    unsafe {
        core::arch::asm!("fnclex", options(nostack, preserves_flags));
    }
}

#[inline(always)]
fn x87_control() -> u16 {
    let mut cw: u16 = 0;
    unsafe {
        core::arch::asm!(
            "fnstcw word ptr [{}]",
            in(reg) &mut cw,
            options(nostack, preserves_flags)
        );
    }
    cw
}

#[inline(always)]
fn x87_set_control(cw: u16) {
    unsafe {
        core::arch::asm!(
            "fldcw word ptr [{}]",
            in(reg) &cw,
            options(nostack, preserves_flags)
        );
    }
}
