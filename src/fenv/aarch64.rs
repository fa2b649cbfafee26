//! ARM64 backend: FPSR cumulative flags and the FPCR rounding field.

use super::ExceptionFlags;
use crate::round::RoundingMode;

const IOC: u64 = 1 << 0;
const DZC: u64 = 1 << 1;
const OFC: u64 = 1 << 2;
const UFC: u64 = 1 << 3;
const IXC: u64 = 1 << 4;
const IDC: u64 = 1 << 7;
const STATUS_MASK: u64 = IOC | DZC | OFC | UFC | IXC | IDC;

// FPCR RMode, bits 22-23.
const RMODE_SHIFT: u64 = 22;
const RMODE_MASK: u64 = 0b11 << RMODE_SHIFT;

const TABLE: [(u64, ExceptionFlags); 5] = [
    (IOC, ExceptionFlags::INVALID),
    (DZC, ExceptionFlags::DIVIDE_BY_ZERO),
    (OFC, ExceptionFlags::OVERFLOW),
    (UFC, ExceptionFlags::UNDERFLOW),
    (IXC, ExceptionFlags::INEXACT),
];

pub(super) fn clear() {
    set_fpsr(get_fpsr() & !STATUS_MASK);
}

pub(super) fn capture() -> ExceptionFlags {
    let fpsr = get_fpsr();
    let mut flags = ExceptionFlags::empty();
    for (bit, flag) in TABLE {
        if fpsr & bit != 0 {
            flags |= flag;
        }
    }
    flags
}

pub(super) fn raise(flags: ExceptionFlags) {
    let bits = TABLE
        .into_iter()
        .filter(|(_, flag)| flags.contains(*flag))
        .fold(0, |acc, (bit, _)| acc | bit);
    set_fpsr(get_fpsr() | bits);
}

pub(super) fn rounding() -> RoundingMode {
    match (get_fpcr() & RMODE_MASK) >> RMODE_SHIFT {
        0b00 => RoundingMode::ToNearest,
        0b01 => RoundingMode::Upward,
        0b10 => RoundingMode::Downward,
        _ => RoundingMode::TowardZero,
    }
}

pub(super) fn set_rounding(mode: RoundingMode) {
    let rmode: u64 = match mode {
        RoundingMode::ToNearest => 0b00,
        RoundingMode::Upward => 0b01,
        RoundingMode::Downward => 0b10,
        RoundingMode::TowardZero => 0b11,
    };
    set_fpcr((get_fpcr() & !RMODE_MASK) | (rmode << RMODE_SHIFT));
}

#[inline(always)]
fn get_fpsr() -> u64 {
    let fpsr: u64;
    unsafe {
        core::arch::asm!(
            "mrs {fpsr}, fpsr",
            fpsr = out(reg) fpsr,
            options(nostack, preserves_flags)
        );
    }
    fpsr
}

#[inline(always)]
fn set_fpsr(fpsr: u64) {
    unsafe {
        core::arch::asm!(
            "msr fpsr, {fpsr}",
            fpsr = in(reg) fpsr,
            options(nostack, preserves_flags)
        );
    }
}

#[inline(always)]
fn get_fpcr() -> u64 {
    let fpcr: u64;
    unsafe {
        core::arch::asm!(
            "mrs {fpcr}, fpcr",
            fpcr = out(reg) fpcr,
            options(nomem, nostack, preserves_flags)
        );
    }
    fpcr
}

#[inline(always)]
fn set_fpcr(fpcr: u64) {
    unsafe {
        core::arch::asm!(
            "msr fpcr, {fpcr}",
            fpcr = in(reg) fpcr,
            options(nostack, preserves_flags)
        );
    }
}
