//! The operation catalog.
//!
//! Each entry pairs a symbolic name with an executable kernel and the
//! mathematical function it approximates. The catalog is a static table:
//! adding an operation means adding one row, and no code branches on a
//! particular operation.
//!
//! Double-precision entries carry the bare C name (`exp`), single-precision
//! entries carry an `f` suffix (`expf`).

use std::fmt;
use std::str::FromStr;

use crate::buffer::Precision;
use crate::error::{invalid_operation, BenchError, Result};

/// Grouping used for listing and help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Circular functions and their inverses.
    Trigonometric,
    /// Hyperbolic functions and their inverses.
    Hyperbolic,
    /// Exponentials and logarithms.
    ExpLog,
    /// Roots.
    Power,
    /// Error and gamma functions.
    ErrorGamma,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Family::Trigonometric => "trigonometric",
            Family::Hyperbolic => "hyperbolic",
            Family::ExpLog => "exponential/logarithmic",
            Family::Power => "power",
            Family::ErrorGamma => "error/gamma",
        })
    }
}

/// The exact mathematical function an operation approximates.
///
/// This is what the reference estimator recomputes at extended precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    Cosh,
    Sinh,
    Tanh,
    Acosh,
    Asinh,
    Atanh,
    Exp,
    Ln,
    Log10,
    Exp2,
    ExpM1,
    Ln1p,
    Log2,
    Sqrt,
    Cbrt,
    Erf,
    Erfc,
    Gamma,
    /// `ln |Γ(x)|`; the sign of Γ(x) is not part of the result.
    LnAbsGamma,
}

/// Executable unary mapping of one precision class.
#[derive(Clone, Copy)]
pub enum Kernel {
    /// `f32 -> f32`.
    Single(fn(f32) -> f32),
    /// `f64 -> f64`.
    Double(fn(f64) -> f64),
}

impl Kernel {
    /// Precision class of the kernel's argument and result.
    pub fn precision(&self) -> Precision {
        match self {
            Kernel::Single(_) => Precision::Single,
            Kernel::Double(_) => Precision::Double,
        }
    }

    /// Evaluates the kernel at `x`, going through the native precision.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Kernel::Single(f) => f64::from(f(x as f32)),
            Kernel::Double(f) => f(x),
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Single(_) => f.write_str("Kernel::Single"),
            Kernel::Double(_) => f.write_str("Kernel::Double"),
        }
    }
}

/// An immutable catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    name: &'static str,
    family: Family,
    function: MathFunction,
    kernel: Kernel,
}

impl Operation {
    const fn new(
        name: &'static str,
        family: Family,
        function: MathFunction,
        kernel: Kernel,
    ) -> Self {
        Operation {
            name,
            family,
            function,
            kernel,
        }
    }

    /// The unique symbolic name, e.g. `"expm1f"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The family this operation belongs to.
    pub fn family(&self) -> Family {
        self.family
    }

    /// The function the reference estimator recomputes.
    pub fn function(&self) -> MathFunction {
        self.function
    }

    /// The executable mapping.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Input and output precision class.
    pub fn precision(&self) -> Precision {
        self.kernel.precision()
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Operation {}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name)
    }
}

impl FromStr for Operation {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s).copied()
    }
}

use Family::*;
use Kernel::{Double, Single};
use MathFunction as M;

static OPERATIONS: [Operation; 50] = [
    Operation::new("cos", Trigonometric, M::Cos, Double(f64::cos)),
    Operation::new("cosf", Trigonometric, M::Cos, Single(f32::cos)),
    Operation::new("sin", Trigonometric, M::Sin, Double(f64::sin)),
    Operation::new("sinf", Trigonometric, M::Sin, Single(f32::sin)),
    Operation::new("tan", Trigonometric, M::Tan, Double(f64::tan)),
    Operation::new("tanf", Trigonometric, M::Tan, Single(f32::tan)),
    Operation::new("acos", Trigonometric, M::Acos, Double(f64::acos)),
    Operation::new("acosf", Trigonometric, M::Acos, Single(f32::acos)),
    Operation::new("asin", Trigonometric, M::Asin, Double(f64::asin)),
    Operation::new("asinf", Trigonometric, M::Asin, Single(f32::asin)),
    Operation::new("atan", Trigonometric, M::Atan, Double(f64::atan)),
    Operation::new("atanf", Trigonometric, M::Atan, Single(f32::atan)),
    Operation::new("cosh", Hyperbolic, M::Cosh, Double(f64::cosh)),
    Operation::new("coshf", Hyperbolic, M::Cosh, Single(f32::cosh)),
    Operation::new("sinh", Hyperbolic, M::Sinh, Double(f64::sinh)),
    Operation::new("sinhf", Hyperbolic, M::Sinh, Single(f32::sinh)),
    Operation::new("tanh", Hyperbolic, M::Tanh, Double(f64::tanh)),
    Operation::new("tanhf", Hyperbolic, M::Tanh, Single(f32::tanh)),
    Operation::new("acosh", Hyperbolic, M::Acosh, Double(f64::acosh)),
    Operation::new("acoshf", Hyperbolic, M::Acosh, Single(f32::acosh)),
    Operation::new("asinh", Hyperbolic, M::Asinh, Double(f64::asinh)),
    Operation::new("asinhf", Hyperbolic, M::Asinh, Single(f32::asinh)),
    Operation::new("atanh", Hyperbolic, M::Atanh, Double(f64::atanh)),
    Operation::new("atanhf", Hyperbolic, M::Atanh, Single(f32::atanh)),
    Operation::new("exp", ExpLog, M::Exp, Double(f64::exp)),
    Operation::new("expf", ExpLog, M::Exp, Single(f32::exp)),
    Operation::new("log", ExpLog, M::Ln, Double(f64::ln)),
    Operation::new("logf", ExpLog, M::Ln, Single(f32::ln)),
    Operation::new("log10", ExpLog, M::Log10, Double(f64::log10)),
    Operation::new("log10f", ExpLog, M::Log10, Single(f32::log10)),
    Operation::new("exp2", ExpLog, M::Exp2, Double(f64::exp2)),
    Operation::new("exp2f", ExpLog, M::Exp2, Single(f32::exp2)),
    Operation::new("expm1", ExpLog, M::ExpM1, Double(f64::exp_m1)),
    Operation::new("expm1f", ExpLog, M::ExpM1, Single(f32::exp_m1)),
    Operation::new("log1p", ExpLog, M::Ln1p, Double(f64::ln_1p)),
    Operation::new("log1pf", ExpLog, M::Ln1p, Single(f32::ln_1p)),
    Operation::new("log2", ExpLog, M::Log2, Double(f64::log2)),
    Operation::new("log2f", ExpLog, M::Log2, Single(f32::log2)),
    Operation::new("sqrt", Power, M::Sqrt, Double(f64::sqrt)),
    Operation::new("sqrtf", Power, M::Sqrt, Single(f32::sqrt)),
    Operation::new("cbrt", Power, M::Cbrt, Double(f64::cbrt)),
    Operation::new("cbrtf", Power, M::Cbrt, Single(f32::cbrt)),
    Operation::new("erf", ErrorGamma, M::Erf, Double(libm::erf)),
    Operation::new("erff", ErrorGamma, M::Erf, Single(libm::erff)),
    Operation::new("erfc", ErrorGamma, M::Erfc, Double(libm::erfc)),
    Operation::new("erfcf", ErrorGamma, M::Erfc, Single(libm::erfcf)),
    Operation::new("tgamma", ErrorGamma, M::Gamma, Double(libm::tgamma)),
    Operation::new("tgammaf", ErrorGamma, M::Gamma, Single(libm::tgammaf)),
    Operation::new("lgamma", ErrorGamma, M::LnAbsGamma, Double(libm::lgamma)),
    Operation::new("lgammaf", ErrorGamma, M::LnAbsGamma, Single(libm::lgammaf)),
];

/// Every operation, in catalog order.
pub fn operations() -> &'static [Operation] {
    &OPERATIONS
}

/// Looks up an operation by exact, case-sensitive name.
///
/// # Errors
///
/// Returns [`BenchError::InvalidOperation`] if no entry has that name.
///
/// # Examples
///
/// ```rust
/// use mbench::catalog::resolve;
/// use mbench::Precision;
///
/// let op = resolve("expm1f").unwrap();
/// assert_eq!(op.precision(), Precision::Single);
/// assert!(resolve("cosine").is_err());
/// ```
pub fn resolve(name: &str) -> Result<&'static Operation> {
    OPERATIONS
        .iter()
        .find(|op| op.name == name)
        .ok_or_else(|| invalid_operation(name))
}
