//! IEEE-754 rounding-direction attributes.

use std::fmt;
use std::str::FromStr;

use crate::error::{invalid_argument, BenchError, Result};

/// Rounding direction applied to executable operations and, when enabled,
/// to the extended-precision reference computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundingMode {
    /// Round toward negative infinity.
    Downward,
    /// Round to nearest, ties to even.
    #[default]
    ToNearest,
    /// Round toward zero.
    TowardZero,
    /// Round toward positive infinity.
    Upward,
}

impl RoundingMode {
    /// Every mode, in the order used for help output.
    pub const ALL: [RoundingMode; 4] = [
        RoundingMode::Downward,
        RoundingMode::ToNearest,
        RoundingMode::TowardZero,
        RoundingMode::Upward,
    ];

    /// Lowercase name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundingMode::Downward => "downward",
            RoundingMode::ToNearest => "tonearest",
            RoundingMode::TowardZero => "towardzero",
            RoundingMode::Upward => "upward",
        }
    }

    /// The equivalent MPFR rounding mode.
    #[cfg(feature = "mpfr")]
    pub(crate) fn to_mpfr(self) -> rug::float::Round {
        use rug::float::Round;
        match self {
            RoundingMode::Downward => Round::Down,
            RoundingMode::ToNearest => Round::Nearest,
            RoundingMode::TowardZero => Round::Zero,
            RoundingMode::Upward => Round::Up,
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingMode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        RoundingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                invalid_argument(format!(
                    "unknown rounding mode `{s}` (expected downward, tonearest, towardzero or upward)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_modes() {
        for mode in RoundingMode::ALL {
            assert_eq!(mode.as_str().parse::<RoundingMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert!("ToNearest".parse::<RoundingMode>().is_err());
        assert!("nearest".parse::<RoundingMode>().is_err());
        assert!("".parse::<RoundingMode>().is_err());
    }

    #[test]
    fn test_default_is_nearest() {
        assert_eq!(RoundingMode::default(), RoundingMode::ToNearest);
    }
}
