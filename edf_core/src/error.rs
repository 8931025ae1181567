//! Error types for edf_core operations.
//!
//! A plain enum with a hand-written `Display`, so the math crate stays free of
//! error-derive dependencies.

use core::fmt;

/// Error types that can occur during edf_core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EdfCoreError {
    /// An irreps string could not be parsed.
    InvalidIrreps {
        /// The offending input.
        input: String,
        /// What went wrong.
        reason: &'static str,
    },
    /// A degree above the supported maximum was requested.
    UnsupportedDegree {
        /// The requested degree.
        degree: u32,
        /// The largest supported degree.
        max: u32,
    },
    /// Batch indices must be non-decreasing.
    NonMonotonicBatch {
        /// Position at which the order breaks.
        position: usize,
    },
    /// Two parallel arrays disagree in length.
    LengthMismatch {
        /// What was being compared.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// Search radius must be finite and positive.
    InvalidRadius {
        /// The rejected radius.
        radius: f32,
    },
    /// Sampling ratio must lie in (0, 1].
    InvalidRatio {
        /// The rejected ratio.
        ratio: f32,
    },
    /// A neighbour cap of zero would produce no edges at all.
    ZeroNeighborCap,
}

impl fmt::Display for EdfCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdfCoreError::InvalidIrreps { input, reason } => {
                write!(f, "invalid irreps '{}': {}", input, reason)
            }
            EdfCoreError::UnsupportedDegree { degree, max } => {
                write!(f, "degree {} exceeds supported maximum {}", degree, max)
            }
            EdfCoreError::NonMonotonicBatch { position } => {
                write!(f, "batch indices decrease at position {}", position)
            }
            EdfCoreError::LengthMismatch {
                what,
                expected,
                got,
            } => {
                write!(f, "{} length mismatch: expected {}, got {}", what, expected, got)
            }
            EdfCoreError::InvalidRadius { radius } => {
                write!(f, "radius {} must be finite and positive", radius)
            }
            EdfCoreError::InvalidRatio { ratio } => {
                write!(f, "ratio {} must lie in (0, 1]", ratio)
            }
            EdfCoreError::ZeroNeighborCap => write!(f, "max_neighbors must be at least 1"),
        }
    }
}

impl std::error::Error for EdfCoreError {}

/// Result type for edf_core operations.
pub type Result<T> = core::result::Result<T, EdfCoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EdfCoreError::UnsupportedDegree { degree: 3, max: 2 };
        assert_eq!(format!("{}", err), "degree 3 exceeds supported maximum 2");

        let err = EdfCoreError::NonMonotonicBatch { position: 4 };
        assert_eq!(format!("{}", err), "batch indices decrease at position 4");

        let err = EdfCoreError::InvalidRatio { ratio: 1.5 };
        assert_eq!(format!("{}", err), "ratio 1.5 must lie in (0, 1]");
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(EdfCoreError::ZeroNeighborCap);
        assert_eq!(err.to_string(), "max_neighbors must be at least 1");
    }
}
