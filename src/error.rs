//! Error types for mbench operations.
//!
//! Every failure in the library is returned as a [`BenchError`]; nothing is
//! retried and nothing panics on caller mistakes. The caller decides whether
//! to keep going (e.g. skip accuracy reporting on [`BenchError::Unsupported`])
//! or to abort.

use thiserror::Error;

use crate::buffer::Precision;

/// Errors that can occur while resolving, executing or measuring an operation.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The operation name is not in the catalog.
    #[error("invalid operation `{name}`")]
    InvalidOperation {
        /// The name that failed to resolve.
        name: String,
    },

    /// A buffer's element type does not match the operation's precision.
    #[error("type mismatch: expected {expected} buffer, found {found}")]
    TypeMismatch {
        /// Precision required by the operation.
        expected: Precision,
        /// Precision of the buffer that was supplied.
        found: Precision,
    },

    /// Sample and result buffers have different lengths.
    #[error("size mismatch: expected {expected} elements, found {found}")]
    SizeMismatch {
        /// Length of the sample buffer.
        expected: usize,
        /// Length of the result buffer.
        found: usize,
    },

    /// The math library signalled a domain or range error through `errno`.
    #[error("math domain error at element {index}: {}", errno_message(.errno))]
    DomainError {
        /// The `errno` value observed after the call.
        errno: i32,
        /// Index of the first element that set the indicator.
        index: usize,
    },

    /// Reference error computation requires the `mpfr` feature.
    #[error("accuracy reporting is not supported by this build")]
    Unsupported,

    /// An argument is out of its valid range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable error message.
        message: String,
    },

    /// Memory allocation failed.
    #[error(
        "memory allocation failed: {message} (requested {requested_size} bytes with {requested_alignment} byte alignment)"
    )]
    AllocationError {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },

    /// A sample literal could not be parsed.
    #[error("invalid numeric literal `{token}` at position {index}")]
    Parse {
        /// The offending token.
        token: String,
        /// Zero-based position of the token in the input.
        index: usize,
    },

    /// Reading the sample stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Returns `true` for the recoverable "no accuracy backend" case.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, BenchError::Unsupported)
    }
}

fn errno_message<E: std::borrow::Borrow<i32>>(errno: E) -> std::io::Error {
    std::io::Error::from_raw_os_error(*errno.borrow())
}

/// Result type alias for mbench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Creates an invalid-operation error.
pub fn invalid_operation(name: impl Into<String>) -> BenchError {
    BenchError::InvalidOperation { name: name.into() }
}

/// Creates an invalid-argument error.
pub fn invalid_argument(message: impl Into<String>) -> BenchError {
    BenchError::InvalidArgument {
        message: message.into(),
    }
}

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> BenchError {
    BenchError::AllocationError {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}
