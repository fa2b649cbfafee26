//! # mbench
//!
//! Throughput and accuracy measurement for elementary math functions.
//!
//! An [`Operation`] from the [`catalog`] is applied to every element of a
//! [`SampleBuffer`] by a [`BatchExecutor`], which also records the IEEE-754
//! exceptions the batch raised. A [`Driver`] repeats batches on a fixed
//! worker pool until repetition and operation-count targets are met, and
//! [`reference::estimate`] compares the results against an MPFR reference
//! when the `mpfr` feature is enabled.
//!
//! ```rust
//! use mbench::{catalog, Alignment, BatchExecutor, OperationCounter, ResultBuffer, SampleBuffer};
//!
//! let op = catalog::resolve("exp").unwrap();
//! let samples = SampleBuffer::from_slice(&[0.0f64, 1.0], Alignment::default()).unwrap();
//! let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
//! let mut counter = OperationCounter::new();
//!
//! BatchExecutor::hardware()
//!     .execute(op, &samples, &mut results, &mut counter)
//!     .unwrap();
//! assert_eq!(results.values().get(0), Some(1.0));
//! assert_eq!(counter.get(), 2);
//! ```

pub mod batch;
pub mod buffer;
pub mod catalog;
pub mod driver;
pub mod error;
pub mod fenv;
pub mod input;
pub mod reference;
pub mod report;
pub mod round;
pub mod utils;

pub use batch::{BatchExecutor, ErrnoPolicy, ExecConfig, OperationCounter};
pub use buffer::{Element, Precision, ResultBuffer, SampleBuffer};
pub use catalog::{Family, Kernel, MathFunction, Operation};
pub use driver::{Driver, DriverConfig, RunSummary, WorkerTally};
pub use error::{BenchError, Result};
pub use fenv::{
    DisabledEnv, ExceptionFlags, ExceptionSummary, FloatingPointEnv, HardwareEnv, RoundingGuard,
};
pub use reference::{ErrorReport, ReferenceFlags, WorkingPrecision};
pub use round::RoundingMode;
pub use utils::{AlignedVec, Alignment};

/// Buffers at least this long are split across worker threads.
pub const PARALLEL_THRESHOLD: usize = 1 << 16;
/// Elements per parallel chunk.
pub const PARALLEL_CHUNK_SIZE: usize = 1 << 13;
