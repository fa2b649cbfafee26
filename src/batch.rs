//! Batch execution of one operation over a sample buffer.
//!
//! A single generic routine serves every catalog entry: it is instantiated
//! once per element type and receives the operation's kernel as a function
//! pointer. Large buffers are split into contiguous chunks that run on
//! `rayon` workers. Because exception flags and the rounding mode are
//! per-thread state, every chunk clears, configures and captures that state on
//! the thread that runs it, and the per-chunk flags are OR-reduced.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::buffer::{Element, ResultBuffer, SampleBuffer};
use crate::catalog::{Kernel, Operation};
use crate::error::{invalid_argument, BenchError, Result};
use crate::fenv::{
    errno, ExceptionFlags, ExceptionSummary, FloatingPointEnv, HardwareEnv, RoundingGuard,
};
use crate::round::RoundingMode;
use crate::{PARALLEL_CHUNK_SIZE, PARALLEL_THRESHOLD};

/// Whether the C library's `errno` is consulted after each element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrnoPolicy {
    /// Never read `errno`.
    #[default]
    Ignore,
    /// Fail the batch with [`BenchError::DomainError`] if any element call
    /// sets `errno`.
    Honor,
}

/// Monotonic count of element evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperationCounter(u64);

impl OperationCounter {
    /// A counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluations recorded so far.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Records `n` more evaluations.
    pub fn add(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }
}

/// Executor settings.
#[derive(Debug, Clone, Copy)]
pub struct ExecConfig {
    /// Rounding direction applied while elements are evaluated. `None` keeps
    /// whatever mode the executing thread already has.
    pub rounding: Option<RoundingMode>,
    /// `errno` handling.
    pub errno: ErrnoPolicy,
    /// Buffers shorter than this run on the calling thread.
    pub parallel_threshold: usize,
    /// Elements per parallel chunk.
    pub chunk_size: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            rounding: None,
            errno: ErrnoPolicy::Ignore,
            parallel_threshold: PARALLEL_THRESHOLD,
            chunk_size: PARALLEL_CHUNK_SIZE,
        }
    }
}

/// Flags and the first `errno` observation of one or more chunks.
#[derive(Debug, Clone, Copy, Default)]
struct ChunkOutcome {
    flags: ExceptionFlags,
    domain_error: Option<(usize, i32)>,
}

impl ChunkOutcome {
    fn merge(self, other: Self) -> Self {
        let domain_error = match (self.domain_error, other.domain_error) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        };
        ChunkOutcome {
            flags: self.flags | other.flags,
            domain_error,
        }
    }
}

/// Runs catalog operations over sample buffers.
///
/// The floating-point environment is an explicit capability; production code
/// uses [`HardwareEnv`], tests can pass any [`FloatingPointEnv`].
#[derive(Debug)]
pub struct BatchExecutor<E: FloatingPointEnv = HardwareEnv> {
    env: E,
    config: ExecConfig,
}

impl BatchExecutor<HardwareEnv> {
    /// An executor on the hardware environment with default settings.
    pub fn hardware() -> Self {
        BatchExecutor {
            env: HardwareEnv,
            config: ExecConfig::default(),
        }
    }
}

impl<E: FloatingPointEnv> BatchExecutor<E> {
    /// Creates an executor, validating `config` against `env`.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidArgument`] if the requested rounding mode
    /// cannot be applied or `chunk_size` is zero.
    pub fn new(env: E, config: ExecConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(invalid_argument("chunk size must be positive"));
        }
        if let Some(mode) = config.rounding {
            // Applied and reverted once here so per-chunk application cannot fail.
            RoundingGuard::new(&env, mode)?;
        }
        if config.errno == ErrnoPolicy::Honor && !errno::is_available() {
            warn!("errno is not available on this target; domain errors will not be reported");
        }
        Ok(BatchExecutor { env, config })
    }

    /// The environment this executor observes.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The executor settings.
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Applies `op` to every sample, writing `results` in place.
    ///
    /// On success the result buffer holds one value per sample, its exception
    /// summary holds the categories raised by the batch (inexact excluded),
    /// `counter` is incremented by the number of samples, and that number is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`BenchError::SizeMismatch`] if the buffers differ in length.
    /// - [`BenchError::TypeMismatch`] if either buffer's precision differs
    ///   from the operation's.
    /// - [`BenchError::DomainError`] under [`ErrnoPolicy::Honor`] when an
    ///   element call set `errno`. Every element is still evaluated and the
    ///   counter is still incremented.
    pub fn execute(
        &self,
        op: &Operation,
        samples: &SampleBuffer,
        results: &mut ResultBuffer,
        counter: &mut OperationCounter,
    ) -> Result<u64> {
        check_shapes(op, samples, results.values())?;

        let outcome = match op.kernel() {
            Kernel::Single(f) => self.run(f, samples, results.values_mut()),
            Kernel::Double(f) => self.run(f, samples, results.values_mut()),
        }?;

        let summary = if self.env.is_supported() {
            ExceptionSummary::tracked(outcome.flags.without(ExceptionFlags::INEXACT))
        } else {
            ExceptionSummary::disabled()
        };
        results.set_exceptions(summary);

        let n = samples.len() as u64;
        counter.add(n);
        debug!(op = op.name(), n, exceptions = %summary, "batch complete");

        match outcome.domain_error {
            Some((index, errno)) => Err(BenchError::DomainError { errno, index }),
            None => Ok(n),
        }
    }

    fn run<T: Element>(
        &self,
        f: fn(T) -> T,
        samples: &SampleBuffer,
        results: &mut SampleBuffer,
    ) -> Result<ChunkOutcome> {
        let input = T::slice(samples).ok_or(BenchError::TypeMismatch {
            expected: T::PRECISION,
            found: samples.precision(),
        })?;
        let found = results.precision();
        let output = T::slice_mut(results).ok_or(BenchError::TypeMismatch {
            expected: T::PRECISION,
            found,
        })?;

        if input.len() < self.config.parallel_threshold {
            return Ok(self.run_chunk(f, input, output, 0));
        }

        let chunk = self.config.chunk_size;
        Ok(input
            .par_chunks(chunk)
            .zip(output.par_chunks_mut(chunk))
            .enumerate()
            .map(|(i, (x, y))| self.run_chunk(f, x, y, i * chunk))
            .reduce(ChunkOutcome::default, ChunkOutcome::merge))
    }

    fn run_chunk<T: Element>(
        &self,
        f: fn(T) -> T,
        input: &[T],
        output: &mut [T],
        offset: usize,
    ) -> ChunkOutcome {
        let _rounding = self
            .config
            .rounding
            .and_then(|mode| RoundingGuard::new(&self.env, mode).ok());

        self.env.clear();
        let domain_error = match self.config.errno {
            ErrnoPolicy::Ignore => {
                output
                    .iter_mut()
                    .zip(input)
                    .for_each(|(y, &x)| *y = f(x));
                None
            }
            ErrnoPolicy::Honor => {
                let mut first = None;
                errno::clear();
                for (i, (y, &x)) in output.iter_mut().zip(input).enumerate() {
                    let (value, e) = call_with_errno(f, x);
                    *y = value;
                    if e != 0 && first.is_none() {
                        first = Some((offset + i, e));
                    }
                }
                first
            }
        };
        let flags = self.env.capture(ExceptionFlags::ALL);

        ChunkOutcome {
            flags,
            domain_error,
        }
    }
}

/// Evaluates `f(x)` and returns the value together with the `errno` it left
/// behind, resetting the indicator for the next call.
#[inline(always)]
fn call_with_errno<T: Element>(f: fn(T) -> T, x: T) -> (T, i32) {
    let value = f(x);
    let e = errno::get();
    if e != 0 {
        errno::clear();
    }
    (value, e)
}

fn check_shapes(op: &Operation, samples: &SampleBuffer, results: &SampleBuffer) -> Result<()> {
    if results.len() != samples.len() {
        return Err(BenchError::SizeMismatch {
            expected: samples.len(),
            found: results.len(),
        });
    }
    for found in [samples.precision(), results.precision()] {
        if found != op.precision() {
            return Err(BenchError::TypeMismatch {
                expected: op.precision(),
                found,
            });
        }
    }
    Ok(())
}

/// Checks that `samples` and `results` fit `op` without running it.
pub fn validate(op: &Operation, samples: &SampleBuffer, results: &ResultBuffer) -> Result<()> {
    check_shapes(op, samples, results.values())
}
