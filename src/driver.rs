//! The measurement loop.
//!
//! A fixed pool of workers each runs the whole batch redundantly on a
//! private result buffer until both the repetition and the operation-count
//! targets are met. Per-worker tallies are then reduced into one
//! [`RunSummary`]; the first worker's results become the reported results.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::batch::{validate, BatchExecutor, OperationCounter};
use crate::buffer::{ResultBuffer, SampleBuffer};
use crate::catalog::Operation;
use crate::error::{invalid_argument, BenchError, Result};
use crate::fenv::{ExceptionSummary, FloatingPointEnv};

/// Driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Minimum number of whole batches per worker.
    pub repetitions: u64,
    /// Minimum number of element evaluations per worker.
    pub min_ops: u64,
    /// Number of workers running the batch concurrently.
    pub workers: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            repetitions: 1,
            min_ops: 0,
            workers: 1,
        }
    }
}

/// What one worker accomplished.
#[derive(Debug, Default)]
pub struct WorkerTally {
    /// Completed batches.
    pub repetitions: u64,
    /// Element evaluations.
    pub ops: u64,
    /// Exceptions of the worker's last batch.
    pub exceptions: Option<ExceptionSummary>,
    /// The error that stopped the worker, if any.
    pub error: Option<BenchError>,
}

impl WorkerTally {
    /// Combines two tallies: counts take the maximum, exceptions are united
    /// and the first error wins.
    pub fn merge(self, other: WorkerTally) -> WorkerTally {
        let exceptions = match (self.exceptions, other.exceptions) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, b) => a.or(b),
        };
        WorkerTally {
            repetitions: self.repetitions.max(other.repetitions),
            ops: self.ops.max(other.ops),
            exceptions,
            error: self.error.or(other.error),
        }
    }
}

/// Reduced outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Completed batches (maximum over workers).
    pub repetitions: u64,
    /// Element evaluations (maximum over workers).
    pub ops: u64,
    /// Wall-clock time of the whole run.
    pub elapsed: Duration,
    /// Union of the workers' exception summaries.
    pub exceptions: ExceptionSummary,
    /// First error any worker hit.
    pub error: Option<BenchError>,
}

impl RunSummary {
    /// Millions of element evaluations per second.
    pub fn mops(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ops as f64 / secs / 1e6
        } else {
            0.0
        }
    }

    /// `true` if any worker failed.
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Converts a failed run into its error.
    pub fn into_result(self) -> Result<RunSummary> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

/// Runs batches on a fixed worker pool.
pub struct Driver {
    config: DriverConfig,
    pool: rayon::ThreadPool,
}

impl Driver {
    /// Builds the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidArgument`] if `workers` is zero or the
    /// pool cannot be created.
    pub fn new(config: DriverConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(invalid_argument("worker count must be positive"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("mbench-worker-{i}"))
            .build()
            .map_err(|e| invalid_argument(format!("failed to start worker pool: {e}")))?;
        Ok(Driver { config, pool })
    }

    /// The driver settings.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs `op` over `samples` until every worker has met the targets.
    ///
    /// `results` receives the first worker's values and the union of all
    /// workers' exception summaries. A failure does not stop other workers;
    /// it is reported through [`RunSummary::error`].
    ///
    /// # Errors
    ///
    /// Shape errors are returned before any worker starts.
    pub fn run<E: FloatingPointEnv>(
        &self,
        executor: &BatchExecutor<E>,
        op: &Operation,
        samples: &SampleBuffer,
        results: &mut ResultBuffer,
    ) -> Result<RunSummary> {
        validate(op, samples, results)?;

        let start = Instant::now();
        let tally = if self.config.workers == 1 {
            self.pool
                .install(|| self.worker_loop(0, executor, op, samples, results))
        } else {
            self.run_redundant(executor, op, samples, results)
        };
        let elapsed = start.elapsed();

        let summary = RunSummary {
            repetitions: tally.repetitions,
            ops: tally.ops,
            elapsed,
            exceptions: tally.exceptions.unwrap_or_else(|| results.exceptions()),
            error: tally.error,
        };
        results.set_exceptions(summary.exceptions);
        info!(
            op = op.name(),
            repetitions = summary.repetitions,
            ops = summary.ops,
            seconds = elapsed.as_secs_f64(),
            exceptions = %summary.exceptions,
            "run complete"
        );
        Ok(summary)
    }

    fn run_redundant<E: FloatingPointEnv>(
        &self,
        executor: &BatchExecutor<E>,
        op: &Operation,
        samples: &SampleBuffer,
        results: &mut ResultBuffer,
    ) -> WorkerTally {
        let template: &ResultBuffer = results;
        let mut outcomes: Vec<(WorkerTally, Option<ResultBuffer>)> = self.pool.install(|| {
            (0..self.config.workers)
                .into_par_iter()
                .map(|worker| match template.zeroed_like() {
                    Ok(mut local) => {
                        let tally = self.worker_loop(worker, executor, op, samples, &mut local);
                        (tally, Some(local))
                    }
                    Err(e) => (
                        WorkerTally {
                            error: Some(e),
                            ..WorkerTally::default()
                        },
                        None,
                    ),
                })
                .collect()
        });

        let reps: Vec<u64> = outcomes.iter().map(|(t, _)| t.repetitions).collect();
        if reps.windows(2).any(|w| w[0] != w[1]) {
            warn!(?reps, "workers completed different numbers of repetitions");
        }

        if let Some(first) = outcomes.first_mut().and_then(|(_, buffer)| buffer.take()) {
            *results = first;
        }
        outcomes
            .into_iter()
            .map(|(tally, _)| tally)
            .fold(WorkerTally::default(), WorkerTally::merge)
    }

    fn worker_loop<E: FloatingPointEnv>(
        &self,
        worker: usize,
        executor: &BatchExecutor<E>,
        op: &Operation,
        samples: &SampleBuffer,
        results: &mut ResultBuffer,
    ) -> WorkerTally {
        let mut counter = OperationCounter::new();
        let mut tally = WorkerTally::default();
        while tally.repetitions < self.config.repetitions || counter.get() < self.config.min_ops {
            if let Err(e) = executor.execute(op, samples, results, &mut counter) {
                tally.error = Some(e);
                break;
            }
            tally.repetitions += 1;
            // An empty batch can never reach a positive operation target.
            if samples.is_empty() && tally.repetitions >= self.config.repetitions {
                break;
            }
        }
        tally.ops = counter.get();
        tally.exceptions = Some(results.exceptions());
        debug!(
            worker,
            repetitions = tally.repetitions,
            ops = tally.ops,
            "worker finished"
        );
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_merge() {
        let a = WorkerTally {
            repetitions: 3,
            ops: 30,
            exceptions: Some(ExceptionSummary::default()),
            error: None,
        };
        let b = WorkerTally {
            repetitions: 2,
            ops: 40,
            exceptions: None,
            error: Some(BenchError::Unsupported),
        };
        let merged = a.merge(b);
        assert_eq!(merged.repetitions, 3);
        assert_eq!(merged.ops, 40);
        assert!(merged.error.is_some());
        assert_eq!(merged.exceptions, Some(ExceptionSummary::default()));
    }

    #[test]
    fn test_into_result_surfaces_worker_error() {
        let mut summary = RunSummary {
            repetitions: 1,
            ops: 3,
            elapsed: Duration::ZERO,
            exceptions: ExceptionSummary::default(),
            error: None,
        };
        assert!(!summary.failed());
        summary.error = Some(BenchError::DomainError { errno: 33, index: 1 });
        assert!(summary.failed());
        assert!(matches!(
            summary.into_result(),
            Err(BenchError::DomainError { errno: 33, index: 1 })
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = DriverConfig {
            workers: 0,
            ..DriverConfig::default()
        };
        assert!(Driver::new(config).is_err());
    }

    #[test]
    fn test_mops() {
        let summary = RunSummary {
            repetitions: 1,
            ops: 2_000_000,
            elapsed: Duration::from_secs(2),
            exceptions: ExceptionSummary::default(),
            error: None,
        };
        assert!((summary.mops() - 1.0).abs() < 1e-12);
    }
}
