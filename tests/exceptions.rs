//! Exception tracking through a substitute floating-point environment.
//!
//! A recording fake stands in for the hardware so the executor's use of the
//! environment (clear before, capture after, per chunk) can be observed
//! directly.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

use mbench::{
    catalog, Alignment, BatchExecutor, ExceptionFlags, ExceptionSummary, ExecConfig,
    FloatingPointEnv, OperationCounter, ResultBuffer, RoundingMode, SampleBuffer,
};

/// Reports a fixed set of flags on every capture and counts calls.
#[derive(Default)]
struct FakeEnv {
    raised: AtomicU8,
    clears: AtomicU32,
    captures: AtomicU32,
    modes: Mutex<Vec<RoundingMode>>,
}

impl FakeEnv {
    fn raising(flags: ExceptionFlags) -> Self {
        let env = FakeEnv::default();
        env.raise(flags);
        env
    }

    fn flags(&self) -> ExceptionFlags {
        let bits = self.raised.load(Ordering::SeqCst);
        [
            ExceptionFlags::INVALID,
            ExceptionFlags::DIVIDE_BY_ZERO,
            ExceptionFlags::OVERFLOW,
            ExceptionFlags::UNDERFLOW,
            ExceptionFlags::INEXACT,
        ]
        .into_iter()
        .enumerate()
        .filter(|(i, _)| bits & (1 << i) != 0)
        .fold(ExceptionFlags::empty(), |acc, (_, f)| acc | f)
    }
}

impl FloatingPointEnv for FakeEnv {
    fn is_supported(&self) -> bool {
        true
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn capture(&self, mask: ExceptionFlags) -> ExceptionFlags {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.flags() & mask
    }

    fn raise(&self, flags: ExceptionFlags) {
        let table = [
            ExceptionFlags::INVALID,
            ExceptionFlags::DIVIDE_BY_ZERO,
            ExceptionFlags::OVERFLOW,
            ExceptionFlags::UNDERFLOW,
            ExceptionFlags::INEXACT,
        ];
        for (i, f) in table.into_iter().enumerate() {
            if flags.contains(f) {
                self.raised.fetch_or(1 << i, Ordering::SeqCst);
            }
        }
    }

    fn rounding(&self) -> Option<RoundingMode> {
        Some(RoundingMode::ToNearest)
    }

    fn set_rounding(&self, mode: RoundingMode) -> mbench::Result<()> {
        self.modes.lock().unwrap().push(mode);
        Ok(())
    }
}

fn run_with(env: &FakeEnv, config: ExecConfig, len: usize) -> ResultBuffer {
    let op = catalog::resolve("exp").unwrap();
    let values: Vec<f64> = (0..len).map(|i| i as f64 * 1e-3).collect();
    let samples = SampleBuffer::from_slice(&values, Alignment::default()).unwrap();
    let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
    BatchExecutor::new(env, config)
        .unwrap()
        .execute(op, &samples, &mut results, &mut OperationCounter::new())
        .unwrap();
    results
}

/// Overflow plus divide-by-zero renders in canonical order.
#[test]
fn test_canonical_ordering() {
    let env = FakeEnv::raising(ExceptionFlags::OVERFLOW | ExceptionFlags::DIVIDE_BY_ZERO);
    let results = run_with(&env, ExecConfig::default(), 4);
    assert_eq!(results.exceptions().to_string(), "divide-by-zero,overflow");
}

/// Inexact never reaches the stored summary.
#[test]
fn test_inexact_is_excluded() {
    let env = FakeEnv::raising(ExceptionFlags::INEXACT);
    let results = run_with(&env, ExecConfig::default(), 4);
    assert_eq!(results.exceptions(), ExceptionSummary::tracked(ExceptionFlags::empty()));
    assert_eq!(results.exceptions().to_string(), "none");

    let env = FakeEnv::raising(ExceptionFlags::ALL);
    let results = run_with(&env, ExecConfig::default(), 4);
    assert_eq!(
        results.exceptions().to_string(),
        "divide-by-zero,invalid,overflow,underflow"
    );
}

/// A sequential batch clears and captures exactly once.
#[test]
fn test_sequential_batch_clears_and_captures_once() {
    let env = FakeEnv::default();
    run_with(&env, ExecConfig::default(), 100);
    assert_eq!(env.clears.load(Ordering::SeqCst), 1);
    assert_eq!(env.captures.load(Ordering::SeqCst), 1);
}

/// Every parallel chunk clears and captures on its own.
#[test]
fn test_parallel_chunks_each_capture() {
    let env = FakeEnv::default();
    let config = ExecConfig {
        parallel_threshold: 0,
        chunk_size: 10,
        ..ExecConfig::default()
    };
    run_with(&env, config, 95);
    assert_eq!(env.clears.load(Ordering::SeqCst), 10);
    assert_eq!(env.captures.load(Ordering::SeqCst), 10);
}

/// The requested rounding mode is applied per chunk.
#[test]
fn test_rounding_mode_applied_per_chunk() {
    let env = FakeEnv::default();
    let config = ExecConfig {
        rounding: Some(RoundingMode::TowardZero),
        parallel_threshold: 0,
        chunk_size: 25,
        ..ExecConfig::default()
    };
    run_with(&env, config, 100);
    let modes = env.modes.lock().unwrap();
    let count = |mode| modes.iter().filter(|&&m| m == mode).count();
    // One validation at construction plus one per chunk, each restored.
    assert_eq!(count(RoundingMode::TowardZero), 5);
    assert_eq!(count(RoundingMode::ToNearest), 5);
}

/// Summaries of a previous batch are overwritten, not accumulated.
#[test]
fn test_summary_is_overwritten() {
    let op = catalog::resolve("exp").unwrap();
    let samples = SampleBuffer::from_slice(&[1.0f64], Alignment::default()).unwrap();
    let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
    let mut counter = OperationCounter::new();

    let noisy = FakeEnv::raising(ExceptionFlags::UNDERFLOW);
    BatchExecutor::new(&noisy, ExecConfig::default())
        .unwrap()
        .execute(op, &samples, &mut results, &mut counter)
        .unwrap();
    assert_eq!(results.exceptions().to_string(), "underflow");

    let quiet = FakeEnv::default();
    BatchExecutor::new(&quiet, ExecConfig::default())
        .unwrap()
        .execute(op, &samples, &mut results, &mut counter)
        .unwrap();
    assert_eq!(results.exceptions().to_string(), "none");
}
