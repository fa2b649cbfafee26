//! End-to-end batch execution over the hardware floating-point environment.
//!
//! These tests drive `BatchExecutor::execute` the way the CLI does and check
//! result values, exception summaries and the operation counter.

use mbench::{
    catalog, Alignment, BatchExecutor, BenchError, ExecConfig, HardwareEnv, OperationCounter,
    Precision, ResultBuffer, RoundingMode, SampleBuffer,
};

fn run(name: &str, values: &[f64]) -> (ResultBuffer, OperationCounter) {
    let op = catalog::resolve(name).unwrap();
    let samples = match op.precision() {
        Precision::Double => SampleBuffer::from_slice(values, Alignment::default()),
        Precision::Single => {
            let v: Vec<f32> = values.iter().map(|&x| x as f32).collect();
            SampleBuffer::from_slice(&v, Alignment::default())
        }
    }
    .unwrap();
    let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
    let mut counter = OperationCounter::new();
    BatchExecutor::hardware()
        .execute(op, &samples, &mut results, &mut counter)
        .unwrap();
    (results, counter)
}

/// `exp` over 1..=5 matches e^k to six decimals and raises nothing but inexact.
#[test]
fn test_exp_on_small_integers() {
    let (results, counter) = run("exp", &[1.0, 2.0, 3.0, 4.0, 5.0]);
    let expected = [
        2.718282, 7.389056, 20.085537, 54.598150, 148.413159,
    ];

    for (i, &e) in expected.iter().enumerate() {
        let got = results.values().get(i).unwrap();
        println!("  exp({}) = {got:.6}, expected {e:.6}", i + 1);
        assert_eq!(format!("{got:.6}"), format!("{e:.6}"));
    }
    assert_eq!(counter.get(), 5);
    if cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
        assert_eq!(results.exceptions().to_string(), "none");
    }
}

/// `sqrtf(-1)` is NaN and reported as invalid.
#[test]
fn test_sqrtf_of_negative_is_invalid() {
    let (results, counter) = run("sqrtf", &[-1.0]);
    assert!(results.values().as_f32().unwrap()[0].is_nan());
    assert_eq!(counter.get(), 1);
    if cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
        assert_eq!(results.exceptions().to_string(), "invalid");
    }
}

/// Division by zero and overflow are both reported, in canonical order.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[test]
fn test_log_of_zero_and_exp_overflow() {
    let (results, _) = run("log", &[0.0]);
    assert_eq!(results.values().get(0), Some(f64::NEG_INFINITY));
    assert_eq!(results.exceptions().to_string(), "divide-by-zero");

    let (results, _) = run("exp", &[1000.0]);
    assert_eq!(results.values().get(0), Some(f64::INFINITY));
    assert!(results.exceptions().to_string().contains("overflow"));
}

/// An empty batch succeeds and counts nothing.
#[test]
fn test_empty_batch() {
    let (results, counter) = run("cos", &[]);
    assert!(results.is_empty());
    assert_eq!(counter.get(), 0);
}

/// Unknown names fail before any buffer is created.
#[test]
fn test_unknown_operation() {
    let err = catalog::resolve("cosine").unwrap_err();
    assert!(matches!(err, BenchError::InvalidOperation { ref name } if name == "cosine"));
    assert_eq!(err.to_string(), "invalid operation `cosine`");
}

/// Running the same batch twice into fresh buffers gives identical bits.
#[test]
fn test_idempotent_execution() {
    let values: Vec<f64> = (0..5_000).map(|i| (i as f64 - 2_500.0) * 0.37).collect();
    for name in ["tgamma", "lgammaf", "erfc", "atanh", "log1pf"] {
        let (a, _) = run(name, &values);
        let (b, _) = run(name, &values);
        assert!(a.values().bitwise_eq(b.values()), "{name} is not idempotent");
        assert_eq!(a.exceptions(), b.exceptions());
    }
}

/// Every catalog entry runs over a mixed sample set without failing.
#[test]
fn test_every_operation_executes() {
    let values = [-2.0, -0.5, 0.0, 0.5, 1.0, 2.0, 10.0];
    for op in catalog::operations() {
        let (results, counter) = run(op.name(), &values);
        assert_eq!(results.len(), values.len(), "{}", op.name());
        assert_eq!(counter.get(), values.len() as u64);
    }
}

/// Results follow the requested rounding direction.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[test]
fn test_rounding_mode_is_applied() {
    let op = catalog::resolve("sqrt").unwrap();
    let samples = SampleBuffer::from_slice(&[2.0f64, 3.0, 5.0], Alignment::default()).unwrap();
    let mut down = ResultBuffer::for_operation(op, &samples).unwrap();
    let mut up = down.zeroed_like().unwrap();
    let mut counter = OperationCounter::new();

    for (mode, results) in [(RoundingMode::Downward, &mut down), (RoundingMode::Upward, &mut up)] {
        let executor = BatchExecutor::new(
            HardwareEnv,
            ExecConfig {
                rounding: Some(mode),
                ..ExecConfig::default()
            },
        )
        .unwrap();
        executor.execute(op, &samples, results, &mut counter).unwrap();
    }

    let down = down.values().as_f64().unwrap();
    let up = up.values().as_f64().unwrap();
    for (d, u) in down.iter().zip(up) {
        assert!(d < u, "{d} should round below {u}");
    }
}

/// Buffers larger than the parallel threshold are split across workers and
/// still produce the sequential answer.
#[test]
fn test_large_buffer_matches_scalar() {
    let values: Vec<f32> = (0..200_000).map(|i| i as f32 * 1e-4).collect();
    let op = catalog::resolve("sinf").unwrap();
    let samples = SampleBuffer::from_slice(&values, Alignment::new(64).unwrap()).unwrap();
    let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
    BatchExecutor::hardware()
        .execute(op, &samples, &mut results, &mut OperationCounter::new())
        .unwrap();

    let got = results.values().as_f32().unwrap();
    for (x, y) in values.iter().zip(got) {
        assert_eq!(x.sin().to_bits(), y.to_bits());
    }
}
