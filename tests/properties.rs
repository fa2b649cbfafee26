//! Property tests for batch execution and exception rendering.

use mbench::{
    catalog, Alignment, BatchExecutor, ExceptionFlags, ExecConfig, HardwareEnv, OperationCounter,
    ResultBuffer, SampleBuffer,
};
use proptest::prelude::*;

fn flag_set() -> impl Strategy<Value = ExceptionFlags> {
    (0u8..32).prop_map(|bits| {
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
    })
}

proptest! {
    /// Every result equals the kernel applied to the sample at the same
    /// index, whatever the chunking.
    #[test]
    fn test_results_are_elementwise(
        values in prop::collection::vec(-50.0f64..50.0, 0..600),
        op_index in 0usize..50,
        chunk_size in 1usize..97,
    ) {
        let op = &catalog::operations()[op_index];
        let samples = match op.kernel() {
            mbench::Kernel::Double(_) => SampleBuffer::from_slice(&values, Alignment::default()),
            mbench::Kernel::Single(_) => {
                let v: Vec<f32> = values.iter().map(|&x| x as f32).collect();
                SampleBuffer::from_slice(&v, Alignment::default())
            }
        }.unwrap();
        let mut results = ResultBuffer::for_operation(op, &samples).unwrap();
        let mut counter = OperationCounter::new();
        let executor = BatchExecutor::new(HardwareEnv, ExecConfig {
            parallel_threshold: 0,
            chunk_size,
            ..ExecConfig::default()
        }).unwrap();

        let n = executor.execute(op, &samples, &mut results, &mut counter).unwrap();
        prop_assert_eq!(n, values.len() as u64);
        prop_assert_eq!(counter.get(), n);
        prop_assert_eq!(results.len(), samples.len());

        for i in 0..samples.len() {
            let expected = op.kernel().eval(samples.get(i).unwrap());
            let got = results.values().get(i).unwrap();
            prop_assert!(
                expected.to_bits() == got.to_bits() || (expected.is_nan() && got.is_nan()),
                "{}({:?}) = {} expected {}", op.name(), samples.get(i), got, expected
            );
        }
    }

    /// Rendering lists exactly the set categories, in canonical order.
    #[test]
    fn test_rendering_is_canonical(flags in flag_set()) {
        let rendered = flags.to_string();
        if flags.is_empty() {
            prop_assert_eq!(rendered, "none");
        } else {
            let order = ["divide-by-zero", "inexact", "invalid", "overflow", "underflow"];
            let parts: Vec<&str> = rendered.split(',').collect();
            let positions: Vec<usize> = parts
                .iter()
                .map(|p| order.iter().position(|o| o == p).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(parts.len(), flags.names().count());
        }
    }
}
