//! # mbench CLI
//!
//! Reads samples, runs one catalog operation over them on a worker pool and
//! prints timing, exceptions and (with the `mpfr` feature) accuracy.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mbench::input::read_samples;
use mbench::report::{summary_line, write_values, ValueFormat};
use mbench::{
    catalog, reference, Alignment, BatchExecutor, Driver, DriverConfig, ErrnoPolicy, ErrorReport,
    ExecConfig, FloatingPointEnv, HardwareEnv, Operation, ResultBuffer, RoundingMode,
    SampleBuffer, WorkingPrecision,
};

/// Benchmark an elementary math function over samples read from FILE
#[derive(Parser)]
#[command(name = "mbench")]
#[command(version)]
#[command(after_help = "With no FILE, or when FILE is -, read standard input.")]
struct Cli {
    /// Operation to benchmark (see --list)
    #[arg(long, default_value = "exp")]
    op: String,

    /// Rounding mode: downward, tonearest, towardzero or upward [default: current mode]
    #[arg(long)]
    round: Option<RoundingMode>,

    /// Sample and result alignment in bytes [default: pointer size]
    #[arg(long, allow_negative_numbers = true)]
    alignment: Option<i64>,

    /// Keep repeating until at least this many element evaluations per worker
    #[arg(long, default_value_t = 0)]
    min_ops: u64,

    /// Minimum number of batches per worker
    #[arg(long, default_value_t = 1)]
    repeat: u64,

    /// Reference precision in bits, -1 for MPFR's default
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    error_precision: i64,

    /// Field width of printed results
    #[arg(long, default_value_t = 0)]
    out_field_width: usize,

    /// Digits after the decimal point in printed results, -1 for six
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    out_precision: i64,

    /// Number of workers [default: available parallelism]
    #[arg(long)]
    threads: Option<usize>,

    /// Fail the run when the math library sets errno. glibc's libm reports
    /// domain and range errors through errno; the check is off unless given
    #[arg(long)]
    errno: bool,

    /// Increase verbosity (repeatable); -vv also prints results
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print nothing on success
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// List available operations and exit
    #[arg(long)]
    list: bool,

    /// Input file of whitespace-separated numbers
    file: Option<PathBuf>,
}

impl Cli {
    fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }

    fn value_format(&self) -> ValueFormat {
        ValueFormat {
            width: self.out_field_width,
            precision: usize::try_from(self.out_precision).ok(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mbench=warn")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mbench: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.list {
        return list_operations();
    }

    let op = catalog::resolve(&cli.op)?;
    let alignment = match cli.alignment {
        Some(bytes) => Alignment::new(bytes)?,
        None => Alignment::default(),
    };
    let rounding = cli
        .round
        .or_else(|| HardwareEnv.rounding())
        .unwrap_or_default();
    let workers = match cli.threads {
        Some(n) => n,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };

    let samples = {
        let reader = open_input(cli.file.as_ref())?;
        read_samples(reader, op.precision(), alignment).with_context(|| match &cli.file {
            Some(path) => format!("reading {}", path.display()),
            None => "reading standard input".to_owned(),
        })?
    };
    tracing::info!(op = op.name(), samples = samples.len(), %rounding, workers, "starting run");

    let executor = BatchExecutor::new(
        HardwareEnv,
        ExecConfig {
            rounding: cli.round,
            errno: if cli.errno {
                ErrnoPolicy::Honor
            } else {
                ErrnoPolicy::Ignore
            },
            ..ExecConfig::default()
        },
    )?;
    let driver = Driver::new(DriverConfig {
        repetitions: cli.repeat,
        min_ops: cli.min_ops,
        workers,
    })?;

    let mut results = ResultBuffer::for_operation(op, &samples)?;
    let summary = driver.run(&executor, op, &samples, &mut results)?;
    if summary.failed() && cli.verbosity() >= 2 {
        write_values(&mut io::stderr().lock(), results.values(), cli.value_format())?;
    }
    let summary = summary
        .into_result()
        .with_context(|| format!("running {}", op.name()))?;

    let accuracy = accuracy(cli, op, &samples, &results, rounding)?;

    if cli.verbosity() >= 1 {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{}",
            summary_line(&summary, results.exceptions(), accuracy.as_ref())
        )?;
    }
    if cli.verbosity() >= 2 {
        write_values(&mut io::stderr().lock(), results.values(), cli.value_format())?;
    }
    Ok(())
}

/// Reference error for the report line; skipped entirely when nothing is printed.
fn accuracy(
    cli: &Cli,
    op: &Operation,
    samples: &SampleBuffer,
    results: &ResultBuffer,
    rounding: RoundingMode,
) -> Result<Option<ErrorReport>> {
    if cli.verbosity() == 0 {
        return Ok(None);
    }
    let precision = WorkingPrecision::from_arg(cli.error_precision)?;
    match reference::estimate(op, samples, results, rounding, precision) {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_unsupported() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            let file = File::open(p).with_context(|| format!("opening {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn list_operations() -> Result<()> {
    let mut out = io::stdout().lock();
    for op in catalog::operations() {
        writeln!(out, "{:<8} {:<4} {}", op.name(), op.precision(), op.family())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_batch() -> (&'static Operation, SampleBuffer, ResultBuffer) {
        let op = catalog::resolve("exp").unwrap();
        let samples = SampleBuffer::from_slice(&[1.0f64, 2.0], Alignment::default()).unwrap();
        let results = ResultBuffer::for_operation(op, &samples).unwrap();
        (op, samples, results)
    }

    #[test]
    fn test_quiet_run_skips_accuracy() {
        let cli = Cli::try_parse_from(["mbench", "-q", "--error-precision", "0"]).unwrap();
        let (op, samples, results) = exp_batch();
        let report = accuracy(&cli, op, &samples, &results, RoundingMode::ToNearest).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_bad_error_precision_fails_when_reporting() {
        let cli = Cli::try_parse_from(["mbench", "--error-precision", "0"]).unwrap();
        let (op, samples, results) = exp_batch();
        assert!(accuracy(&cli, op, &samples, &results, RoundingMode::ToNearest).is_err());
    }

    #[test]
    fn test_errno_is_opt_in() {
        let cli = Cli::try_parse_from(["mbench"]).unwrap();
        assert!(!cli.errno);
        assert_eq!(ErrnoPolicy::default(), ErrnoPolicy::Ignore);
        let cli = Cli::try_parse_from(["mbench", "--errno"]).unwrap();
        assert!(cli.errno);
    }
}
