//! # sysbench sweeps.
//!
//! Measures how CPU and memory throughput scale with the number of threads by
//! running `sysbench` once per configuration and reading the timings from its
//! report:
//! - `total time:` wall-clock duration of the run, in seconds;
//! - `total time taken by event execution:` time spent inside events, summed
//!   over all threads.
//!
//! ```text
//! Benchmark::Cpu    ─► threads 1..=N                    ─► threads, total, exec
//! Benchmark::Memory ─► block 64K..=1024K × threads 1..=N ─► size, threads, total, exec
//! ```
//!
//! Runs are strictly sequential; two sysbench instances would measure each other.

use crate::{error::BenchError, workers::Command};

/// Program run by every benchmark.
pub const SYSBENCH: &str = "sysbench";

/// Thread counts swept by default (`1..=39`).
pub const DEFAULT_MAX_THREADS: u32 = 39;

/// Largest prime computed by the CPU test.
pub const DEFAULT_CPU_MAX_PRIME: u32 = 5000;

/// Memory block sizes swept by default, in KiB.
pub const DEFAULT_BLOCK_SIZES_KIB: [u32; 16] = [
    64, 128, 192, 256, 320, 384, 448, 512, 576, 640, 704, 768, 832, 896, 960, 1024,
];

/// Amount of data transferred by one memory test.
pub const DEFAULT_MEMORY_TOTAL_SIZE: &str = "1G";

const TOTAL_TIME: &str = "total time:";
const EXEC_TIME: &str = "total time taken by event execution:";

/// One sysbench test configuration, without its thread count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Benchmark {
    /// Prime number computation up to `max_prime`.
    Cpu { max_prime: u32 },
    /// Memory transfers of `block_kib` KiB blocks until `total_size` is moved.
    Memory { block_kib: u32, total_size: String },
}

impl Benchmark {
    /// sysbench arguments for a run with `threads` threads.
    pub fn args(&self, threads: u32) -> Vec<String> {
        let mut args = vec![format!("--num-threads={threads}")];
        match self {
            Benchmark::Cpu { max_prime } => {
                args.push("--test=cpu".to_string());
                args.push(format!("--cpu-max-prime={max_prime}"));
            }
            Benchmark::Memory {
                block_kib,
                total_size,
            } => {
                args.push("--test=memory".to_string());
                args.push(format!("--memory-block-size={block_kib}K"));
                args.push(format!("--memory-total-size={total_size}"));
            }
        }
        args.push("run".to_string());
        args
    }

    /// Resolves `sysbench` and builds the command for `threads` threads.
    pub fn command(&self, threads: u32) -> Result<Command, BenchError> {
        Ok(Command::new(SYSBENCH, self.args(threads))?)
    }

    /// Runs the benchmark once and parses its report.
    pub async fn run(&self, threads: u32) -> Result<SysbenchTimes, BenchError> {
        let out = self.command(threads)?.to_process().output().await?;
        if !out.status.success() {
            return Err(BenchError::Failed { status: out.status });
        }
        SysbenchTimes::parse(&String::from_utf8_lossy(&out.stdout))
    }
}

/// Timings of one sysbench run, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SysbenchTimes {
    /// Wall-clock duration of the run.
    pub total: f64,
    /// Time spent executing events, summed over all threads.
    pub exec: f64,
}

impl SysbenchTimes {
    /// Reads both timings from a sysbench report.
    ///
    /// # Example
    /// ```
    /// use revpi_stress::bench::SysbenchTimes;
    ///
    /// let report = "total time: 10.0006s\ntotal time taken by event execution: 9.9834\n";
    /// let times = SysbenchTimes::parse(report).unwrap();
    /// assert_eq!(times.total, 10.0006);
    /// assert_eq!(times.exec, 9.9834);
    /// ```
    pub fn parse(report: &str) -> Result<Self, BenchError> {
        Ok(Self {
            total: seconds_after(report, TOTAL_TIME)?,
            exec: seconds_after(report, EXEC_TIME)?,
        })
    }
}

/// Parses the number that follows the first occurrence of `label`.
fn seconds_after(report: &str, label: &'static str) -> Result<f64, BenchError> {
    let start = report
        .find(label)
        .ok_or(BenchError::MissingField { field: label })?;
    let rest = report[start + label.len()..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].parse().map_err(|_| BenchError::InvalidField {
        field: label,
        value: rest.lines().next().unwrap_or_default().to_string(),
    })
}
