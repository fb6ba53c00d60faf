//! revpi-benchmark CLI: sweeps sysbench thread counts and prints the timings as TSV.

use std::{io, process::ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use revpi_stress::{
    BenchError,
    bench::{self, Benchmark},
};

#[derive(Parser, Debug)]
#[command(name = "revpi-benchmark")]
#[command(
    version,
    about = "Measure how sysbench CPU and memory throughput scale with the thread count",
    long_about = "Runs sysbench once per configuration, one run at a time, and prints one \
                  tab-separated row per run with its total and event execution time in \
                  seconds. Diagnostics go to stderr."
)]
struct Cli {
    #[command(subcommand)]
    test: Test,

    /// Highest thread count of the sweep (starts at 1)
    #[arg(short = 't', long, global = true, default_value_t = bench::DEFAULT_MAX_THREADS,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_threads: u32,
}

#[derive(Subcommand, Debug)]
enum Test {
    /// Prime number computation, one row per thread count
    Cpu {
        /// Largest prime to compute
        #[arg(long, default_value_t = bench::DEFAULT_CPU_MAX_PRIME)]
        max_prime: u32,
    },
    /// Memory transfers, one row per block size and thread count
    Memory {
        /// Block size in KiB (repeatable; default 64 to 1024 in steps of 64)
        #[arg(short = 'b', long = "block-size", value_name = "KIB",
              value_parser = clap::value_parser!(u32).range(1..))]
        block_sizes: Vec<u32>,

        /// Data moved by each run, in sysbench notation
        #[arg(long, default_value = bench::DEFAULT_MEMORY_TOTAL_SIZE)]
        total_size: String,
    },
}

impl Test {
    fn header(&self) -> &'static [&'static str] {
        match self {
            Test::Cpu { .. } => &["threads", "total_time", "exec_time"],
            Test::Memory { .. } => &["size", "threads", "total_time", "exec_time"],
        }
    }

    /// Benchmarks in run order, each with the leading columns of its rows.
    fn plan(&self) -> Vec<(Vec<String>, Benchmark)> {
        match self {
            Test::Cpu { max_prime } => vec![(
                Vec::new(),
                Benchmark::Cpu {
                    max_prime: *max_prime,
                },
            )],
            Test::Memory {
                block_sizes,
                total_size,
            } => {
                let sizes = if block_sizes.is_empty() {
                    bench::DEFAULT_BLOCK_SIZES_KIB.to_vec()
                } else {
                    block_sizes.clone()
                };
                sizes
                    .into_iter()
                    .map(|block_kib| {
                        (
                            vec![block_kib.to_string()],
                            Benchmark::Memory {
                                block_kib,
                                total_size: total_size.clone(),
                            },
                        )
                    })
                    .collect()
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("revpi_benchmark=info")),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<BenchError>() {
                Some(BenchError::Worker(e)) if e.executable().is_some() => error!(
                    "dependency missing: could not find executable '{}' in PATH",
                    bench::SYSBENCH
                ),
                _ => error!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout());
    out.write_record(cli.test.header())?;
    out.flush()?;

    for (lead, benchmark) in cli.test.plan() {
        for threads in 1..=cli.max_threads {
            let times = benchmark
                .run(threads)
                .await
                .with_context(|| format!("{benchmark:?} with {threads} threads"))?;
            debug!(?benchmark, threads, total = times.total, exec = times.exec, "sysbench run done");

            let mut row = lead.clone();
            row.extend([
                threads.to_string(),
                times.total.to_string(),
                times.exec.to_string(),
            ]);
            out.write_record(&row)?;
            // rows appear while the sweep is still running
            out.flush()?;
        }
    }
    Ok(())
}
