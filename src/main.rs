//! revpi-stress CLI: runs load generators and logs platform health until stopped.

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{CommandFactory, Parser, ValueEnum, error::ErrorKind};
use nix::unistd::Uid;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use revpi_stress::{
    BackoffPolicy, BuildError, JitterPolicy, LogWriter, RunConfig, RunController, Subscribe,
    WorkerKind,
};

#[derive(Parser, Debug)]
#[command(name = "revpi-stress")]
#[command(
    version,
    about = "Stress test an embedded controller and log platform health as CSV",
    long_about = "Runs stress-ng, iperf3 and cyclictest until SIGINT/SIGTERM while sampling \
                  SoC temperature, ARM clock speed and throttle state. Samples are printed \
                  to stdout as CSV; diagnostics go to stderr."
)]
struct Cli {
    /// Number of CPU cores to stress (0 = none)
    #[arg(short = 'c', value_name = "NUMBER_CPU_CORES", default_value_t = 0, help_heading = "stress-ng options")]
    cpu_cores: u32,

    /// Number of memory stressors (0 = none)
    #[arg(short = 'm', value_name = "NUMBER_VM_WORKERS", default_value_t = 0, help_heading = "stress-ng options")]
    vm_workers: u32,

    /// Start iperf3 servers on the RX and TX ports of INTERFACE (repeatable)
    #[arg(short = 'n', value_name = "INTERFACE", help_heading = "iperf3 options")]
    iperf3_servers: Vec<String>,

    /// Send iperf3 traffic from INTERFACE to PEER's TX port (repeatable)
    #[arg(long = "iperf3-client", value_name = "INTERFACE=PEER", value_parser = parse_client, help_heading = "iperf3 options")]
    iperf3_clients: Vec<(String, String)>,

    /// Port of the receiving iperf3 server
    #[arg(long, default_value_t = 5201, help_heading = "iperf3 options")]
    iperf3_rx_port: u16,

    /// Port of the transmitting iperf3 server
    #[arg(long, default_value_t = 5202, help_heading = "iperf3 options")]
    iperf3_tx_port: u16,

    /// Real-time priority of cyclictest (1-100)
    #[arg(short = 'p', value_name = "PRIO", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100), help_heading = "rt-tests options")]
    rt_prio: u8,

    /// Write the cyclictest latency histogram to this CSV file (enables cyclictest)
    #[arg(short = 'H', long, help_heading = "rt-tests options")]
    histogram_file: Option<PathBuf>,

    /// Seconds between two health samples (1-60)
    #[arg(short = 'i', value_name = "SECONDS", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..=60))]
    interval: u64,

    /// Write the health samples to this CSV file on exit
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    /// Seconds a worker gets to exit after SIGTERM before it is killed
    #[arg(long, default_value_t = 5)]
    grace_secs: u64,

    /// Delay before relaunching a worker that exited
    #[arg(long, value_name = "MS", default_value_t = 500, help_heading = "restart options")]
    restart_delay_ms: u64,

    /// Growth of the delay per consecutive failed launch (1 = constant)
    #[arg(long, value_name = "FACTOR", default_value_t = 1.0, value_parser = parse_factor,
          help_heading = "restart options")]
    restart_factor: f64,

    /// Upper bound of the grown delay
    #[arg(long, value_name = "SECONDS", default_value_t = 30, help_heading = "restart options")]
    restart_max_secs: u64,

    /// Randomization of the delay
    #[arg(long, value_enum, default_value_t = Jitter::None, help_heading = "restart options")]
    restart_jitter: Jitter,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Jitter {
    /// Exact delay
    None,
    /// Anywhere between zero and the delay
    Full,
    /// Between half the delay and the delay
    Equal,
}

impl From<Jitter> for JitterPolicy {
    fn from(j: Jitter) -> Self {
        match j {
            Jitter::None => JitterPolicy::None,
            Jitter::Full => JitterPolicy::Full,
            Jitter::Equal => JitterPolicy::Equal,
        }
    }
}

impl Cli {
    fn backoff(&self) -> BackoffPolicy {
        let first = Duration::from_millis(self.restart_delay_ms);
        BackoffPolicy {
            first,
            max: Duration::from_secs(self.restart_max_secs).max(first),
            factor: self.restart_factor,
            jitter: self.restart_jitter.into(),
        }
    }
}

fn parse_factor(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 1.0 => Ok(f),
        _ => Err(format!("expected a number >= 1, got '{s}'")),
    }
}

fn parse_client(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((iface, peer)) if !iface.is_empty() && !peer.is_empty() => {
            Ok((iface.to_string(), peer.to_string()))
        }
        _ => Err(format!("expected INTERFACE=PEER, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if !Uid::effective().is_root() {
        Cli::command()
            .error(ErrorKind::InvalidValue, "program needs to be run as superuser root")
            .exit();
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("revpi_stress=info")),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<BuildError>().and_then(BuildError::executable) {
                Some(exe) => error!(
                    "dependency missing: could not find executable '{exe}' in PATH; \
                     please refer to the setup instructions"
                ),
                None => error!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = RunConfig {
        sample_interval: Duration::from_secs(cli.interval),
        grace: Duration::from_secs(cli.grace_secs),
        backoff: cli.backoff(),
        log_file: cli.log_file,
        histogram_file: cli.histogram_file,
        ..RunConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut builder = RunController::builder(cfg.clone())
        .with_subscribers(subs)
        .with_live_output(std::io::stdout());

    if cli.cpu_cores > 0 {
        builder = builder.with_worker(WorkerKind::StressCpu {
            cores: cli.cpu_cores,
        });
    }
    if cli.vm_workers > 0 {
        builder = builder.with_worker(WorkerKind::StressVm {
            workers: cli.vm_workers,
        });
    }
    for iface in &cli.iperf3_servers {
        for port in [cli.iperf3_rx_port, cli.iperf3_tx_port] {
            let kind = WorkerKind::iperf3_server(iface, port).map_err(BuildError::from)?;
            builder = builder.with_worker(kind);
        }
    }
    for (iface, peer) in &cli.iperf3_clients {
        let kind =
            WorkerKind::iperf3_client(iface, peer, cli.iperf3_tx_port).map_err(BuildError::from)?;
        builder = builder.with_worker(kind);
    }
    if cfg.histogram_file.is_some() {
        builder = builder.with_worker(WorkerKind::CyclicTest {
            priority: cli.rt_prio,
        });
    }

    let ctl = builder.build()?;
    info!(workers = ?ctl.worker_names(), interval_s = cli.interval, "starting run");

    let report = ctl.run().await.context("stress run failed")?;
    info!(
        samples = report.samples.len(),
        histogram_rows = report.histogram.len(),
        "run finished"
    );
    Ok(())
}
