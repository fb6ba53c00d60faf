//! # revpi-stress
//!
//! **revpi-stress** runs a set of load generators on an embedded controller and
//! records how the platform copes.
//!
//! It supervises external tools (`stress-ng`, `iperf3`, `cyclictest`), keeps
//! them running until stopped, samples SoC temperature, clock speed and throttle
//! state on a fixed interval, and writes the results as CSV logs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerKind  │   │  WorkerKind  │   │  WorkerSpec  │
//!     │ (stress-ng)  │   │   (iperf3)   │   │   (custom)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  RunController (run orchestrator)                                 │
//! │  - stop signal (one CancellationToken shared by everything)       │
//! │  - WorkerRegistry (starts / joins supervisors)                    │
//! │  - MetricsSampler (vcgencmd diagnostics, every 1-60s)             │
//! │  - Bus + SubscriberSet (observability)                            │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐ │
//! │ProcessSupervisor │ │ProcessSupervisor │ │ProcessSupervisor │ │
//! │ (restart loop)   │ │ (restart loop)   │ │ (restart loop)   │ │
//! └┬─────────────────┘ └┬─────────────────┘ └┬─────────────────┘ │
//!  │ WorkerStarting     │ WorkerExited       │ TerminateSent     │ ShutdownRequested
//!  │ RestartScheduled   │ KillEscalated      │ WorkerStopped     │ LogPersisted
//!  ▼                    ▼                    ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet ──► LogWriter (tracing), ...
//! ```
//!
//! ### Run lifecycle
//! ```text
//! Idle ─► Running: start every supervisor, sample on each tick
//!      ─► Draining: stop signal → SIGTERM (→ SIGKILL) each child, read its output
//!      ─► Stopped: metric log + latency histogram written as CSV
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / functions                          |
//! |-------------------|---------------------------------------------------------------|------------------------------------------------|
//! | **Supervision**   | Keep one external command alive until stop.                   | [`ProcessSupervisor`], [`WorkerRegistry`]      |
//! | **Workers**       | Predefined load generators and custom commands.               | [`WorkerKind`], [`WorkerSpec`], [`Command`]    |
//! | **Policies**      | Restart decision and restart delay.                           | [`RestartPolicy`], [`BackoffPolicy`]           |
//! | **Metrics**       | Platform health sampling.                                     | [`MetricsSampler`], [`Diagnostics`]            |
//! | **Logs**          | CSV persistence and histogram parsing.                        | [`csvlog`], [`histogram`]                      |
//! | **Benchmarks**    | sysbench CPU and memory sweeps.                               | [`bench`]                                      |
//! | **Subscriber API**| Hook into runtime events.                                     | [`Subscribe`], [`LogWriter`]                   |
//! | **Errors**        | Typed errors for assembly and runtime.                        | [`WorkerError`], [`RuntimeError`]              |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use revpi_stress::{LogWriter, RunConfig, RunController, Subscribe, WorkerKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let ctl = RunController::builder(RunConfig::default())
//!         .with_subscribers(subs)
//!         .with_worker(WorkerKind::StressCpu { cores: 4 })
//!         .with_live_output(std::io::stdout())
//!         .build()?;
//!
//!     // Runs until SIGINT/SIGTERM/SIGQUIT.
//!     let report = ctl.run().await?;
//!     println!("{} samples", report.samples.len());
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod metrics;
mod policies;
mod subscribers;
mod workers;

pub mod bench;
pub mod csvlog;
pub mod histogram;
pub mod net;

// ---- Public re-exports ----

pub use config::RunConfig;
pub use core::{
    ProcessSupervisor, RunController, RunControllerBuilder, RunReport, RunState, StopHandle,
    WorkerOutput, WorkerRegistry,
};
pub use error::{BenchError, BuildError, DiagnosticsError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use metrics::{Diagnostics, MetricSample, MetricsSampler, Vcgencmd};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workers::{
    CYCLICTEST_HISTOGRAM_SIZE, CYCLICTEST_INTERVAL_US, Command, OutputHandling, WorkerKind,
    WorkerSpec,
};
