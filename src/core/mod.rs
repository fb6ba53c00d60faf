//! Runtime core: supervision and run orchestration.
//!
//! The public API from this module is [`RunController`] (with its builder) plus
//! the building blocks it drives, [`ProcessSupervisor`] and [`WorkerRegistry`].
//!
//! Internal modules:
//! - [`runner`]: launches one child, terminates it (SIGTERM → SIGKILL) and drains its output;
//! - [`supervisor`]: keeps one worker alive with restart policy and backoff;
//! - [`registry`]: starts and joins all supervisors of a run;
//! - [`controller`]: samples metrics until stop, drains workers, persists logs;
//! - [`builder`]: fail-fast assembly of a controller;
//! - [`shutdown`]: OS shutdown signal handling.

mod builder;
mod controller;
mod registry;
mod runner;
mod shutdown;
mod supervisor;

pub use builder::RunControllerBuilder;
pub use controller::{RunController, RunReport, RunState, StopHandle};
pub use registry::WorkerRegistry;
pub use supervisor::{ProcessSupervisor, WorkerOutput};
