//! # Worker definitions.
//!
//! - [`Command`] - a program resolved on `PATH` plus its arguments
//! - [`WorkerKind`] - the closed set of load generators this tool runs
//! - [`WorkerSpec`] - command bundled with restart/backoff/grace/output policies
//!
//! A spec is the input of a [`ProcessSupervisor`](crate::ProcessSupervisor);
//! building one is where dependency errors surface.

mod command;
mod kind;
mod spec;

pub use command::Command;
pub use kind::{CYCLICTEST_HISTOGRAM_SIZE, CYCLICTEST_INTERVAL_US, WorkerKind};
pub use spec::{OutputHandling, WorkerSpec};
