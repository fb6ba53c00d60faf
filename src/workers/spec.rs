//! # Worker specification for supervised execution.
//!
//! [`WorkerSpec`] bundles a resolved [`Command`] with the policies a
//! [`ProcessSupervisor`](crate::ProcessSupervisor) applies to it.
//!
//! A spec can be created:
//! - **From a kind** with [`WorkerSpec::from_kind`] (name, restart and output follow the kind)
//! - **Explicitly** with [`WorkerSpec::new`]
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use revpi_stress::{Command, RestartPolicy, WorkerSpec};
//!
//! let cmd = Command::new("sleep", ["30"]).unwrap();
//! let spec = WorkerSpec::new("sleeper", cmd)
//!     .with_restart(RestartPolicy::OnFailure)
//!     .with_grace(Duration::from_secs(2));
//! assert_eq!(spec.name(), "sleeper");
//! ```

use std::time::Duration;

use crate::{
    config::RunConfig,
    error::WorkerError,
    policies::{BackoffPolicy, RestartPolicy},
    workers::{Command, WorkerKind},
};

/// Post-run treatment of a worker's captured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputHandling {
    /// Kept in the run report only.
    #[default]
    Retain,
    /// Parsed as a latency histogram once the worker stopped.
    Histogram,
}

/// Specification for running one external command under supervision.
#[derive(Clone, Debug)]
pub struct WorkerSpec {
    name: String,
    command: Command,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    grace: Duration,
    output: OutputHandling,
}

impl WorkerSpec {
    /// Default SIGTERM → SIGKILL escalation timeout.
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

    /// Creates a spec with default policies (`Always`, 500ms constant backoff, 5s grace).
    pub fn new(name: impl Into<String>, command: Command) -> Self {
        Self {
            name: name.into(),
            command,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            grace: Self::DEFAULT_GRACE,
            output: OutputHandling::default(),
        }
    }

    /// Resolves `kind` into a spec.
    ///
    /// Fails with [`WorkerError::ExecutableNotFound`] if the kind's program is
    /// not on `PATH`.
    pub fn from_kind(kind: &WorkerKind) -> Result<Self, WorkerError> {
        Ok(Self::new(kind.name(), kind.command()?)
            .with_restart(kind.restart())
            .with_output(kind.output()))
    }

    /// Applies run-wide defaults (grace period, restart backoff).
    pub fn with_defaults(self, cfg: &RunConfig) -> Self {
        self.with_grace(cfg.grace).with_backoff(cfg.backoff)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Time a child gets between SIGTERM and SIGKILL.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn output(&self) -> OutputHandling {
        self.output
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with updated backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a new spec with updated grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Returns a new spec with updated output handling.
    pub fn with_output(mut self, output: OutputHandling) -> Self {
        self.output = output;
        self
    }
}
