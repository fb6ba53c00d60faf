//! Error types used by the stress runtime, its workers and collaborators.
//!
//! - [`WorkerError`]: construction-time failures (missing executable, no usable address).
//!   Raised before any worker starts; the whole run is aborted.
//! - [`DiagnosticsError`]: the platform diagnostics command failed or printed garbage.
//! - [`RuntimeError`]: fatal failures while running or draining (kill failed, sampler
//!   failed, log persistence failed).
//! - [`BenchError`]: a sysbench run failed or its report could not be read.
//!
//! Every enum provides [`as_label`](RuntimeError::as_label) for logs.

use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

use crate::net::AddressFamily;

/// # Errors raised while assembling workers.
///
/// These never happen once a run is in progress: all workers are resolved
/// before the first one is started.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The program could not be located on `PATH`.
    #[error("could not find executable '{executable}' in PATH")]
    ExecutableNotFound {
        /// Program name as given in the command.
        executable: String,
    },

    /// The interface has no address of the requested family.
    #[error("could not determine {family} address for interface: {interface}")]
    AddressNotFound {
        /// Interface name as given on the command line.
        interface: String,
        /// Requested address family.
        family: AddressFamily,
    },

    /// Enumerating the network interfaces failed.
    #[error("failed to enumerate network interfaces: {0}")]
    Interfaces(#[source] io::Error),
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use revpi_stress::WorkerError;
    ///
    /// let err = WorkerError::ExecutableNotFound { executable: "stress-ng".into() };
    /// assert_eq!(err.as_label(), "worker_executable_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::ExecutableNotFound { .. } => "worker_executable_not_found",
            WorkerError::AddressNotFound { .. } => "worker_address_not_found",
            WorkerError::Interfaces(_) => "worker_interfaces",
        }
    }

    /// Returns the missing executable, if this is a dependency error.
    pub fn executable(&self) -> Option<&str> {
        match self {
            WorkerError::ExecutableNotFound { executable } => Some(executable),
            _ => None,
        }
    }
}

/// # Errors produced by the platform diagnostics collaborator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// The diagnostics command could not be executed.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The diagnostics command exited unsuccessfully.
    #[error("'{command}' exited with {status}")]
    Status { command: String, status: ExitStatus },

    /// The output did not have the expected `key=value` shape.
    #[error("'{command}' printed unexpected output: {output:?}")]
    Malformed { command: String, output: String },
}

impl DiagnosticsError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DiagnosticsError::Spawn { .. } => "diagnostics_spawn",
            DiagnosticsError::Status { .. } => "diagnostics_status",
            DiagnosticsError::Malformed { .. } => "diagnostics_malformed",
        }
    }
}

/// # Fatal errors produced by the running system.
///
/// Transient worker crashes are **not** errors: they are restarted and only
/// reported as events.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A child ignored SIGTERM and could not be killed either.
    #[error("failed to kill worker '{worker}': {reason}")]
    KillFailed { worker: String, reason: String },

    /// Sampling platform health failed; the run is aborted.
    #[error("metrics sampling failed: {0}")]
    Diagnostics(#[from] DiagnosticsError),

    /// The sampler thread panicked.
    #[error("metrics sampler panicked")]
    SamplerPanicked,

    /// A supervisor task panicked or was aborted.
    #[error("supervisor for worker '{worker}' terminated abnormally")]
    SupervisorLost { worker: String },

    /// Writing a CSV log failed.
    #[error("failed to write log {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use revpi_stress::RuntimeError;
    ///
    /// let err = RuntimeError::KillFailed { worker: "stress_cpu".into(), reason: "EPERM".into() };
    /// assert_eq!(err.as_label(), "runtime_kill_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::KillFailed { .. } => "runtime_kill_failed",
            RuntimeError::Diagnostics(_) => "runtime_diagnostics",
            RuntimeError::SamplerPanicked => "runtime_sampler_panicked",
            RuntimeError::SupervisorLost { .. } => "runtime_supervisor_lost",
            RuntimeError::Persist { .. } => "runtime_persist",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Errors produced while assembling a [`RunController`](crate::RunController).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    /// A worker could not be constructed; nothing was started.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The diagnostics collaborator could not be constructed.
    #[error("diagnostics unavailable: {0}")]
    Diagnostics(#[source] WorkerError),
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::Worker(e) | BuildError::Diagnostics(e) => e.as_label(),
        }
    }

    /// Returns the missing executable, if assembly failed on a dependency.
    pub fn executable(&self) -> Option<&str> {
        match self {
            BuildError::Worker(e) | BuildError::Diagnostics(e) => e.executable(),
        }
    }
}

/// # Errors raised by a sysbench benchmark run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BenchError {
    /// `sysbench` is not installed.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The process could not be run.
    #[error("failed to run sysbench: {0}")]
    Io(#[from] io::Error),

    /// sysbench exited unsuccessfully.
    #[error("sysbench failed with {status}")]
    Failed {
        /// Exit status of the run.
        status: ExitStatus,
    },

    /// The report lacks a timing line.
    #[error("sysbench output has no '{field}' line")]
    MissingField {
        /// Label of the missing line.
        field: &'static str,
    },

    /// A timing line holds no number.
    #[error("sysbench output has an invalid '{field}' value: '{value}'")]
    InvalidField {
        /// Label of the line.
        field: &'static str,
        /// Text found after the label.
        value: String,
    },
}

impl BenchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BenchError::Worker(e) => e.as_label(),
            BenchError::Io(_) => "bench_io",
            BenchError::Failed { .. } => "bench_failed",
            BenchError::MissingField { .. } => "bench_missing_field",
            BenchError::InvalidField { .. } => "bench_invalid_field",
        }
    }
}
