//! # Restart policies for process supervisors.
//!
//! [`RestartPolicy`] decides whether a child that exited **on its own** (not
//! because of a stop request) is launched again.
//!
//! ```text
//! RestartPolicy::Always     → relaunch after any exit (load generators)
//! RestartPolicy::OnFailure  → relaunch only after a non-zero exit or a signal
//! RestartPolicy::Never      → run once; the supervisor idles until stop
//! ```
//!
//! In every case the supervision loop itself keeps running until the shared
//! stop signal fires, so `join` semantics do not depend on the policy.

use std::process::ExitStatus;

/// Policy controlling whether a child process is restarted after it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the process runs once.
    Never,
    /// Restart only if the process failed.
    OnFailure,
    /// Restart unconditionally (default).
    #[default]
    Always,
}

impl RestartPolicy {
    /// Returns `true` if a child that exited with `status` should be relaunched.
    ///
    /// `None` means the child never ran (spawn failure) and counts as a failure.
    pub fn should_restart(&self, status: Option<ExitStatus>) -> bool {
        match self {
            RestartPolicy::Always => true,
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => !status.is_some_and(|s| s.success()),
        }
    }
}
