//! Restart policies for supervised processes.
//!
//! This module groups the knobs that control **if** a child process is started
//! again after it exits on its own, and **how long** the supervisor waits before
//! doing so.
//!
//! ## Contents
//! - [`RestartPolicy`] when to restart (never / on-failure / always)
//! - [`BackoffPolicy`] how restart delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of the delay
//!
//! ## Quick wiring
//! ```text
//! WorkerSpec { restart: RestartPolicy, backoff: BackoffPolicy, .. }
//!      └─► core::supervisor::ProcessSupervisor uses:
//!           - restart.should_restart(status) to decide relaunch/idle
//!           - backoff.next(restarts) to delay the relaunch
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Always`: load generators are expected to run until stopped.
//! - `BackoffPolicy::default()` → first=500ms, factor=1.0 (constant), max=30s, jitter=None.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
