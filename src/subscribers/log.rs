//! # LogWriter: tracing-backed event renderer
//!
//! Renders runtime events as structured `tracing` records. Unexpected worker
//! exits and kill escalations are warnings; everything else is info/debug.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  worker starting worker="stress_cpu" attempt=1 pid=4242
//! WARN  worker exited unexpectedly worker="stress_cpu" attempt=1 status="exit status: 1"
//! DEBUG restart scheduled worker="stress_cpu" delay_ms=500
//! INFO  terminate sent worker="stress_cpu" pid=4250 grace_ms=5000
//! WARN  kill escalated worker="stress_cpu" pid=4250
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::WorkerStarting => {
                info!(worker, attempt = e.attempt, pid = e.pid, "worker starting");
            }
            EventKind::WorkerSpawnFailed => {
                warn!(worker, attempt = e.attempt, error = reason, "worker spawn failed");
            }
            EventKind::WorkerExited => {
                warn!(
                    worker,
                    attempt = e.attempt,
                    pid = e.pid,
                    status = reason,
                    "worker exited unexpectedly"
                );
            }
            EventKind::RestartScheduled => {
                debug!(worker, after_attempt = e.attempt, delay_ms = e.delay_ms, "restart scheduled");
            }
            EventKind::RestartExhausted => {
                info!(worker, attempt = e.attempt, "restart policy exhausted, idling until stop");
            }
            EventKind::TerminateSent => {
                info!(worker, pid = e.pid, grace_ms = e.timeout_ms, "terminate sent");
            }
            EventKind::KillEscalated => {
                warn!(worker, pid = e.pid, grace_ms = e.timeout_ms, "kill escalated");
            }
            EventKind::WorkerStopped => {
                info!(worker, attempts = e.attempt, status = reason, "worker stopped");
            }
            EventKind::ShutdownRequested => {
                info!(source = reason, "shutdown requested");
            }
            EventKind::AllWorkersJoined => {
                info!("all workers joined");
            }
            EventKind::LogPersisted => {
                info!(path = reason, "log persisted");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = worker, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
