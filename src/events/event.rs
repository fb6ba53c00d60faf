//! # Runtime events emitted by the controller and process supervisors.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Worker lifecycle**: spawn, unexpected exit, restart, termination, kill escalation
//! - **Run lifecycle**: shutdown requested, all workers joined, log persisted
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries optional metadata (worker name, pid, attempt,
//! delays, reason).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order across subscribers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use revpi_stress::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_worker("stress_cpu")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(500));
//!
//! assert_eq!(ev.kind, EventKind::RestartScheduled);
//! assert_eq!(ev.worker.as_deref(), Some("stress_cpu"));
//! assert_eq!(ev.delay_ms, Some(500));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `worker` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (subscriber name), `reason` (`full` / `closed`).
    SubscriberOverflow,

    // === Run events ===
    /// The shared stop signal fired.
    ///
    /// Sets: `reason` (`signal`, `stop`, `sampler`).
    ShutdownRequested,

    /// Every supervisor finished its shutdown sequence.
    AllWorkersJoined,

    /// A CSV log was written.
    ///
    /// Sets: `reason` (destination path).
    LogPersisted,

    // === Worker lifecycle ===
    /// A child process was launched.
    ///
    /// Sets: `worker`, `attempt` (1-based, per supervisor), `pid`.
    WorkerStarting,

    /// Launching the child failed; treated like an unexpected exit.
    ///
    /// Sets: `worker`, `attempt`, `reason`.
    WorkerSpawnFailed,

    /// The child exited without a stop request.
    ///
    /// Sets: `worker`, `attempt`, `pid`, `reason` (exit status).
    WorkerExited,

    /// A relaunch is scheduled.
    ///
    /// Sets: `worker`, `attempt` (the attempt that exited), `delay_ms`.
    RestartScheduled,

    /// The restart policy forbids a relaunch; the supervisor idles until stop.
    ///
    /// Sets: `worker`, `attempt`.
    RestartExhausted,

    /// SIGTERM was sent to the live child.
    ///
    /// Sets: `worker`, `pid`, `timeout_ms` (grace before SIGKILL).
    TerminateSent,

    /// The child outlived the grace period and was killed.
    ///
    /// Sets: `worker`, `pid`, `timeout_ms`.
    KillEscalated,

    /// The supervisor finished and its output buffers are populated.
    ///
    /// Sets: `worker`, `attempt`, `reason` (final exit status, if any).
    WorkerStopped,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Launch count of the worker (starting from 1).
    pub attempt: Option<u32>,
    /// Child process id.
    pub pid: Option<u32>,
    /// Restart delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Termination grace period in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Human-readable detail (exit status, errors, paths).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            attempt: None,
            pid: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a child pid (ignored when unknown).
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(as_ms(d));
        self
    }

    /// Attaches a termination grace period (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(as_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}

fn as_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
