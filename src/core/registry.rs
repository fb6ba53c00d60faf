//! # Worker registry: ordered collection of process supervisors.
//!
//! The registry owns every [`ProcessSupervisor`] of a run and drives them as a group:
//! - [`WorkerRegistry::start_all`] binds each supervisor to the shared stop signal
//! - [`WorkerRegistry::join_all`] waits for every supervisor concurrently and reports
//!
//! ## Architecture
//! ```text
//! add(sup) ... add(sup)
//!      │
//! start_all(stop, bus) ─► sup[0].start  sup[1].start  ...  sup[N-1].start
//!                               │             │                  │
//!                       (all share one CancellationToken)
//!                               ▼             ▼                  ▼
//! join_all() ──────────► join_all(sup[i].join()) ─► publish AllWorkersJoined
//! ```
//!
//! ## Rules
//! - Registration order is preserved in [`names`](WorkerRegistry::names) and in
//!   the [`join_all`](WorkerRegistry::join_all) report
//! - Joining is a barrier: it completes only when **every** supervisor finished
//! - A failed supervisor does not prevent the others from being joined

use futures::future;
use tokio_util::sync::CancellationToken;

use crate::{
    core::supervisor::{ProcessSupervisor, WorkerOutput},
    error::RuntimeError,
    events::{Bus, Event, EventKind},
};

/// Ordered set of process supervisors started and joined together.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: Vec<ProcessSupervisor>,
    bus: Option<Bus>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a supervisor. Must be called before [`start_all`](Self::start_all).
    pub fn add(&mut self, worker: ProcessSupervisor) {
        self.workers.push(worker);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Worker names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name().to_string()).collect()
    }

    /// Starts every registered supervisor on the shared `stop` signal.
    pub fn start_all(&mut self, stop: &CancellationToken, bus: &Bus) {
        for worker in &mut self.workers {
            worker.start(stop.clone(), bus.clone());
        }
        self.bus = Some(bus.clone());
    }

    /// Waits until every supervisor finished its shutdown sequence.
    ///
    /// Only returns once the stop signal fired (or for supervisors that were
    /// never started). Results are reported per worker, in registration order.
    pub async fn join_all(&mut self) -> Vec<(String, Result<WorkerOutput, RuntimeError>)> {
        let joins = self.workers.iter_mut().map(|w| async move {
            let name = w.name().to_string();
            (name, w.join().await)
        });
        let report = future::join_all(joins).await;

        if let Some(bus) = &self.bus {
            let failed = report.iter().filter(|(_, res)| res.is_err()).count();
            bus.publish(
                Event::new(EventKind::AllWorkersJoined)
                    .with_reason(format!("{} workers, {failed} failed", report.len())),
            );
        }
        report
    }
}
