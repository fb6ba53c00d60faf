use std::{io::Write, sync::Arc};

use crate::{
    config::RunConfig,
    core::{controller::RunController, registry::WorkerRegistry, supervisor::ProcessSupervisor},
    error::BuildError,
    events::Bus,
    metrics::{Diagnostics, MetricsSampler, Vcgencmd},
    subscribers::{Subscribe, SubscriberSet},
    workers::{WorkerKind, WorkerSpec},
};

/// Builder for assembling a [`RunController`].
///
/// Assembly is fail-fast: every worker and the diagnostics source are resolved
/// in [`build`](Self::build) before anything is spawned.
pub struct RunControllerBuilder {
    cfg: RunConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    kinds: Vec<WorkerKind>,
    specs: Vec<WorkerSpec>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    live: Option<Box<dyn Write + Send>>,
}

impl RunController {
    /// Starts assembling a controller with the given configuration.
    pub fn builder(cfg: RunConfig) -> RunControllerBuilder {
        RunControllerBuilder::new(cfg)
    }
}

impl RunControllerBuilder {
    pub fn new(cfg: RunConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            kinds: Vec::new(),
            specs: Vec::new(),
            diagnostics: None,
            live: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (worker lifecycle, shutdown, logs)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a worker of a predefined kind; run-wide defaults apply.
    pub fn with_worker(mut self, kind: WorkerKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Adds a fully specified worker. Its own grace and backoff are kept.
    pub fn with_spec(mut self, spec: WorkerSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Replaces the default `vcgencmd` diagnostics source.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Streams every metric sample as a CSV row (header first) to `out`.
    pub fn with_live_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.live = Some(Box::new(out));
        self
    }

    /// Resolves every worker and the diagnostics source, then wires the bus,
    /// subscriber workers and registry.
    ///
    /// Must be called inside a tokio runtime. Fails on the first unresolved
    /// dependency; no process is spawned in that case.
    pub fn build(self) -> Result<RunController, BuildError> {
        let mut registry = WorkerRegistry::new();
        for kind in &self.kinds {
            registry.add(ProcessSupervisor::from_kind(kind, &self.cfg)?);
        }
        for spec in self.specs {
            registry.add(ProcessSupervisor::new(spec));
        }

        let diagnostics: Arc<dyn Diagnostics> = match self.diagnostics {
            Some(d) => d,
            None => Arc::new(Vcgencmd::new().map_err(BuildError::Diagnostics)?),
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        Ok(RunController::new_internal(
            self.cfg,
            bus,
            subs,
            registry,
            MetricsSampler::new(diagnostics),
            self.live,
        ))
    }
}
