//! # RunController: drives one stress run from start to persisted logs.
//!
//! The [`RunController`] owns the shared stop signal, the [`WorkerRegistry`], the
//! [`MetricsSampler`] and the event [`Bus`]. It starts every worker, samples
//! platform health on a fixed interval until stop, then drains the workers and
//! writes the CSV logs.
//!
//! ## States
//! ```text
//! Idle ──run()──► Running ──stop signal──► Draining ──logs written──► Stopped
//! ```
//!
//! ## High-level architecture
//! ```text
//! run():
//!   subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   signal_listener():     SIGINT/SIGTERM/SIGQUIT ─► request_stop("signal")
//!   registry.start_all(stop, bus)
//!
//! Running:
//!   loop select! {
//!     stop.cancelled()  → leave
//!     ticker.tick()     → spawn_blocking(sampler.sample()) ─► MetricLog + live CSV row
//!   }                     (sampling error → request_stop("sampler"), fatal)
//!
//! Draining:
//!   registry.join_all() ─► WorkerOutput per worker
//!   OutputHandling::Histogram outputs ─► parse_histogram() ─► HistogramLog
//!
//! Stopped:
//!   MetricLog    ─► cfg.log_file        (if configured)
//!   HistogramLog ─► cfg.histogram_file  (if configured and not empty)
//! ```
//!
//! ## Rules
//! - Every component observes the **same** stop signal; it is never reset
//! - Logs are persisted even when the run ends with a fatal error
//! - The first fatal error is returned; later ones are only logged

use std::{io::Write, path::Path, sync::Arc};

use tokio::{
    select,
    sync::{broadcast::error::RecvError, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    config::RunConfig,
    core::{registry::WorkerRegistry, shutdown::ShutdownSignals, supervisor::WorkerOutput},
    csvlog::save_csv_log,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    histogram::{self, HistogramRow},
    metrics::{MetricSample, MetricsSampler},
    subscribers::SubscriberSet,
    workers::OutputHandling,
};

/// Lifecycle state of a [`RunController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Assembled, nothing started.
    Idle,
    /// Workers are running and metrics are sampled.
    Running,
    /// Stop signal fired; workers are being terminated and drained.
    Draining,
    /// Logs were persisted; the run is over.
    Stopped,
}

/// Result of a completed run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// Metric samples in collection order.
    pub samples: Vec<MetricSample>,
    /// Histogram buckets parsed from histogram-producing workers.
    pub histogram: Vec<HistogramRow>,
    /// Final output of every worker that shut down cleanly.
    pub workers: Vec<WorkerOutput>,
}

/// Cloneable handle to request a stop and observe the run state from elsewhere.
#[derive(Clone)]
pub struct StopHandle {
    stop: CancellationToken,
    bus: Bus,
    state: watch::Receiver<RunState>,
}

impl StopHandle {
    /// Fires the shared stop signal. Idempotent.
    pub fn stop(&self) {
        request_stop(&self.stop, &self.bus, "stop");
    }

    /// Returns `true` once the stop signal fired, whatever its source.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Current state of the controller.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }
}

/// Coordinates workers, metric sampling, and log persistence for one run.
///
/// Built with [`RunController::builder`](crate::RunController::builder).
pub struct RunController {
    cfg: RunConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: WorkerRegistry,
    sampler: MetricsSampler,
    stop: CancellationToken,
    state: watch::Sender<RunState>,
    live: Option<csv::Writer<Box<dyn Write + Send>>>,
    samples: Vec<MetricSample>,
}

impl RunController {
    pub(crate) fn new_internal(
        cfg: RunConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        registry: WorkerRegistry,
        sampler: MetricsSampler,
        live: Option<Box<dyn Write + Send>>,
    ) -> Self {
        let live = live.map(|w| {
            csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Necessary)
                .from_writer(w)
        });
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            cfg,
            bus,
            subs,
            registry,
            sampler,
            stop: CancellationToken::new(),
            state,
            live,
            samples: Vec::new(),
        }
    }

    /// Returns a handle that can stop the run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: self.stop.clone(),
            bus: self.bus.clone(),
            state: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Names of the registered workers, in start order.
    pub fn worker_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Runs until the stop signal fires, then drains workers and persists logs.
    ///
    /// Returns the [`RunReport`], or the first fatal error once persistence was
    /// attempted.
    pub async fn run(mut self) -> Result<RunReport, RuntimeError> {
        let events_done = CancellationToken::new();
        let events = self.subscriber_listener(events_done.clone());
        // registered before the first child exists
        let signals = self.signal_listener();

        self.state.send_replace(RunState::Running);
        self.registry.start_all(&self.stop, &self.bus);

        let sampling = self.sample_until_stopped().await;
        if sampling.is_err() {
            request_stop(&self.stop, &self.bus, "sampler");
        }

        self.state.send_replace(RunState::Draining);
        let mut first_err = sampling.err();
        if let Ok(Err(e)) = signals.await {
            first_err.get_or_insert(e);
        }

        let mut workers = Vec::new();
        for (name, res) in self.registry.join_all().await {
            match res {
                Ok(out) => workers.push(out),
                Err(e) => {
                    error!(worker = %name, error = %e, label = e.as_label(), "worker shutdown failed");
                    first_err.get_or_insert(e);
                }
            }
        }
        let rows: Vec<HistogramRow> = workers
            .iter()
            .filter(|w| w.output == OutputHandling::Histogram)
            .flat_map(|w| histogram::parse_histogram(&w.stdout))
            .collect();

        if let Err(e) = self.persist(&rows) {
            first_err.get_or_insert(e);
        }
        self.state.send_replace(RunState::Stopped);

        events_done.cancel();
        let _ = events.await;
        if let Ok(set) = Arc::try_unwrap(self.subs) {
            set.shutdown().await;
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(RunReport {
                samples: self.samples,
                histogram: rows,
                workers,
            }),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set until
    /// `done` fires, then flushes what is still queued.
    fn subscriber_listener(&self, done: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = done.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
        })
    }

    /// Fires the stop signal on SIGINT/SIGTERM/SIGQUIT.
    ///
    /// The listeners are registered before this returns, so a signal that
    /// arrives while workers are being started is not lost. If they cannot be
    /// installed the run is stopped at once, since nothing else could end it
    /// from the outside.
    fn signal_listener(&self) -> JoinHandle<Result<(), RuntimeError>> {
        let stop = self.stop.clone();
        let bus = self.bus.clone();
        let installed = ShutdownSignals::install().map_err(|e| {
            request_stop(&stop, &bus, "signal_handler_failed");
            RuntimeError::Signal(e)
        });
        tokio::spawn(async move {
            let mut signals = match installed {
                Ok(signals) => signals,
                Err(e) => return Err(e),
            };
            select! {
                _ = signals.recv() => request_stop(&stop, &bus, "signal"),
                _ = stop.cancelled() => {}
            }
            Ok::<(), RuntimeError>(())
        })
    }

    /// Samples on every tick until the stop signal fires.
    ///
    /// The first tick is one interval after start. A sampling failure is fatal.
    async fn sample_until_stopped(&mut self) -> Result<(), RuntimeError> {
        let period = self.cfg.sample_interval_clamped();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.write_live(MetricSample::HEADERS);
        loop {
            select! {
                biased;
                _ = self.stop.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let sampler = self.sampler.clone();
            let sample = tokio::task::spawn_blocking(move || sampler.sample())
                .await
                .map_err(|_| RuntimeError::SamplerPanicked)??;
            self.write_live(sample.record());
            self.samples.push(sample);
        }
    }

    /// Writes one CSV row to the live output; disables it after the first failure.
    fn write_live<I, T>(&mut self, record: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        let res = live
            .write_record(record)
            .and_then(|()| live.flush().map_err(csv::Error::from));
        if let Err(e) = res {
            warn!(error = %e, "live metric output failed; disabling it");
            self.live = None;
        }
    }

    /// Writes the metric and histogram logs. Both are attempted; the first
    /// failure is returned.
    fn persist(&self, rows: &[HistogramRow]) -> Result<(), RuntimeError> {
        let mut first_err = None;

        if let Some(path) = &self.cfg.log_file {
            let res = save_csv_log(
                path,
                Some(&MetricSample::HEADERS[..]),
                self.samples.iter().map(MetricSample::record),
            );
            self.report_persist(path, res, &mut first_err);
        }

        if let Some(path) = self.cfg.histogram_file.as_ref().filter(|_| !rows.is_empty()) {
            let header = histogram::headers(histogram::core_columns(rows));
            let res = save_csv_log(path, Some(&header[..]), rows.iter().map(HistogramRow::record));
            self.report_persist(path, res, &mut first_err);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn report_persist(
        &self,
        path: &Path,
        res: Result<(), csv::Error>,
        first_err: &mut Option<RuntimeError>,
    ) {
        match res {
            Ok(()) => self.bus.publish(
                Event::new(EventKind::LogPersisted).with_reason(path.display().to_string()),
            ),
            Err(source) => {
                let e = RuntimeError::Persist {
                    path: path.to_path_buf(),
                    source,
                };
                error!(error = %e, label = e.as_label(), "log persistence failed");
                first_err.get_or_insert(e);
            }
        }
    }
}

fn request_stop(stop: &CancellationToken, bus: &Bus, reason: &'static str) {
    if !stop.is_cancelled() {
        bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        csvlog::read_csv_log,
        error::DiagnosticsError,
        metrics::Diagnostics,
        workers::{Command, WorkerSpec},
    };
    use std::{
        io,
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    /// Temperature rises by one degree per reading.
    #[derive(Default)]
    struct Warming(AtomicU32);

    impl Diagnostics for Warming {
        fn temperature(&self) -> Result<f64, DiagnosticsError> {
            Ok(40.0 + f64::from(self.0.fetch_add(1, Ordering::Relaxed)))
        }
        fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
            Ok(600_000_000)
        }
        fn throttled(&self) -> Result<u32, DiagnosticsError> {
            Ok(0)
        }
    }

    struct Unavailable;

    impl Diagnostics for Unavailable {
        fn temperature(&self) -> Result<f64, DiagnosticsError> {
            Err(DiagnosticsError::Malformed {
                command: "measure_temp".into(),
                output: String::new(),
            })
        }
        fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
            Ok(0)
        }
        fn throttled(&self) -> Result<u32, DiagnosticsError> {
            Ok(0)
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sleeper() -> WorkerSpec {
        WorkerSpec::new("sleeper", Command::new("sleep", ["30"]).unwrap())
    }

    #[tokio::test]
    async fn test_samples_until_stop_and_streams_csv() {
        let live = SharedBuf::default();
        let ctl = RunController::builder(RunConfig::default())
            .with_diagnostics(Arc::new(Warming::default()))
            .with_spec(sleeper())
            .with_live_output(live.clone())
            .build()
            .unwrap();
        let stop = ctl.stop_handle();
        assert_eq!(stop.state(), RunState::Idle);

        let run = tokio::spawn(ctl.run());
        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(stop.state(), RunState::Running);
        stop.stop();

        let report = run.await.unwrap().unwrap();
        assert_eq!(stop.state(), RunState::Stopped);

        let n = report.samples.len();
        assert!((2..=4).contains(&n), "got {n} samples");
        assert!(
            report
                .samples
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
        assert_eq!(report.samples[0].temperature, 40.0);
        assert_eq!(report.workers.len(), 1);

        let text = String::from_utf8(live.0.lock().unwrap().clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("time,cpu_temperature,cpu_clock_speed,cpu_throttled")
        );
        assert_eq!(lines.count(), n);
    }

    #[tokio::test]
    async fn test_logs_are_persisted_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("metrics.csv");
        let histogram_file = dir.path().join("histogram.csv");

        let cfg = RunConfig {
            log_file: Some(log_file.clone()),
            histogram_file: Some(histogram_file.clone()),
            ..RunConfig::default()
        };
        let script = r"printf '# Histogram\n000000 000001\t000002\n000001 000003\t000004\n'; exec sleep 30";
        let latency = WorkerSpec::new("latency", Command::new("sh", ["-c", script]).unwrap())
            .with_output(OutputHandling::Histogram);

        let ctl = RunController::builder(cfg)
            .with_diagnostics(Arc::new(Warming::default()))
            .with_spec(latency)
            .build()
            .unwrap();
        let stop = ctl.stop_handle();
        let run = tokio::spawn(ctl.run());
        time::sleep(Duration::from_millis(1500)).await;
        stop.stop();
        let report = run.await.unwrap().unwrap();

        assert_eq!(report.histogram.len(), 2);
        let hist = read_csv_log(&histogram_file, true).unwrap();
        assert_eq!(
            hist.header.unwrap(),
            vec!["latency", "count_core1", "count_core2"]
        );
        assert_eq!(hist.rows[1], vec!["000001", "3", "4"]);

        let metrics = read_csv_log(&log_file, true).unwrap();
        assert_eq!(metrics.header.unwrap(), MetricSample::HEADERS);
        assert_eq!(metrics.rows.len(), report.samples.len());
    }

    #[tokio::test]
    async fn test_sampler_failure_is_fatal_and_stops_workers() {
        let ctl = RunController::builder(RunConfig::default())
            .with_diagnostics(Arc::new(Unavailable))
            .with_spec(sleeper())
            .build()
            .unwrap();
        let stop = ctl.stop_handle();

        let res = tokio::time::timeout(Duration::from_secs(10), ctl.run())
            .await
            .expect("run must end on its own");
        let err = res.unwrap_err();
        assert_eq!(err.as_label(), "runtime_diagnostics");
        assert!(stop.is_stopped());
        assert_eq!(stop.state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let ctl = RunController::builder(RunConfig::default())
            .with_diagnostics(Arc::new(Warming::default()))
            .build()
            .unwrap();
        let stop = ctl.stop_handle();
        stop.stop();

        let report = ctl.run().await.unwrap();
        assert!(report.samples.is_empty());
        assert!(report.histogram.is_empty());
    }
}
