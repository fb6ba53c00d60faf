//! # ProcessSupervisor: keeps one external command alive until stop.
//!
//! Supervises one [`WorkerSpec`] with policies:
//! - relaunches per [`RestartPolicy`](crate::RestartPolicy),
//! - delays per [`BackoffPolicy`](crate::BackoffPolicy),
//! - graceful termination (SIGTERM, then SIGKILL after the spec's grace),
//! - cooperative stop via the shared [`CancellationToken`].
//!
//! ## Event flow
//! For each launch, the supervisor publishes:
//! ```text
//! WorkerStarting → [child runs] → WorkerExited (exited on its own)
//!                                   ├─► RestartScheduled → [backoff sleep] → next launch
//!                                   └─► RestartExhausted → idle until stop
//!
//! WorkerSpawnFailed → (treated like an exit with unknown status)
//!
//! On stop:
//!   TerminateSent → [grace] → KillEscalated (only if still alive) → WorkerStopped
//! ```
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► runner::launch() ─► publish WorkerStarting
//!   ├─► select! {
//!   │     stop.cancelled() → break (child kept for shutdown)
//!   │     child.wait()     → publish WorkerExited, kill the rest of its group
//!   │   }
//!   ├─► apply RestartPolicy
//!   │     ├─► relaunch  → publish RestartScheduled, sleep(backoff) unless stopped
//!   │     └─► forbidden → publish RestartExhausted, wait for stop
//! }
//! shutdown:
//!   runner::terminate(child) → runner::drain(child) → publish WorkerStopped
//! ```
//!
//! ## Rules
//! - At most **one** child (and its process group) exists per supervisor at any time
//! - Launch counter **increments on each launch** and never resets
//! - Backoff counter **resets after a clean exit**
//! - Output is read only **after** the child is confirmed exited
//! - An unexpected exit is never fatal; only a failed kill is

use std::{process::ExitStatus, sync::Arc};

use tokio::{process::Child, select, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RunConfig,
    core::runner,
    error::{RuntimeError, WorkerError},
    events::{Bus, Event, EventKind},
    workers::{OutputHandling, WorkerKind, WorkerSpec},
};

/// Captured output of a stopped worker.
///
/// Holds the stdout/stderr of the **last** child only; earlier children's
/// output is discarded when they are replaced.
#[derive(Clone, Debug)]
pub struct WorkerOutput {
    /// Worker name.
    pub name: String,
    /// Lines read from the last child's stdout.
    pub stdout: Vec<String>,
    /// Lines read from the last child's stderr.
    pub stderr: Vec<String>,
    /// Final exit status of the last child, if it ran and was reaped.
    pub status: Option<ExitStatus>,
    /// Number of launch attempts.
    pub attempts: u32,
    /// How the controller treats `stdout` after the run.
    pub output: OutputHandling,
}

impl WorkerOutput {
    fn empty(spec: &WorkerSpec) -> Self {
        Self {
            name: spec.name().to_string(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            status: None,
            attempts: 0,
            output: spec.output(),
        }
    }
}

/// Supervises one external command: launches it, relaunches it when it exits,
/// and terminates it when the shared stop signal fires.
///
/// ### Lifecycle
/// ```text
/// new/from_kind ─► start(stop, bus) ─► [running] ─► stop() ─► join() → WorkerOutput
/// ```
pub struct ProcessSupervisor {
    spec: Arc<WorkerSpec>,
    stop: Option<CancellationToken>,
    handle: Option<JoinHandle<Result<WorkerOutput, RuntimeError>>>,
}

impl ProcessSupervisor {
    /// Creates a supervisor for an already resolved spec.
    pub fn new(spec: WorkerSpec) -> Self {
        Self {
            spec: Arc::new(spec),
            stop: None,
            handle: None,
        }
    }

    /// Resolves `kind` and applies run-wide defaults from `cfg`.
    ///
    /// Fails with [`WorkerError::ExecutableNotFound`] if the kind's program is
    /// not on `PATH`; nothing is spawned in that case.
    pub fn from_kind(kind: &WorkerKind, cfg: &RunConfig) -> Result<Self, WorkerError> {
        Ok(Self::new(WorkerSpec::from_kind(kind)?.with_defaults(cfg)))
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Returns `true` once [`start`](Self::start) was called.
    pub fn is_started(&self) -> bool {
        self.stop.is_some()
    }

    /// Begins supervision on a background task.
    ///
    /// `stop` is shared with every other supervisor of the run; the supervisor
    /// never cancels it. Calling `start` twice is a no-op.
    pub fn start(&mut self, stop: CancellationToken, bus: Bus) {
        if self.handle.is_some() {
            return;
        }
        let spec = Arc::clone(&self.spec);
        let token = stop.clone();
        self.handle = Some(tokio::spawn(supervise(spec, token, bus)));
        self.stop = Some(stop);
    }

    /// Requests a stop by cancelling the bound stop signal.
    ///
    /// The signal is shared, so this stops the whole run. Idempotent; no-op
    /// before [`start`](Self::start).
    pub fn stop(&self) {
        if let Some(stop) = &self.stop {
            stop.cancel();
        }
    }

    /// Waits for the supervision task to finish its shutdown sequence.
    ///
    /// Returns immediately with empty output if the supervisor was never
    /// started or was already joined.
    pub async fn join(&mut self) -> Result<WorkerOutput, RuntimeError> {
        let Some(handle) = self.handle.take() else {
            return Ok(WorkerOutput::empty(&self.spec));
        };
        handle.await.map_err(|_| RuntimeError::SupervisorLost {
            worker: self.spec.name().to_string(),
        })?
    }
}

/// The supervision loop. Runs until `stop` is cancelled, then shuts the
/// current child down and returns its output.
async fn supervise(
    spec: Arc<WorkerSpec>,
    stop: CancellationToken,
    bus: Bus,
) -> Result<WorkerOutput, RuntimeError> {
    let name = spec.name();
    let mut attempt: u32 = 0;
    let mut restarts: u32 = 0;
    // child plus its process group id
    let mut current: Option<(Child, Option<u32>)> = None;

    while !stop.is_cancelled() {
        // the previous child (if any) has exited; its output is dropped
        current = None;
        attempt = attempt.saturating_add(1);

        let exited = match runner::launch(spec.command()) {
            Ok(mut child) => {
                let pid = child.id();
                bus.publish(
                    Event::new(EventKind::WorkerStarting)
                        .with_worker(name)
                        .with_attempt(attempt)
                        .with_pid(pid),
                );

                let waited = select! {
                    biased;
                    _ = stop.cancelled() => None,
                    res = child.wait() => Some(res),
                };
                let Some(res) = waited else {
                    current = Some((child, pid));
                    break;
                };
                runner::kill_group(pid);

                let status = res.ok();
                bus.publish(
                    Event::new(EventKind::WorkerExited)
                        .with_worker(name)
                        .with_attempt(attempt)
                        .with_pid(pid)
                        .with_reason(describe(status)),
                );
                current = Some((child, pid));
                status
            }
            Err(e) => {
                bus.publish(
                    Event::new(EventKind::WorkerSpawnFailed)
                        .with_worker(name)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                None
            }
        };

        if !spec.restart().should_restart(exited) {
            bus.publish(
                Event::new(EventKind::RestartExhausted)
                    .with_worker(name)
                    .with_attempt(attempt),
            );
            stop.cancelled().await;
            break;
        }

        if exited.is_some_and(|s| s.success()) {
            restarts = 0;
        }
        let delay = spec.backoff().next(restarts);
        restarts = restarts.saturating_add(1);

        bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_worker(name)
                .with_attempt(attempt)
                .with_delay(delay),
        );
        select! {
            _ = time::sleep(delay) => {}
            _ = stop.cancelled() => break,
        }
    }

    let mut out = WorkerOutput::empty(&spec);
    out.attempts = attempt;
    if let Some((mut child, pgid)) = current {
        out.status = runner::terminate(&mut child, pgid, name, spec.grace(), &bus).await?;
        let (stdout, stderr) = runner::drain(&mut child, spec.grace()).await;
        out.stdout = stdout;
        out.stderr = stderr;
    }

    bus.publish(
        Event::new(EventKind::WorkerStopped)
            .with_worker(name)
            .with_attempt(attempt)
            .with_reason(describe(out.status)),
    );
    Ok(out)
}

fn describe(status: Option<ExitStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{policies::BackoffPolicy, workers::Command};
    use nix::{errno::Errno, sys::signal::kill, unistd::Pid};
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::Receiver;

    fn sh(name: &str, script: &str) -> WorkerSpec {
        WorkerSpec::new(name, Command::new("sh", ["-c", script]).unwrap())
    }

    fn is_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None) != Err(Errno::ESRCH)
    }

    fn read_pid(path: &std::path::Path) -> i32 {
        std::fs::read_to_string(path).unwrap().trim().parse().unwrap()
    }

    /// Polls `/proc` until `pid` is gone or a zombie.
    async fn exits_within(pid: i32, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let running = match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => !stat
                    .rsplit_once(") ")
                    .is_some_and(|(_, rest)| rest.starts_with('Z')),
                Err(_) => false,
            };
            if !running {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn drain_events(rx: &mut Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn started_pids(events: &[Event]) -> Vec<u32> {
        events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerStarting)
            .filter_map(|e| e.pid)
            .collect()
    }

    #[tokio::test]
    async fn test_stop_terminates_long_running_child() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();

        let spec = WorkerSpec::new("sleeper", Command::new("sleep", ["30"]).unwrap());
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), bus.clone());
        time::sleep(Duration::from_millis(300)).await;

        let started = Instant::now();
        sup.stop();
        let out = sup.join().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1500));

        let events = drain_events(&mut rx);
        let pids = started_pids(&events);
        assert_eq!(pids.len(), 1);
        assert!(!is_alive(pids[0]));
        assert_eq!(out.attempts, 1);
        assert!(events.iter().any(|e| e.kind == EventKind::TerminateSent));
        assert!(!events.iter().any(|e| e.kind == EventKind::KillEscalated));
        assert_eq!(events.last().unwrap().kind, EventKind::WorkerStopped);
    }

    #[tokio::test]
    async fn test_terminate_is_sent_promptly_after_stop() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();

        let spec = WorkerSpec::new("sleeper", Command::new("sleep", ["30"]).unwrap());
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), bus.clone());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::WorkerStarting);

        let cancelled = Instant::now();
        stop.cancel();
        let sent = time::timeout(Duration::from_secs(2), async {
            loop {
                if rx.recv().await.unwrap().kind == EventKind::TerminateSent {
                    return Instant::now();
                }
            }
        })
        .await
        .unwrap();
        assert!(sent - cancelled < Duration::from_millis(500));
        sup.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_kills_group_members_ignoring_sigterm() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("member.pid");
        let stop = CancellationToken::new();

        let script = format!(
            r#"sh -c 'trap "" TERM; echo $$ > {}; while :; do sleep 1; done' & wait"#,
            pidfile.display()
        );
        let spec = sh("group", &script).with_grace(Duration::from_secs(1));
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), Bus::new(64));
        time::sleep(Duration::from_millis(300)).await;
        let member = read_pid(&pidfile);

        let started = Instant::now();
        stop.cancel();
        sup.join().await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(900), "join waited on the pipe");
        assert!(exits_within(member, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_group_of_exited_child_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("member.pid");
        let stop = CancellationToken::new();

        // the leader exits on its own and leaves a background child behind
        let script = format!(
            "sh -c 'echo $$ > {}; while :; do sleep 1; done' & sleep 0.3",
            pidfile.display()
        );
        let spec = sh("leaky", &script).with_restart(crate::RestartPolicy::Never);
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), Bus::new(64));
        time::sleep(Duration::from_millis(600)).await;

        let member = read_pid(&pidfile);
        assert!(exits_within(member, Duration::from_secs(1)).await);

        stop.cancel();
        sup.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_exiting_child_is_relaunched_until_stop() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();

        let spec = sh("flaky", "exit 1")
            .with_backoff(BackoffPolicy::constant(Duration::from_millis(50)));
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), bus.clone());
        time::sleep(Duration::from_millis(600)).await;

        stop.cancel();
        let out = sup.join().await.unwrap();
        assert!(out.attempts >= 3, "got {} attempts", out.attempts);

        let events = drain_events(&mut rx);
        let exits = events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerExited)
            .count();
        assert!(exits >= 2);
        assert!(events.iter().any(|e| e.kind == EventKind::RestartScheduled));
    }

    #[tokio::test]
    async fn test_stop_interrupts_backoff_sleep() {
        let stop = CancellationToken::new();
        let spec = sh("slow-restart", "exit 0")
            .with_backoff(BackoffPolicy::constant(Duration::from_secs(30)));
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), Bus::new(16));
        time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        stop.cancel();
        let out = sup.join().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(out.attempts, 1);
        assert!(out.status.unwrap().success());
    }

    #[tokio::test]
    async fn test_ignoring_sigterm_escalates_to_kill() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();

        let spec = sh("stubborn", "trap '' TERM; while :; do sleep 1; done")
            .with_grace(Duration::from_millis(400));
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), bus.clone());
        time::sleep(Duration::from_millis(300)).await;

        stop.cancel();
        sup.join().await.unwrap();

        let events = drain_events(&mut rx);
        assert!(events.iter().any(|e| e.kind == EventKind::KillEscalated));
        for pid in started_pids(&events) {
            assert!(!is_alive(pid));
        }
    }

    #[tokio::test]
    async fn test_output_of_last_child_is_captured() {
        let stop = CancellationToken::new();
        let spec = sh("chatty", "echo line1; echo line2; echo oops >&2; exec sleep 30");
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), Bus::new(16));
        time::sleep(Duration::from_millis(300)).await;

        stop.cancel();
        let out = sup.join().await.unwrap();
        assert_eq!(out.name, "chatty");
        assert_eq!(out.stdout, vec!["line1", "line2"]);
        assert_eq!(out.stderr, vec!["oops"]);
    }

    #[tokio::test]
    async fn test_never_policy_idles_until_stop() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();

        let spec = sh("once", "echo done").with_restart(crate::RestartPolicy::Never);
        let mut sup = ProcessSupervisor::new(spec);
        sup.start(stop.clone(), bus.clone());
        time::sleep(Duration::from_millis(300)).await;

        stop.cancel();
        let out = sup.join().await.unwrap();
        assert_eq!(out.attempts, 1);
        assert_eq!(out.stdout, vec!["done"]);

        let events = drain_events(&mut rx);
        assert!(events.iter().any(|e| e.kind == EventKind::RestartExhausted));
        assert!(!events.iter().any(|e| e.kind == EventKind::TerminateSent));
    }

    #[tokio::test]
    async fn test_join_without_start() {
        let spec = WorkerSpec::new("idle", Command::new("sleep", ["1"]).unwrap());
        let mut sup = ProcessSupervisor::new(spec);
        assert!(!sup.is_started());

        let out = sup.join().await.unwrap();
        assert_eq!(out.attempts, 0);
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn test_from_kind_reports_missing_executable() {
        let kind = WorkerKind::custom("ghost", ["revpi-no-such-tool", "--run"]);
        let err = ProcessSupervisor::from_kind(&kind, &RunConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.executable(), Some("revpi-no-such-tool"));
    }
}
