//! # Process-level primitives used by the supervision loop.
//!
//! - [`launch`] spawns one child in its own process group
//! - [`terminate`] runs the SIGTERM → wait(grace) → SIGKILL sequence
//! - [`kill_group`] SIGKILLs what is left of a group once its leader is reaped
//! - [`drain`] reads captured stdout/stderr to EOF
//!
//! ## Termination flow
//! ```text
//! try_wait() ── exited ──────────────────────────────► status
//!     │
//!     └─ alive ─► killpg(SIGTERM) ─► publish TerminateSent
//!                      │
//!                      ├─ exits within grace ──────────► status
//!                      └─ grace elapsed ─► publish KillEscalated
//!                                         killpg(SIGKILL) + start_kill()
//!                                              ├─ reaped within grace ─► status
//!                                              └─ otherwise ───────────► Err(KillFailed)
//!
//! in every case: killpg(SIGKILL) for members that outlived the leader
//! ```
//!
//! ## Rules
//! - Children lead their own process group so that helpers forked by the tool
//!   (stress-ng spawns one process per stressor) receive the same signals.
//! - The group id equals the leader's pid. It is taken at launch because
//!   `Child::id` is gone once the leader has been reaped.
//! - [`drain`] must only be called once the child is confirmed exited; it is
//!   bounded so that a surviving grandchild holding the pipe open cannot hang
//!   the shutdown.

use std::{io, process::ExitStatus, time::Duration};

use nix::{
    errno::Errno,
    sys::signal::{Signal, killpg},
    unistd::Pid,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Child,
    time,
};

use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    workers::Command,
};

/// Spawns `cmd` with piped output as the leader of a new process group.
pub(crate) fn launch(cmd: &Command) -> io::Result<Child> {
    let mut proc = cmd.to_process();
    proc.process_group(0);
    proc.spawn()
}

/// Stops `child` gracefully, escalating to SIGKILL after `grace`, then kills
/// whatever is left of its process group `pgid`.
///
/// Returns the exit status, or `None` if it could not be determined.
pub(crate) async fn terminate(
    child: &mut Child,
    pgid: Option<u32>,
    worker: &str,
    grace: Duration,
    bus: &Bus,
) -> Result<Option<ExitStatus>, RuntimeError> {
    let status = stop_leader(child, pgid, worker, grace, bus).await;
    kill_group(pgid);
    status
}

/// SIGKILLs every remaining member of the process group `pgid`.
///
/// Members that ignore SIGTERM outlive the leader and keep its pipes open.
pub(crate) fn kill_group(pgid: Option<u32>) {
    if let Some(pgid) = pgid {
        // ESRCH: the group is already empty
        let _ = signal_group(pgid, Signal::SIGKILL);
    }
}

async fn stop_leader(
    child: &mut Child,
    pid: Option<u32>,
    worker: &str,
    grace: Duration,
    bus: &Bus,
) -> Result<Option<ExitStatus>, RuntimeError> {
    if let Ok(Some(status)) = child.try_wait() {
        return Ok(Some(status));
    }

    if let Some(pid) = pid {
        // ESRCH: exited between try_wait and here; wait() below reaps it.
        let _ = signal_group(pid, Signal::SIGTERM);
    }
    bus.publish(
        Event::new(EventKind::TerminateSent)
            .with_worker(worker)
            .with_pid(pid)
            .with_timeout(grace),
    );

    if let Ok(res) = time::timeout(grace, child.wait()).await {
        return Ok(res.ok());
    }

    bus.publish(
        Event::new(EventKind::KillEscalated)
            .with_worker(worker)
            .with_pid(pid)
            .with_timeout(grace),
    );
    if let Some(pid) = pid {
        let _ = signal_group(pid, Signal::SIGKILL);
    }
    child.start_kill().map_err(|e| kill_failed(worker, e.to_string()))?;

    match time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Ok(Some(status)),
        Ok(Err(e)) => Err(kill_failed(worker, e.to_string())),
        Err(_) => Err(kill_failed(
            worker,
            format!("still running {grace:?} after SIGKILL"),
        )),
    }
}

/// Reads the child's stdout and stderr to EOF, split into lines.
///
/// Each pipe read is bounded by `limit`; whatever arrived before the limit is kept.
pub(crate) async fn drain(child: &mut Child, limit: Duration) -> (Vec<String>, Vec<String>) {
    let stdout = match child.stdout.take() {
        Some(pipe) => read_lines(pipe, limit).await,
        None => Vec::new(),
    };
    let stderr = match child.stderr.take() {
        Some(pipe) => read_lines(pipe, limit).await,
        None => Vec::new(),
    };
    (stdout, stderr)
}

async fn read_lines<R: AsyncRead + Unpin>(mut pipe: R, limit: Duration) -> Vec<String> {
    let mut buf = Vec::new();
    let _ = time::timeout(limit, pipe.read_to_end(&mut buf)).await;
    String::from_utf8_lossy(&buf)
        .lines()
        .map(str::to_string)
        .collect()
}

fn signal_group(pid: u32, signal: Signal) -> Result<(), Errno> {
    let raw = i32::try_from(pid).map_err(|_| Errno::ESRCH)?;
    killpg(Pid::from_raw(raw), signal)
}

fn kill_failed(worker: &str, reason: String) -> RuntimeError {
    RuntimeError::KillFailed {
        worker: worker.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        Command::new("sh", ["-c", script]).unwrap()
    }

    #[tokio::test]
    async fn test_terminate_cooperative_child() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let mut child = launch(&Command::new("sleep", ["30"]).unwrap()).unwrap();
        let pgid = child.id();

        let started = Instant::now();
        let status = terminate(&mut child, pgid, "sleeper", Duration::from_secs(5), &bus)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!status.unwrap().success());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TerminateSent);
        assert!(rx.try_recv().is_err(), "no kill escalation expected");
    }

    #[tokio::test]
    async fn test_terminate_escalates_to_kill() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let mut child = launch(&sh("trap '' TERM; echo ready; while :; do sleep 1; done")).unwrap();
        let pid = child.id().unwrap();
        // let the shell install its trap
        time::sleep(Duration::from_millis(300)).await;

        terminate(&mut child, Some(pid), "stubborn", Duration::from_millis(500), &bus)
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TerminateSent);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::KillEscalated);
        assert_eq!(
            nix::sys::signal::kill(Pid::from_raw(pid as i32), None),
            Err(Errno::ESRCH)
        );

        let (stdout, _) = drain(&mut child, Duration::from_secs(1)).await;
        assert_eq!(stdout, vec!["ready"]);
    }

    #[tokio::test]
    async fn test_already_exited_child_is_not_signalled() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let mut child = launch(&sh("exit 3")).unwrap();
        let pgid = child.id();
        child.wait().await.unwrap();

        let status = terminate(&mut child, pgid, "done", Duration::from_secs(1), &bus)
            .await
            .unwrap();
        assert_eq!(status.unwrap().code(), Some(3));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_members_ignoring_sigterm_are_killed() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        // the leader dies on SIGTERM, its background child does not
        let mut child = launch(&sh(
            r#"sh -c 'trap "" TERM; echo $$; while :; do sleep 1; done' & wait"#,
        ))
        .unwrap();
        let pgid = child.id();
        time::sleep(Duration::from_millis(300)).await;

        let grace = Duration::from_secs(1);
        let started = Instant::now();
        terminate(&mut child, pgid, "group", grace, &bus).await.unwrap();
        let (stdout, _) = drain(&mut child, grace).await;

        assert!(started.elapsed() < Duration::from_millis(900), "drain waited on the pipe");
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TerminateSent);
        assert!(rx.try_recv().is_err(), "leader exited within grace");

        let member: i32 = stdout[0].parse().unwrap();
        assert!(exits_within(member, Duration::from_secs(1)).await);
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

    #[tokio::test]
    async fn test_drain_after_exit_keeps_both_streams() {
        let mut child = launch(&sh("echo out1; echo out2; echo err1 >&2")).unwrap();
        child.wait().await.unwrap();

        let (stdout, stderr) = drain(&mut child, Duration::from_secs(1)).await;
        assert_eq!(stdout, vec!["out1", "out2"]);
        assert_eq!(stderr, vec!["err1"]);
    }
}
