//! # Example: run_once
//!
//! Supervises a one-shot command with [`RestartPolicy::Never`]: it runs once,
//! the supervisor idles until stop, and the captured output is read on `join`.
//!
//! ## Flow
//! ```text
//! ProcessSupervisor::start()
//!   ├─► WorkerStarting (attempt=1)
//!   ├─► child prints and exits → WorkerExited
//!   ├─► RestartExhausted (Never) → idle
//!   ├─► stop()
//!   └─► WorkerStopped → join() returns stdout/stderr of the child
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example run_once
//! ```

use std::time::Duration;

use revpi_stress::{Bus, Command, ProcessSupervisor, RestartPolicy, WorkerSpec};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = Bus::new(64);
    let mut events = bus.subscribe();
    let stop = CancellationToken::new();

    let cmd = Command::new("sh", ["-c", "uname -a; echo 'no cyclictest here' >&2"])?;
    let spec = WorkerSpec::new("uname", cmd).with_restart(RestartPolicy::Never);

    let mut sup = ProcessSupervisor::new(spec);
    sup.start(stop.clone(), bus.clone());
    tokio::time::sleep(Duration::from_millis(500)).await;

    sup.stop();
    let out = sup.join().await?;

    while let Ok(ev) = events.try_recv() {
        println!("[event] {:?} attempt={:?} reason={:?}", ev.kind, ev.attempt, ev.reason);
    }
    println!("attempts: {}", out.attempts);
    println!("stdout: {:?}", out.stdout);
    println!("stderr: {:?}", out.stderr);
    Ok(())
}
