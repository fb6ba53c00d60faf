//! # Example: custom_diagnostics
//!
//! Runs a stress run on a machine without `vcgencmd` by plugging in a
//! [`Diagnostics`] source that reads the Linux thermal zone instead.
//!
//! A single `sh` busy loop is supervised as load. The run is stopped from
//! another task after a few samples, the way a signal would stop it.
//!
//! ## Flow
//! ```text
//! RunController::run()
//!   ├─► start "busy" (custom worker)
//!   ├─► every 1s: ThermalZone::temperature/clock_speed/throttled → CSV row on stdout
//!   ├─► StopHandle::stop() after 3.5s → ShutdownRequested
//!   ├─► SIGTERM "busy" → WorkerStopped
//!   └─► metric log written to a temporary file
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_diagnostics
//! ```

use std::{fs, sync::Arc, time::Duration};

use revpi_stress::{
    Diagnostics, DiagnosticsError, LogWriter, RunConfig, RunController, Subscribe, WorkerKind,
};

/// Reads `/sys/class/thermal/thermal_zone0` and `cpufreq` instead of the firmware.
struct ThermalZone;

impl ThermalZone {
    fn read(path: &str) -> Result<u64, DiagnosticsError> {
        let raw = fs::read_to_string(path).map_err(|e| DiagnosticsError::Spawn {
            command: path.to_string(),
            source: e,
        })?;
        raw.trim().parse().map_err(|_| DiagnosticsError::Malformed {
            command: path.to_string(),
            output: raw,
        })
    }
}

impl Diagnostics for ThermalZone {
    fn temperature(&self) -> Result<f64, DiagnosticsError> {
        // millidegrees
        Ok(Self::read("/sys/class/thermal/thermal_zone0/temp")? as f64 / 1000.0)
    }

    fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
        // kHz; not every VM exposes cpufreq
        Ok(Self::read("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq").unwrap_or(0) * 1000)
    }

    fn throttled(&self) -> Result<u32, DiagnosticsError> {
        Ok(0)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let dir = std::env::temp_dir();
    let cfg = RunConfig {
        sample_interval: Duration::from_secs(1),
        grace: Duration::from_secs(1),
        log_file: Some(dir.join("revpi-stress-demo.csv")),
        ..RunConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let ctl = RunController::builder(cfg)
        .with_subscribers(subs)
        .with_diagnostics(Arc::new(ThermalZone))
        .with_worker(WorkerKind::custom("busy", ["sh", "-c", "while :; do :; done"]))
        .with_live_output(std::io::stdout())
        .build()?;

    let stop = ctl.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        stop.stop();
    });

    let report = ctl.run().await?;
    println!(
        "{} samples, log at {}",
        report.samples.len(),
        dir.join("revpi-stress-demo.csv").display()
    );
    Ok(())
}
