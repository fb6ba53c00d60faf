//! # Run configuration.
//!
//! [`RunConfig`] centralizes the settings of one stress run:
//! 1. **Controller**: sampling interval, event bus capacity, log destinations
//! 2. **Worker defaults**: termination grace period and restart backoff,
//!    applied through [`WorkerSpec::with_defaults`](crate::WorkerSpec::with_defaults)
//!
//! ## Sentinel values and clamping
//! - `sample_interval` is clamped to `1s..=60s`
//! - `bus_capacity = 0` is treated as 1
//! - `log_file = None` → the metric log is only streamed, not persisted
//! - `histogram_file = None` → histogram rows are parsed but not persisted

use std::{path::PathBuf, time::Duration};

use crate::policies::BackoffPolicy;

/// Global configuration of a run.
///
/// All fields are public; prefer the accessors over raw field reads so that
/// clamping is applied consistently.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Time between two metric samples (1-60s).
    pub sample_interval: Duration,

    /// Time a child gets between SIGTERM and SIGKILL.
    pub grace: Duration,

    /// Delay policy between a child exiting and its relaunch.
    pub backoff: BackoffPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Destination of the metric CSV log.
    pub log_file: Option<PathBuf>,

    /// Destination of the latency histogram CSV log.
    pub histogram_file: Option<PathBuf>,
}

impl RunConfig {
    /// Shortest accepted sampling interval.
    pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
    /// Longest accepted sampling interval.
    pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

    /// Returns the sampling interval clamped to `1s..=60s`.
    #[inline]
    pub fn sample_interval_clamped(&self) -> Duration {
        self.sample_interval
            .clamp(Self::MIN_SAMPLE_INTERVAL, Self::MAX_SAMPLE_INTERVAL)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RunConfig {
    /// - `sample_interval = 1s`
    /// - `grace = 5s`
    /// - `backoff = BackoffPolicy::default()` (constant 500ms)
    /// - `bus_capacity = 1024`
    /// - no log destinations
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            grace: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
            log_file: None,
            histogram_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_interval_is_clamped() {
        let mut cfg = RunConfig::default();
        assert_eq!(cfg.sample_interval_clamped(), Duration::from_secs(1));

        cfg.sample_interval = Duration::ZERO;
        assert_eq!(cfg.sample_interval_clamped(), Duration::from_secs(1));

        cfg.sample_interval = Duration::from_secs(600);
        assert_eq!(cfg.sample_interval_clamped(), Duration::from_secs(60));
    }

    #[test]
    fn test_bus_capacity_minimum() {
        let cfg = RunConfig {
            bus_capacity: 0,
            ..RunConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
