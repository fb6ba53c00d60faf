use std::sync::Arc;

use crate::{error::DiagnosticsError, metrics::MetricSample};

/// Read access to platform health diagnostics.
///
/// Calls are synchronous and may block on an external command; callers inside
/// the async runtime go through `spawn_blocking`.
pub trait Diagnostics: Send + Sync + 'static {
    /// Current SoC temperature in degrees Celsius.
    fn temperature(&self) -> Result<f64, DiagnosticsError>;

    /// Current ARM clock speed in Hz.
    fn clock_speed(&self) -> Result<u64, DiagnosticsError>;

    /// Firmware throttle bitmask.
    fn throttled(&self) -> Result<u32, DiagnosticsError>;
}

/// Produces [`MetricSample`]s on demand. Holds no state between calls.
#[derive(Clone)]
pub struct MetricsSampler {
    diagnostics: Arc<dyn Diagnostics>,
}

impl MetricsSampler {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { diagnostics }
    }

    /// Reads all three diagnostics and stamps the result with the current time.
    pub fn sample(&self) -> Result<MetricSample, DiagnosticsError> {
        let temperature = self.diagnostics.temperature()?;
        let clock_speed = self.diagnostics.clock_speed()?;
        let throttled = self.diagnostics.throttled()?;
        Ok(MetricSample::now(temperature, clock_speed, throttled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Diagnostics for Fixed {
        fn temperature(&self) -> Result<f64, DiagnosticsError> {
            Ok(47.2)
        }
        fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
            Ok(1_500_000_000)
        }
        fn throttled(&self) -> Result<u32, DiagnosticsError> {
            Ok(0x50005)
        }
    }

    struct Broken;

    impl Diagnostics for Broken {
        fn temperature(&self) -> Result<f64, DiagnosticsError> {
            Err(DiagnosticsError::Malformed {
                command: "measure_temp".into(),
                output: "garbage".into(),
            })
        }
        fn clock_speed(&self) -> Result<u64, DiagnosticsError> {
            Ok(0)
        }
        fn throttled(&self) -> Result<u32, DiagnosticsError> {
            Ok(0)
        }
    }

    #[test]
    fn test_sample_collects_all_fields() {
        let sampler = MetricsSampler::new(Arc::new(Fixed));
        let s = sampler.sample().unwrap();
        assert_eq!(s.temperature, 47.2);
        assert_eq!(s.clock_speed, 1_500_000_000);
        assert_eq!(s.throttled, 0x50005);
        assert!(s.timestamp > 0);
    }

    #[test]
    fn test_sample_propagates_failure() {
        let sampler = MetricsSampler::new(Arc::new(Broken));
        let err = sampler.sample().unwrap_err();
        assert_eq!(err.as_label(), "diagnostics_malformed");
    }
}
