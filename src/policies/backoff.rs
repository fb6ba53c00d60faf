//! # Backoff policy for process restarts.
//!
//! [`BackoffPolicy`] controls the pause between a child exiting and the next
//! launch. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay (the supervisor's poll interval);
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for restart `n` is `first × factor^n`, clamped to `max`, then
//! jitter is applied. The default is a constant 500ms.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use revpi_stress::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(500));
//! assert_eq!(backoff.next(1), Duration::from_secs(1));
//! assert_eq!(backoff.next(10), Duration::from_secs(8));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied on top of the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a constant 500ms delay (`factor = 1.0`, `max = 30s`, no jitter).
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// A constant delay of `every`.
    pub fn constant(every: Duration) -> Self {
        Self {
            first: every,
            max: every,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay before restart number `restarts` (0-indexed).
    ///
    /// Overflowing or non-finite intermediate values clamp to `max`.
    pub fn next(&self, restarts: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = restarts.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
