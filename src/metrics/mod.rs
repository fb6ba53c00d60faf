//! Platform health sampling.
//!
//! ## Contents
//! - [`MetricSample`] one row of the metric log
//! - [`Diagnostics`] the platform diagnostics seam
//! - [`MetricsSampler`] synchronous `sample()` over a [`Diagnostics`] implementation
//! - [`Vcgencmd`] diagnostics backed by the `vcgencmd` firmware tool

mod sample;
mod sampler;
mod vcgencmd;

pub use sample::MetricSample;
pub use sampler::{Diagnostics, MetricsSampler};
pub use vcgencmd::Vcgencmd;
