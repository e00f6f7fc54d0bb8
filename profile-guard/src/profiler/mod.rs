//! Metric registry and the profiler that runs it.

pub mod metrics;
pub mod runner;

pub use metrics::{Metric, MetricScope};
pub use runner::Profiler;
