//! Prelude for commonly used types and traits in profile-guard.

pub use crate::catalog::{CatalogClient, InMemoryCatalog};
pub use crate::config::{ProcessorConfig, TableProfileDef, TestCaseDef, TestSuiteDef};
pub use crate::core::{
    Clock, Column, ColumnDataType, ColumnProfile, FixedClock, ProfilerResponse, ServiceType,
    SystemClock, Table, TableProfile, TestCaseResult, TestCaseStatus,
};
pub use crate::engine::{DataFusionEngine, QueryEngine};
pub use crate::error::{ProfilerError, Result};
pub use crate::logging::LogConfig;
pub use crate::processor::{ProcessorStatus, ProfilerProcessor};
pub use crate::profiler::{Metric, Profiler};
pub use crate::sampler::{Sampler, SamplingSpec};
pub use crate::sink::{CatalogSink, Sink};
pub use crate::validations::TestRule;
pub use crate::workflow::{RunSummary, Workflow};
