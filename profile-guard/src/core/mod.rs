//! Data model shared by the sampler, profiler, evaluator and sinks.

pub mod clock;
pub mod profile;
pub mod response;
pub mod table;
pub mod test_case;

pub use clock::{Clock, FixedClock, SystemClock};
pub use profile::{ColumnProfile, MetricError, TableProfile};
pub use response::{ProfilerResponse, TableData, TestCaseOutcome};
pub use table::{
    Column, ColumnDataType, EntityTest, ServiceType, Table, TablePartition, TableProfilerConfig,
};
pub use test_case::{
    CreateTestCase, CreateTestSuite, EntityType, TestCase, TestCaseParameterDefinition,
    TestCaseParameterValue, TestCaseResult, TestCaseStatus, TestDefinition, TestIdentity,
    TestSuite,
};
