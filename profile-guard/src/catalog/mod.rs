//! The metadata catalog collaborator.
//!
//! The processor resolves test suites, test definitions and test cases
//! through a [`CatalogClient`], and sinks persist results through it. All
//! resolve-or-create operations are idempotent by identity.

pub mod in_memory;

use async_trait::async_trait;

use crate::core::{
    CreateTestCase, CreateTestSuite, TableData, TableProfile, TableProfilerConfig, TestCase,
    TestCaseResult, TestDefinition, TestSuite,
};
use crate::error::Result;

pub use in_memory::{CatalogOperation, InMemoryCatalog};

/// Passive store of test records and profiling results.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns the suite with the requested name, creating it if needed.
    async fn get_or_create_test_suite(&self, request: &CreateTestSuite) -> Result<TestSuite>;

    /// Looks up a registered test definition.
    ///
    /// Fails with `CatalogLookup` if the name is not registered.
    async fn get_test_definition(&self, name: &str) -> Result<TestDefinition>;

    /// Returns the case with the requested fully qualified name, creating it
    /// if needed.
    async fn get_or_create_test_case(&self, request: &CreateTestCase) -> Result<TestCase>;

    async fn persist_profile(&self, table_fqn: &str, profile: &TableProfile) -> Result<()>;

    async fn persist_test_result(&self, test_case_fqn: &str, result: &TestCaseResult)
        -> Result<()>;

    async fn persist_sample(&self, table_fqn: &str, data: &TableData) -> Result<()>;

    /// Overwrites the sampling configuration stored on the table.
    async fn update_table_sampling_config(
        &self,
        table_fqn: &str,
        config: &TableProfilerConfig,
    ) -> Result<()>;
}
