//! In-memory implementation of [`CatalogClient`] for tests and local runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::CatalogClient;
use crate::core::{
    CreateTestCase, CreateTestSuite, TableData, TableProfile, TableProfilerConfig, TestCase,
    TestCaseResult, TestDefinition, TestSuite,
};
use crate::error::{ProfilerError, Result};
use crate::validations::TestRule;

/// Catalog operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOperation {
    CreateTestSuite,
    CreateTestCase,
    PersistProfile,
    PersistTestResult,
    PersistSample,
    UpdateSamplingConfig,
}

#[derive(Debug, Default)]
struct CatalogState {
    test_suites: HashMap<String, TestSuite>,
    test_definitions: HashMap<String, TestDefinition>,
    test_cases: HashMap<String, TestCase>,
    profiles: HashMap<String, Vec<TableProfile>>,
    test_results: HashMap<String, Vec<TestCaseResult>>,
    samples: HashMap<String, TableData>,
    sampling_configs: HashMap<String, TableProfilerConfig>,
    failing: HashSet<CatalogOperation>,
}

impl CatalogState {
    fn check(&self, operation: CatalogOperation, identity: &str) -> Result<()> {
        if self.failing.contains(&operation) {
            return Err(ProfilerError::Internal(format!(
                "{operation:?} rejected for '{identity}'"
            )));
        }
        Ok(())
    }
}

/// A catalog kept entirely in memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// processor and inspect the other afterwards.
///
/// ```rust,ignore
/// use profile_guard::catalog::{CatalogClient, InMemoryCatalog};
///
/// let catalog = InMemoryCatalog::with_builtin_definitions();
/// let definition = catalog.get_test_definition("columnValuesToBeUnique").await?;
/// assert_eq!(definition.name, "columnValuesToBeUnique");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog with no test definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with every built-in test definition.
    pub fn with_builtin_definitions() -> Self {
        let state = CatalogState {
            test_definitions: TestRule::definitions()
                .into_iter()
                .map(|d| (d.name.to_lowercase(), d))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Registers an extra test definition.
    pub async fn register_definition(&self, definition: TestDefinition) {
        self.state
            .write()
            .await
            .test_definitions
            .insert(definition.name.to_lowercase(), definition);
    }

    /// Makes every subsequent call of `operation` fail.
    pub async fn fail_on(&self, operation: CatalogOperation) {
        self.state.write().await.failing.insert(operation);
    }

    /// Profiles persisted for a table, oldest first.
    pub async fn profiles(&self, table_fqn: &str) -> Vec<TableProfile> {
        self.state
            .read()
            .await
            .profiles
            .get(table_fqn)
            .cloned()
            .unwrap_or_default()
    }

    /// Results persisted for a test case, oldest first.
    pub async fn test_results(&self, test_case_fqn: &str) -> Vec<TestCaseResult> {
        self.state
            .read()
            .await
            .test_results
            .get(test_case_fqn)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn sample(&self, table_fqn: &str) -> Option<TableData> {
        self.state.read().await.samples.get(table_fqn).cloned()
    }

    pub async fn sampling_config(&self, table_fqn: &str) -> Option<TableProfilerConfig> {
        self.state
            .read()
            .await
            .sampling_configs
            .get(table_fqn)
            .cloned()
    }

    pub async fn test_case(&self, fqn: &str) -> Option<TestCase> {
        self.state.read().await.test_cases.get(fqn).cloned()
    }

    pub async fn test_suite(&self, name: &str) -> Option<TestSuite> {
        self.state.read().await.test_suites.get(name).cloned()
    }

    pub async fn test_case_count(&self) -> usize {
        self.state.read().await.test_cases.len()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    #[instrument(skip(self, request), fields(suite = %request.name))]
    async fn get_or_create_test_suite(&self, request: &CreateTestSuite) -> Result<TestSuite> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.test_suites.get(&request.name) {
            return Ok(existing.clone());
        }
        state
            .check(CatalogOperation::CreateTestSuite, &request.name)
            .map_err(|e| {
                ProfilerError::catalog_lookup("testSuite", &request.name, e.to_string())
            })?;

        let suite = TestSuite {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            description: request.description.clone(),
            schedule_interval: request.schedule_interval.clone(),
        };
        debug!(suite.id = %suite.id, "Created test suite");
        state.test_suites.insert(suite.name.clone(), suite.clone());
        Ok(suite)
    }

    async fn get_test_definition(&self, name: &str) -> Result<TestDefinition> {
        self.state
            .read()
            .await
            .test_definitions
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                ProfilerError::catalog_lookup(
                    "testDefinition",
                    name,
                    "test definition is not registered",
                )
            })
    }

    #[instrument(
        skip(self, request),
        fields(test_case = %request.name, entity = %request.entity_fqn)
    )]
    async fn get_or_create_test_case(&self, request: &CreateTestCase) -> Result<TestCase> {
        let fqn = request.fully_qualified_name();
        let mut state = self.state.write().await;
        if let Some(existing) = state.test_cases.get(&fqn) {
            return Ok(existing.clone());
        }
        state
            .check(CatalogOperation::CreateTestCase, &fqn)
            .map_err(|e| ProfilerError::catalog_lookup("testCase", &fqn, e.to_string()))?;
        if !state.test_suites.contains_key(&request.test_suite) {
            return Err(ProfilerError::catalog_lookup(
                "testCase",
                &fqn,
                format!("test suite '{}' does not exist", request.test_suite),
            ));
        }
        if !state
            .test_definitions
            .contains_key(&request.test_definition.to_lowercase())
        {
            return Err(ProfilerError::catalog_lookup(
                "testCase",
                &fqn,
                format!(
                    "test definition '{}' is not registered",
                    request.test_definition
                ),
            ));
        }

        let test_case = TestCase {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            fully_qualified_name: fqn.clone(),
            description: request.description.clone(),
            test_definition: request.test_definition.clone(),
            entity_fqn: request.entity_fqn.clone(),
            column_name: request.column_name.clone(),
            test_suite: request.test_suite.clone(),
            parameter_values: request.parameter_values.clone(),
        };
        debug!(test_case.id = %test_case.id, "Created test case");
        state.test_cases.insert(fqn, test_case.clone());
        Ok(test_case)
    }

    async fn persist_profile(&self, table_fqn: &str, profile: &TableProfile) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(CatalogOperation::PersistProfile, table_fqn)?;
        state
            .profiles
            .entry(table_fqn.to_string())
            .or_default()
            .push(profile.clone());
        Ok(())
    }

    async fn persist_test_result(
        &self,
        test_case_fqn: &str,
        result: &TestCaseResult,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(CatalogOperation::PersistTestResult, test_case_fqn)?;
        state
            .test_results
            .entry(test_case_fqn.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    async fn persist_sample(&self, table_fqn: &str, data: &TableData) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(CatalogOperation::PersistSample, table_fqn)?;
        state.samples.insert(table_fqn.to_string(), data.clone());
        Ok(())
    }

    async fn update_table_sampling_config(
        &self,
        table_fqn: &str,
        config: &TableProfilerConfig,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(CatalogOperation::UpdateSamplingConfig, table_fqn)?;
        state
            .sampling_configs
            .insert(table_fqn.to_string(), config.clone());
        Ok(())
    }
}
