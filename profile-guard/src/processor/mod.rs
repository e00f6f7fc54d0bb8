//! Per-table orchestration: sample, profile, test, assemble.
//!
//! A [`ProfilerProcessor`] owns the state of one run: the set of test
//! identities already evaluated and the [`ProcessorStatus`]. Tables are
//! processed one at a time; every failure below the table is caught and
//! recorded in the status instead of aborting the table.
//!
//! ```rust,ignore
//! use profile_guard::prelude::*;
//! use std::sync::Arc;
//!
//! let engine = DataFusionEngine::new(ctx).with_table("shop.sales.orders", "orders");
//! let catalog = InMemoryCatalog::with_builtin_definitions();
//! let mut processor = ProfilerProcessor::new(config, Arc::new(engine), Arc::new(catalog))?;
//!
//! let response = processor.process(&table).await?;
//! println!("{} tests run", response.test_results.len());
//! ```

pub mod status;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::CatalogClient;
use crate::config::{ProcessorConfig, TestCaseDef};
use crate::core::{
    Clock, CreateTestCase, CreateTestSuite, EntityTest, EntityType, ProfilerResponse,
    SystemClock, Table, TableData, TableProfile, TestCaseOutcome, TestCaseResult, TestIdentity,
    TestSuite,
};
use crate::engine::{QueryEngine, SampleHandle};
use crate::error::{ProfilerError, Result};
use crate::logging::LogConfig;
use crate::profiler::Profiler;
use crate::sampler::{Sampler, SamplingSpec};
use crate::validations::{ProfileRef, TestRule};
use crate::{log_data_op, log_test};

pub use status::{ProcessorStatus, StatusEntry};

/// Runs sampling, profiling and tests for each table of a workflow.
pub struct ProfilerProcessor {
    config: ProcessorConfig,
    engine: Arc<dyn QueryEngine>,
    catalog: Arc<dyn CatalogClient>,
    clock: Arc<dyn Clock>,
    sampler: Sampler,
    log_config: LogConfig,
    evaluated: HashSet<TestIdentity>,
    status: ProcessorStatus,
}

impl ProfilerProcessor {
    /// Creates a processor after validating the configuration.
    ///
    /// Configuration errors, such as an unregistered custom metric, are the
    /// only errors that surface before any table is touched.
    pub fn new(
        config: ProcessorConfig,
        engine: Arc<dyn QueryEngine>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Result<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            config,
            engine,
            catalog,
            sampler: Sampler::new(clock.clone()),
            clock,
            log_config: LogConfig::default(),
            evaluated: HashSet::new(),
            status: ProcessorStatus::new(),
        })
    }

    /// Replaces the clock used for timestamps and partition windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.sampler = Sampler::new(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn status(&self) -> &ProcessorStatus {
        &self.status
    }

    /// Builds the profiler configured for this run.
    pub fn build_profiler(&self) -> Result<Profiler> {
        let profiler = match self.config.metric_names() {
            Some(names) => Profiler::from_names(names)?,
            None => Profiler::default_profiler(),
        };
        Ok(match self.config.timeout_seconds() {
            Some(seconds) => profiler.with_timeout_seconds(seconds),
            None => profiler,
        })
    }

    /// Profiles and tests a single table.
    ///
    /// An `Err` means the table produced no profile; the failure has already
    /// been recorded in the status.
    #[instrument(skip_all, fields(table = %table.fully_qualified_name))]
    pub async fn process(&mut self, table: &Table) -> Result<ProfilerResponse> {
        match self.process_table(table).await {
            Ok(response) => Ok(response),
            Err(err) => {
                error!(error = %err, "Could not profile table");
                self.status
                    .failure(&table.fully_qualified_name, err.to_string());
                Err(err)
            }
        }
    }

    async fn process_table(&mut self, table: &Table) -> Result<ProfilerResponse> {
        let fqn = table.fully_qualified_name.as_str();
        let timestamp = self.clock.now();

        let handle = self.engine.resolve(table).await?;
        let sampling = self
            .sampler
            .resolve(table, &self.config, self.catalog.as_ref())
            .await?;
        let query = sampling.profile_query().map(|q| self.log_config.loggable_query(q));
        log_data_op!(
            self.log_config,
            table = %fqn,
            mode = sampling.mode(),
            profile_sample = ?sampling.profile_sample(),
            query = ?query,
            "Resolved sampling"
        );

        let prepared = self.engine.prepare_sample(&handle, &sampling).await;
        let (sample, sampling, degraded) = match prepared {
            Ok(sample) => (sample, sampling, false),
            Err(err @ ProfilerError::SampleFetch { .. }) => {
                warn!(error = %err, "Falling back to the whole table");
                self.status.failure(fqn, err.to_string());
                (SampleHandle::unsampled(&handle), SamplingSpec::Full, true)
            }
            Err(err) => return Err(err),
        };

        let profiler = self.build_profiler()?;
        let profile = profiler
            .execute(
                self.engine.as_ref(),
                &sample,
                &sampling,
                &table.columns,
                timestamp,
            )
            .await;
        for metric_error in &profile.metric_errors {
            self.status.warning(
                format!("{fqn}.{}", metric_error.metric),
                metric_error.message.clone(),
            );
        }
        self.status.processed(fqn);

        let mut test_results = self.run_workflow_tests(table, &profile, timestamp).await;
        test_results.extend(self.run_entity_tests(table, &profile, timestamp));

        let sample_data = if self.config.generate_sample_data && !degraded {
            self.fetch_sample_data(&sample).await
        } else {
            None
        };

        info!(
            tests = test_results.len(),
            metric_errors = profile.metric_errors.len(),
            sample_rows = sample_data.as_ref().map(TableData::len),
            "Table processed"
        );

        Ok(ProfilerResponse {
            table: table.clone(),
            profile,
            test_results,
            sample_data,
        })
    }

    /// Runs the test suites declared in the workflow against this table.
    async fn run_workflow_tests(
        &mut self,
        table: &Table,
        profile: &TableProfile,
        timestamp: DateTime<Utc>,
    ) -> Vec<TestCaseOutcome> {
        let mut outcomes = Vec::new();
        if self.config.test_suites.is_empty() {
            return outcomes;
        }
        debug!("Running workflow test suites");

        let suites = self.config.test_suites.clone();
        for suite_def in &suites {
            let request = CreateTestSuite {
                name: suite_def.name.clone(),
                description: suite_def.description.clone(),
                schedule_interval: suite_def.schedule_interval.clone(),
            };
            let suite = match self.catalog.get_or_create_test_suite(&request).await {
                Ok(suite) => suite,
                Err(err) => {
                    warn!(suite = %suite_def.name, error = %err, "Skipping test suite");
                    self.status.failure(&suite_def.name, err.to_string());
                    continue;
                }
            };

            for case_def in &suite_def.test_cases {
                match self
                    .run_test_case(table, profile, &suite, case_def, timestamp)
                    .await
                {
                    Ok(Some(outcome)) => outcomes.push(outcome),
                    Ok(None) => {}
                    Err(err) => {
                        let identity =
                            format!("{}.{}", case_def.fully_qualified_name, case_def.name);
                        warn!(test_case = %identity, error = %err, "Skipping test case");
                        self.status.failure(identity, err.to_string());
                    }
                }
            }
        }
        outcomes
    }

    async fn run_test_case(
        &mut self,
        table: &Table,
        profile: &TableProfile,
        suite: &TestSuite,
        case_def: &TestCaseDef,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<TestCaseOutcome>> {
        let definition = self
            .catalog
            .get_test_definition(&case_def.test_definition_name)
            .await?;
        let case = self
            .catalog
            .get_or_create_test_case(&CreateTestCase {
                name: case_def.name.clone(),
                description: case_def.description.clone(),
                test_definition: definition.name.clone(),
                entity_fqn: case_def.fully_qualified_name.clone(),
                column_name: case_def.column_name.clone(),
                test_suite: suite.name.clone(),
                parameter_values: case_def.parameter_values.clone(),
            })
            .await?;

        if case.entity_fqn != table.fully_qualified_name {
            return Ok(None);
        }

        let identity = case.identity();
        if self.already_evaluated(&identity) {
            return Ok(None);
        }

        let rule = TestRule::bind(&definition.name, &case.parameter_values)?;
        if rule.entity_type() == EntityType::Column && case.column_name.is_none() {
            return Err(ProfilerError::invalid_parameter(
                rule.kind().name(),
                "column test without a column name",
            ));
        }

        let column = case.column_name.as_deref();
        let result = self.evaluate(&rule, profile, column, &identity, timestamp);
        Ok(Some(TestCaseOutcome {
            test_case_fqn: case.fully_qualified_name,
            result,
        }))
    }

    /// Runs the tests stored on the table and its columns.
    ///
    /// Identities already evaluated from the workflow are skipped.
    fn run_entity_tests(
        &mut self,
        table: &Table,
        profile: &TableProfile,
        timestamp: DateTime<Utc>,
    ) -> Vec<TestCaseOutcome> {
        let table_tests = table.table_tests.iter().map(|test| (None, test));
        let column_tests = table.columns.iter().flat_map(|column| {
            column
                .column_tests
                .iter()
                .map(move |test| (Some(column.name.as_str()), test))
        });
        let tests: Vec<(Option<&str>, &EntityTest)> = table_tests.chain(column_tests).collect();

        let mut outcomes = Vec::new();
        for (column, test) in tests {
            let rule = match TestRule::bind(&test.test_definition_name, &test.parameter_values) {
                Ok(rule) => rule,
                Err(err) => {
                    let identity = match column {
                        Some(column) => format!(
                            "{}.{column}.{}",
                            table.fully_qualified_name, test.test_definition_name
                        ),
                        None => {
                            format!("{}.{}", table.fully_qualified_name, test.test_definition_name)
                        }
                    };
                    warn!(test = %identity, error = %err, "Skipping entity test");
                    self.status.failure(identity, err.to_string());
                    continue;
                }
            };

            let identity = match column {
                Some(column) => {
                    TestIdentity::column(&table.fully_qualified_name, column, rule.kind().name())
                }
                None => TestIdentity::table(&table.fully_qualified_name, rule.kind().name()),
            };
            if self.already_evaluated(&identity) {
                continue;
            }

            let result = self.evaluate(&rule, profile, column, &identity, timestamp);
            outcomes.push(TestCaseOutcome {
                test_case_fqn: identity.to_string(),
                result,
            });
        }
        outcomes
    }

    fn already_evaluated(&self, identity: &TestIdentity) -> bool {
        let seen = self.evaluated.contains(identity);
        if seen {
            info!("Test {identity} has already been computed in this execution.");
        }
        seen
    }

    /// Evaluates a bound rule and records it as executed.
    fn evaluate(
        &mut self,
        rule: &TestRule,
        profile: &TableProfile,
        column: Option<&str>,
        identity: &TestIdentity,
        timestamp: DateTime<Utc>,
    ) -> TestCaseResult {
        let result = match (rule.entity_type(), column) {
            (EntityType::Column, Some(column)) => match profile.column(column) {
                Some(column_profile) => {
                    rule.evaluate(ProfileRef::Column(column_profile), timestamp)
                }
                None => TestCaseResult::aborted(
                    timestamp,
                    format!(
                        "Cannot find a profiler that computed the column {column} Skipping validation {identity}"
                    ),
                ),
            },
            _ => rule.evaluate(ProfileRef::Table(profile), timestamp),
        };

        log_test!(
            self.log_config,
            test = %identity,
            status = %result.test_case_status,
            result = %result.result,
            "Test evaluated"
        );
        self.evaluated.insert(identity.clone());
        self.status.test_result(identity.to_string(), &result);
        result
    }

    async fn fetch_sample_data(&mut self, sample: &SampleHandle) -> Option<TableData> {
        match self
            .engine
            .fetch_rows(sample, self.config.sample_data_rows)
            .await
        {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(
                    "Could not obtain sample data from {} - {err}",
                    sample.table_fqn
                );
                self.status.warning(&sample.table_fqn, err.to_string());
                None
            }
        }
    }
}
