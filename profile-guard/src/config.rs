//! Workflow configuration consumed by the processor.
//!
//! The configuration is plain JSON with camelCase keys:
//!
//! ```json
//! {
//!   "profiler": { "name": "quick", "metrics": ["rowCount", "nullCount"], "timeoutSeconds": 30 },
//!   "testSuites": [{
//!     "name": "nightly",
//!     "testCases": [{
//!       "name": "orders_rows",
//!       "testDefinitionName": "tableRowCountToBeBetween",
//!       "fullyQualifiedName": "db.sales.orders",
//!       "parameterValues": [{"name": "minValue", "value": 10}, {"name": "maxValue", "value": 100}]
//!     }]
//!   }],
//!   "tables": [{ "table": "db.sales.orders", "profileSample": 50.0 }],
//!   "workflowProfileSample": 75.0
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::TestCaseParameterValue;
use crate::error::{ProfilerError, Result};
use crate::profiler::Metric;
use crate::sampler::partition_window;

/// Custom metric set and time budget for the profiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilerDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Metric names; the default metric set is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<String>>,
    /// Budget for each single metric computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// A test case declared in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub test_definition_name: String,
    /// Fully qualified name of the table the case targets
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default)]
    pub parameter_values: Vec<TestCaseParameterValue>,
}

/// A test suite declared in the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseDef>,
}

/// Per-table sampling record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfileDef {
    /// Fully qualified name of the table
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_sample: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_sample_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_field: Option<String>,
    /// Partition window length in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_query_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_values: Option<Vec<serde_json::Value>>,
    /// Drop the stored sample query from the table entity
    #[serde(default)]
    pub clear_sample_query_from_entity: bool,
}

impl TableProfileDef {
    /// Creates an empty record for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_profile_sample(mut self, profile_sample: f64) -> Self {
        self.profile_sample = Some(profile_sample);
        self
    }

    pub fn with_profile_sample_query(mut self, query: impl Into<String>) -> Self {
        self.profile_sample_query = Some(query.into());
        self
    }

    pub fn with_partition_field(mut self, field: impl Into<String>) -> Self {
        self.partition_field = Some(field.into());
        self
    }

    pub fn with_partition_query_duration(mut self, days: i64) -> Self {
        self.partition_query_duration = Some(days);
        self
    }

    pub fn with_partition_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.partition_values = Some(values);
        self
    }

    pub fn with_clear_sample_query(mut self, clear: bool) -> Self {
        self.clear_sample_query_from_entity = clear;
        self
    }
}

fn default_generate_sample_data() -> bool {
    true
}

fn default_sample_data_rows() -> usize {
    50
}

/// Configuration of a profiling workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiler: Option<ProfilerDef>,
    #[serde(default)]
    pub test_suites: Vec<TestSuiteDef>,
    #[serde(default)]
    pub tables: Vec<TableProfileDef>,
    /// Workflow-wide sample percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_profile_sample: Option<f64>,
    #[serde(default = "default_generate_sample_data")]
    pub generate_sample_data: bool,
    #[serde(default = "default_sample_data_rows")]
    pub sample_data_rows: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            profiler: None,
            test_suites: Vec::new(),
            tables: Vec::new(),
            workflow_profile_sample: None,
            generate_sample_data: default_generate_sample_data(),
            sample_data_rows: default_sample_data_rows(),
        }
    }
}

impl ProcessorConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let profiler = self.profiler.get_or_insert_with(ProfilerDef::default);
        profiler.metrics = Some(metrics.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.profiler
            .get_or_insert_with(ProfilerDef::default)
            .timeout_seconds = Some(timeout_seconds);
        self
    }

    pub fn with_test_suite(mut self, suite: TestSuiteDef) -> Self {
        self.test_suites.push(suite);
        self
    }

    pub fn with_table(mut self, table: TableProfileDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_workflow_profile_sample(mut self, profile_sample: f64) -> Self {
        self.workflow_profile_sample = Some(profile_sample);
        self
    }

    pub fn with_sample_data(mut self, enabled: bool, rows: usize) -> Self {
        self.generate_sample_data = enabled;
        self.sample_data_rows = rows;
        self
    }

    /// Returns the per-table record for a table, if any.
    pub fn table_config(&self, table_fqn: &str) -> Option<&TableProfileDef> {
        self.tables.iter().find(|t| t.table == table_fqn)
    }

    /// Custom metric names, if configured.
    pub fn metric_names(&self) -> Option<&[String]> {
        self.profiler.as_ref().and_then(|p| p.metrics.as_deref())
    }

    pub fn timeout_seconds(&self) -> Option<u64> {
        self.profiler.as_ref().and_then(|p| p.timeout_seconds)
    }

    /// Validates the configuration before any table is processed.
    pub fn validate(&self) -> Result<()> {
        if let Some(names) = self.metric_names() {
            for name in names {
                Metric::from_name(name)?;
            }
        }
        if self.timeout_seconds() == Some(0) {
            return Err(ProfilerError::Configuration(
                "timeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if let Some(sample) = self.workflow_profile_sample {
            validate_percentage("workflowProfileSample", sample)?;
        }

        for suite in &self.test_suites {
            if suite.name.trim().is_empty() {
                return Err(ProfilerError::Configuration(
                    "test suite name cannot be empty".to_string(),
                ));
            }
            for case in &suite.test_cases {
                if case.name.trim().is_empty() {
                    return Err(ProfilerError::Configuration(format!(
                        "test case in suite '{}' has an empty name",
                        suite.name
                    )));
                }
                if case.fully_qualified_name.trim().is_empty() {
                    return Err(ProfilerError::Configuration(format!(
                        "test case '{}' has no target table",
                        case.name
                    )));
                }
            }
        }

        for table in &self.tables {
            if let Some(sample) = table.profile_sample {
                validate_percentage(&format!("{}.profileSample", table.table), sample)?;
            }
            if let Some(days) = table.partition_query_duration {
                if days <= 0 || partition_window(days).is_none() {
                    return Err(ProfilerError::Configuration(format!(
                        "{}.partitionQueryDuration must be a positive number of days, got {days}",
                        table.table
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Checks that a sampling percentage lies in `(0, 100]`.
pub fn validate_percentage(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(ProfilerError::Configuration(format!(
            "{field} must be within (0, 100], got {value}"
        )))
    }
}
