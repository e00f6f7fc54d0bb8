//! Test cases, their results and the catalog records that back them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A named parameter bound to a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseParameterValue {
    pub name: String,
    /// JSON number or numeric string
    pub value: serde_json::Value,
}

impl TestCaseParameterValue {
    /// Creates a parameter value.
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a test evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestCaseStatus {
    /// The predicate holds
    Success,
    /// Required data was computed but the predicate does not hold
    Failed,
    /// Required data was not computed
    Aborted,
}

impl fmt::Display for TestCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestCaseStatus::Success => write!(f, "Success"),
            TestCaseStatus::Failed => write!(f, "Failed"),
            TestCaseStatus::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Timestamped result of a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub timestamp: DateTime<Utc>,
    pub test_case_status: TestCaseStatus,
    /// Human-readable explanation, observed values first
    pub result: String,
}

impl TestCaseResult {
    /// Creates a successful result.
    pub fn success(timestamp: DateTime<Utc>, result: impl Into<String>) -> Self {
        Self::with_status(timestamp, TestCaseStatus::Success, result)
    }

    /// Creates a failed result.
    pub fn failed(timestamp: DateTime<Utc>, result: impl Into<String>) -> Self {
        Self::with_status(timestamp, TestCaseStatus::Failed, result)
    }

    /// Creates an aborted result.
    pub fn aborted(timestamp: DateTime<Utc>, result: impl Into<String>) -> Self {
        Self::with_status(timestamp, TestCaseStatus::Aborted, result)
    }

    fn with_status(
        timestamp: DateTime<Utc>,
        test_case_status: TestCaseStatus,
        result: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            test_case_status,
            result: result.into(),
        }
    }

    /// Returns true if the test passed.
    pub fn is_success(&self) -> bool {
        self.test_case_status == TestCaseStatus::Success
    }
}

/// Dedup key of a test within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    pub table_fqn: String,
    pub test_type: String,
    pub column: Option<String>,
}

impl TestIdentity {
    /// Identity of a table-level test.
    pub fn table(table_fqn: impl Into<String>, test_type: impl Into<String>) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            test_type: test_type.into(),
            column: None,
        }
    }

    /// Identity of a column-level test.
    pub fn column(
        table_fqn: impl Into<String>,
        column: impl Into<String>,
        test_type: impl Into<String>,
    ) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            test_type: test_type.into(),
            column: Some(column.into()),
        }
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}.{}", self.table_fqn, column, self.test_type),
            None => write!(f, "{}.{}", self.table_fqn, self.test_type),
        }
    }
}

/// Whether a test targets a table or one of its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Table,
    Column,
}

/// Catalog record of a test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval: Option<String>,
}

/// Request to resolve or create a test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestSuite {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval: Option<String>,
}

/// Declared parameter of a test definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseParameterDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Catalog record of a test definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub entity_type: EntityType,
    pub parameter_definition: Vec<TestCaseParameterDefinition>,
}

/// Catalog record of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: Uuid,
    pub name: String,
    /// `<entity fqn>.<name>`
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the bound test definition
    pub test_definition: String,
    /// Fully qualified name of the table under test
    pub entity_fqn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Name of the owning test suite
    pub test_suite: String,
    #[serde(default)]
    pub parameter_values: Vec<TestCaseParameterValue>,
}

impl TestCase {
    /// Returns the dedup identity of this test case.
    ///
    /// Catalog test cases are keyed by their own name, so two cases bound to
    /// the same definition on one table are both evaluated.
    pub fn identity(&self) -> TestIdentity {
        TestIdentity {
            table_fqn: self.entity_fqn.clone(),
            test_type: self.name.clone(),
            column: self.column_name.clone(),
        }
    }
}

/// Request to resolve or create a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub test_definition: String,
    pub entity_fqn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    pub test_suite: String,
    #[serde(default)]
    pub parameter_values: Vec<TestCaseParameterValue>,
}

impl CreateTestCase {
    /// Fully qualified name the created record will carry.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.entity_fqn, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let table = TestIdentity::table("db.sales.orders", "tableRowCountToEqual");
        assert_eq!(table.to_string(), "db.sales.orders.tableRowCountToEqual");

        let column = TestIdentity::column("db.sales.orders", "id", "columnValuesToBeUnique");
        assert_eq!(
            column.to_string(),
            "db.sales.orders.id.columnValuesToBeUnique"
        );
        assert_ne!(table, column);
    }

    #[test]
    fn test_result_constructors() {
        let now = Utc::now();
        assert!(TestCaseResult::success(now, "ok").is_success());
        assert_eq!(
            TestCaseResult::aborted(now, "missing").test_case_status,
            TestCaseStatus::Aborted
        );
    }

    #[test]
    fn test_case_identity_uses_case_name() {
        let case = |name: &str| TestCase {
            id: Uuid::new_v4(),
            name: name.to_string(),
            fully_qualified_name: format!("db.sales.orders.{name}"),
            description: None,
            test_definition: "tableRowCountToBeBetween".to_string(),
            entity_fqn: "db.sales.orders".to_string(),
            column_name: None,
            test_suite: "nightly".to_string(),
            parameter_values: Vec::new(),
        };

        let sanity = case("rows_sanity").identity();
        assert_eq!(sanity, TestIdentity::table("db.sales.orders", "rows_sanity"));
        assert_ne!(sanity, case("rows_tight").identity());
    }

    #[test]
    fn test_case_fqn() {
        let request = CreateTestCase {
            name: "orders_row_count".to_string(),
            description: None,
            test_definition: "tableRowCountToEqual".to_string(),
            entity_fqn: "db.sales.orders".to_string(),
            column_name: None,
            test_suite: "nightly".to_string(),
            parameter_values: vec![TestCaseParameterValue::new("value", 100)],
        };
        assert_eq!(
            request.fully_qualified_name(),
            "db.sales.orders.orders_row_count"
        );
    }
}
