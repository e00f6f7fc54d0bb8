//! The per-table unit handed to a sink.

use serde::{Deserialize, Serialize};

use super::profile::TableProfile;
use super::table::Table;
use super::test_case::TestCaseResult;

/// Raw sample rows, rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    /// Row-major values, `None` for SQL NULL
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A test result paired with the test case it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOutcome {
    pub test_case_fqn: String,
    pub result: TestCaseResult,
}

/// Everything produced for one table in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilerResponse {
    pub table: Table,
    pub profile: TableProfile,
    #[serde(default)]
    pub test_results: Vec<TestCaseOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<TableData>,
}

impl ProfilerResponse {
    /// Looks up the result recorded for a test case.
    pub fn result_for(&self, test_case_fqn: &str) -> Option<&TestCaseResult> {
        self.test_results
            .iter()
            .find(|o| o.test_case_fqn == test_case_fqn)
            .map(|o| &o.result)
    }
}
