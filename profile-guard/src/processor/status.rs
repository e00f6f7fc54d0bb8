//! Run status kept by the processor.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::core::TestCaseResult;

/// A failure or warning tied to a table, test or metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Table FQN, test identity or metric key
    pub identity: String,
    pub message: String,
}

impl StatusEntry {
    pub fn new(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identity, self.message)
    }
}

/// Processed tables, executed tests and failures of one processor run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorStatus {
    /// Fully qualified names of the profiled tables
    pub records: Vec<String>,
    /// Identities of the evaluated tests
    pub tests: Vec<String>,
    pub failures: Vec<StatusEntry>,
    /// Non fatal problems, such as a metric that could not be computed
    pub warnings: Vec<StatusEntry>,
}

impl ProcessorStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed(&mut self, table_fqn: impl Into<String>) {
        self.records.push(table_fqn.into());
    }

    pub fn tested(&mut self, test: impl Into<String>) {
        let test = test.into();
        info!(test = %test, "Table tested");
        self.tests.push(test);
    }

    /// Records a test evaluation; anything but a success is also a failure.
    pub fn test_result(&mut self, test: impl Into<String>, result: &TestCaseResult) {
        let test = test.into();
        if !result.is_success() {
            self.failure(test.clone(), result.result.clone());
        }
        self.tested(test);
    }

    pub fn failure(&mut self, identity: impl Into<String>, message: impl Into<String>) {
        self.failures.push(StatusEntry::new(identity, message));
    }

    pub fn warning(&mut self, identity: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(StatusEntry::new(identity, message));
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
