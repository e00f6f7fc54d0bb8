//! The batch loop: every table through the processor, then the sink.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument, warn};

use crate::core::Table;
use crate::error::Result;
use crate::processor::{ProfilerProcessor, StatusEntry};
use crate::sink::Sink;

/// End-of-run report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub tables_processed: usize,
    pub tests_executed: usize,
    /// Processor failures followed by sink failures
    pub failures: Vec<StatusEntry>,
    pub warnings: Vec<StatusEntry>,
    pub records_written: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Serializes the summary as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Profiler run summary")?;
        writeln!(f, "  Tables processed: {}", self.tables_processed)?;
        writeln!(f, "  Tests executed: {}", self.tests_executed)?;
        writeln!(f, "  Records written: {}", self.records_written.len())?;
        writeln!(f, "  Warnings: {}", self.warnings.len())?;
        write!(f, "  Failures: {}", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n    - {failure}")?;
        }
        Ok(())
    }
}

/// A processor paired with the sink its responses go to.
pub struct Workflow<S: Sink> {
    processor: ProfilerProcessor,
    sink: S,
}

impl<S: Sink> Workflow<S> {
    pub fn new(processor: ProfilerProcessor, sink: S) -> Self {
        Self { processor, sink }
    }

    pub fn processor(&self) -> &ProfilerProcessor {
        &self.processor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Processes the tables one after the other.
    ///
    /// Only an invalid configuration fails the run. A table that cannot be
    /// profiled and a response that cannot be persisted are reported in the
    /// summary and the loop moves on.
    #[instrument(skip_all, fields(tables = tables.len()))]
    pub async fn run(&mut self, tables: &[Table]) -> Result<RunSummary> {
        self.processor.config().validate()?;

        let mut sink_failures = Vec::new();
        for table in tables {
            let Ok(response) = self.processor.process(table).await else {
                continue;
            };
            if let Err(err) = self.sink.write_record(&response).await {
                warn!(table = %table.fully_qualified_name, error = %err, "Sink failed");
                sink_failures.push(StatusEntry::new(&table.fully_qualified_name, err.to_string()));
            }
        }

        let status = self.processor.status();
        let mut failures = status.failures.clone();
        failures.extend(sink_failures);
        let summary = RunSummary {
            tables_processed: status.records.len(),
            tests_executed: status.tests.len(),
            failures,
            warnings: status.warnings.clone(),
            records_written: self.sink.status().records_written.clone(),
        };

        info!(
            tables_processed = summary.tables_processed,
            tests_executed = summary.tests_executed,
            failures = summary.failures.len(),
            "Profiler workflow completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            tables_processed: 2,
            tests_executed: 3,
            failures: vec![StatusEntry::new(
                "db.t.tableRowCountToEqual",
                "Found 1.0 rows vs. the expected 2",
            )],
            warnings: Vec::new(),
            records_written: vec!["Table: db.t".to_string()],
        };

        let text = summary.to_string();
        assert!(text.contains("Tables processed: 2"));
        assert!(text.contains("Records written: 1"));
        assert!(text.ends_with("- db.t.tableRowCountToEqual: Found 1.0 rows vs. the expected 2"));
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_json_keys() {
        let json = RunSummary::default().to_json().unwrap();
        assert!(json.contains("\"tablesProcessed\": 0"));
        assert!(json.contains("\"recordsWritten\": []"));
    }
}
