//! The query execution seam.
//!
//! The profiler never issues SQL itself. It asks a [`QueryEngine`] to
//! narrow a table down to a sample and to compute one metric at a time over
//! that sample. [`DataFusionEngine`] is the in-process implementation.

mod session;

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::{Column, Table, TableData};
use crate::error::Result;
use crate::profiler::Metric;
use crate::sampler::SamplingSpec;

pub use session::DataFusionEngine;

/// A table made queryable.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    pub table_fqn: String,
    /// Name the relation is registered under in the engine
    pub relation: String,
    pub columns: Vec<Column>,
}

/// A sample of a table, ready for metric computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleHandle {
    pub table_fqn: String,
    pub relation: String,
    pub columns: Vec<Column>,
}

impl SampleHandle {
    /// Sample over the whole table.
    pub fn unsampled(handle: &TableHandle) -> Self {
        Self {
            table_fqn: handle.table_fqn.clone(),
            relation: handle.relation.clone(),
            columns: handle.columns.clone(),
        }
    }
}

/// "Compute metric M over sample S", for a table metric or one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRequest {
    pub metric: Metric,
    pub column: Option<String>,
}

impl MetricRequest {
    pub fn table(metric: Metric) -> Self {
        Self {
            metric,
            column: None,
        }
    }

    pub fn column(metric: Metric, column: impl Into<String>) -> Self {
        Self {
            metric,
            column: Some(column.into()),
        }
    }

    /// Key used in logs and metric errors: `metric` or `column.metric`.
    pub fn key(&self) -> String {
        match &self.column {
            Some(column) => format!("{column}.{}", self.metric),
            None => self.metric.to_string(),
        }
    }
}

/// Executes sampling and metric requests against a data source.
#[async_trait]
pub trait QueryEngine: Debug + Send + Sync {
    /// Converts the catalog table into a queryable handle.
    async fn resolve(&self, table: &Table) -> Result<TableHandle>;

    /// Narrows the table down to the rows selected by `sampling`.
    ///
    /// Fails with `SampleFetch` when the sample cannot be built.
    async fn prepare_sample(&self, table: &TableHandle, sampling: &SamplingSpec)
        -> Result<SampleHandle>;

    /// Computes a single scalar metric; `None` when the aggregate is NULL.
    async fn compute(&self, sample: &SampleHandle, request: &MetricRequest) -> Result<Option<f64>>;

    /// Fetches up to `limit` raw rows of the sample.
    async fn fetch_rows(&self, sample: &SampleHandle, limit: usize) -> Result<TableData>;
}
