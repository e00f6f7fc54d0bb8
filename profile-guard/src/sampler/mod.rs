//! Sampling resolution.
//!
//! For every table the [`Sampler`] decides which rows are in scope for
//! profiling. Exactly one [`SamplingSpec`] mode is picked, in this order:
//!
//! 1. an explicit sample query (per-table record, else stored on the table)
//! 2. a partition window, for partitioned tables on services that need one
//! 3. a sampling percentage (per-table record, workflow override, stored value)
//! 4. the whole table

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::catalog::CatalogClient;
use crate::config::{validate_percentage, ProcessorConfig, TableProfileDef};
use crate::core::{Clock, Table, TableProfilerConfig};
use crate::error::{ProfilerError, Result};

/// Partition window length used when none is configured.
pub const DEFAULT_PARTITION_DAYS: i64 = 1;

/// Rows selected from a partitioned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PartitionFilter {
    /// `start <= field < end`
    Window {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// `field IN (values)`
    Values { values: Vec<serde_json::Value> },
}

/// Partition constraint applied to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSpec {
    pub field: String,
    pub filter: PartitionFilter,
}

/// The resolved sampling decision for one table in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum SamplingSpec {
    /// Profile every row
    Full,
    /// Profile a deterministic percentage of rows, `0 < p <= 100`
    Percentage { percentage: f64 },
    /// Profile the result set of a query
    Query { query: String },
    /// Profile a partition slice
    Partition(PartitionSpec),
}

impl SamplingSpec {
    /// Percentage echoed back on the profile.
    pub fn profile_sample(&self) -> Option<f64> {
        match self {
            SamplingSpec::Percentage { percentage } => Some(*percentage),
            _ => None,
        }
    }

    /// Query echoed back on the profile.
    pub fn profile_query(&self) -> Option<&str> {
        match self {
            SamplingSpec::Query { query } => Some(query),
            _ => None,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            SamplingSpec::Full => "full",
            SamplingSpec::Percentage { .. } => "percentage",
            SamplingSpec::Query { .. } => "query",
            SamplingSpec::Partition(_) => "partition",
        }
    }
}

/// Derives the [`SamplingSpec`] of each table.
#[derive(Debug, Clone)]
pub struct Sampler {
    clock: Arc<dyn Clock>,
}

impl Sampler {
    /// Creates a sampler. Partition windows end at `clock.now()`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Resolves the sampling mode of `table`.
    ///
    /// When the per-table record asks to clear the stored sample query, the
    /// catalog's sampling configuration for the table is overwritten with the
    /// percentage alone before resolution continues.
    #[instrument(skip_all, fields(table = %table.fully_qualified_name))]
    pub async fn resolve(
        &self,
        table: &Table,
        config: &ProcessorConfig,
        catalog: &dyn CatalogClient,
    ) -> Result<SamplingSpec> {
        let record = config.table_config(&table.fully_qualified_name);

        if let Some(query) = self.profile_query(table, config, catalog).await? {
            debug!(query.len = query.len(), "Sampling with explicit query");
            return Ok(SamplingSpec::Query { query });
        }

        if let Some(partition) = self.partition(table, record)? {
            debug!(partition.field = %partition.field, "Sampling partition slice");
            return Ok(SamplingSpec::Partition(partition));
        }

        match Self::profile_sample(table, config)? {
            Some(percentage) if percentage < 100.0 => {
                Ok(SamplingSpec::Percentage { percentage })
            }
            _ => Ok(SamplingSpec::Full),
        }
    }

    /// Picks the sampling percentage of a table.
    ///
    /// A per-table record wins. The workflow override applies when it differs
    /// from the percentage stored on the table, or when nothing is stored. The
    /// stored percentage is used otherwise.
    pub fn profile_sample(table: &Table, config: &ProcessorConfig) -> Result<Option<f64>> {
        let record_sample = config
            .table_config(&table.fully_qualified_name)
            .and_then(|r| r.profile_sample);
        let stored = table.stored_profile_sample();

        let sample = match (record_sample, config.workflow_profile_sample, stored) {
            (Some(sample), _, _) => Some(sample),
            (None, Some(workflow), Some(stored)) if workflow == stored => Some(stored),
            (None, Some(workflow), _) => Some(workflow),
            (None, None, stored) => stored,
        };

        if let Some(sample) = sample {
            validate_percentage(&format!("{}.profileSample", table.fully_qualified_name), sample)?;
        }
        Ok(sample)
    }

    /// Picks the explicit sample query of a table, honouring the clear flag.
    ///
    /// When a per-table record exists, the query stored on the table is not
    /// consulted.
    async fn profile_query(
        &self,
        table: &Table,
        config: &ProcessorConfig,
        catalog: &dyn CatalogClient,
    ) -> Result<Option<String>> {
        match config.table_config(&table.fully_qualified_name) {
            Some(record) if record.clear_sample_query_from_entity => {
                let profile_sample = Self::profile_sample(table, config)?;
                catalog
                    .update_table_sampling_config(
                        &table.fully_qualified_name,
                        &TableProfilerConfig {
                            profile_sample,
                            profile_query: None,
                        },
                    )
                    .await?;
                info!(
                    table = %table.fully_qualified_name,
                    "Cleared stored sample query from table"
                );
                Ok(None)
            }
            Some(record) => Ok(record.profile_sample_query.clone()),
            None => Ok(table.stored_profile_query().map(str::to_string)),
        }
    }

    /// Computes the partition constraint, if the table needs one.
    ///
    /// Fails with `Configuration` when the window reaches past the range of
    /// representable timestamps.
    pub fn partition(
        &self,
        table: &Table,
        record: Option<&TableProfileDef>,
    ) -> Result<Option<PartitionSpec>> {
        if !table.service_type.requires_partitioning() {
            return Ok(None);
        }
        let Some(detected) = table.table_partition.as_ref() else {
            return Ok(None);
        };
        if record.is_some_and(|r| r.profile_sample_query.is_some()) {
            return Ok(None);
        }

        let field = record
            .and_then(|r| r.partition_field.clone())
            .or_else(|| detected.columns.first().cloned());
        let Some(field) = field else {
            return Ok(None);
        };

        let values = record
            .and_then(|r| r.partition_values.clone())
            .filter(|v| !v.is_empty());
        let filter = match values {
            Some(values) => PartitionFilter::Values { values },
            None => {
                let days = record
                    .and_then(|r| r.partition_query_duration)
                    .unwrap_or(DEFAULT_PARTITION_DAYS);
                let end = self.clock.now();
                let start = partition_window(days)
                    .and_then(|window| end.checked_sub_signed(window))
                    .ok_or_else(|| {
                        ProfilerError::Configuration(format!(
                            "{}.partitionQueryDuration of {days} days reaches past the earliest \
                             supported timestamp",
                            table.fully_qualified_name
                        ))
                    })?;
                PartitionFilter::Window { start, end }
            }
        };

        Ok(Some(PartitionSpec { field, filter }))
    }
}

/// Length of a partition window of `days` days, if representable.
pub fn partition_window(days: i64) -> Option<TimeDelta> {
    TimeDelta::try_days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::core::{Column, ColumnDataType, FixedClock, ServiceType};
    use crate::error::ProfilerError;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 7, 3, 12, 0, 0).unwrap()
    }

    fn sampler() -> Sampler {
        Sampler::new(Arc::new(FixedClock::new(now())))
    }

    fn orders() -> Table {
        Table::new(
            "db.sales.orders",
            vec![Column::new("id", ColumnDataType::Int)],
        )
    }

    fn events() -> Table {
        Table::new(
            "bq.analytics.events",
            vec![Column::new("created_at", ColumnDataType::Timestamp)],
        )
        .with_service_type(ServiceType::BigQuery)
        .with_partition(vec!["created_at".to_string()])
    }

    #[test]
    fn test_record_sample_wins() {
        let table = orders().with_profiler_config(TableProfilerConfig::with_sample(10.0));
        let config = ProcessorConfig::default()
            .with_workflow_profile_sample(30.0)
            .with_table(TableProfileDef::new("db.sales.orders").with_profile_sample(20.0));
        assert_eq!(Sampler::profile_sample(&table, &config).unwrap(), Some(20.0));
    }

    #[test]
    fn test_workflow_override_applies_when_different() {
        let table = orders().with_profiler_config(TableProfilerConfig::with_sample(10.0));
        let config = ProcessorConfig::default().with_workflow_profile_sample(30.0);
        assert_eq!(Sampler::profile_sample(&table, &config).unwrap(), Some(30.0));
    }

    #[test]
    fn test_workflow_override_equal_to_stored_keeps_stored() {
        let table = orders().with_profiler_config(TableProfilerConfig::with_sample(30.0));
        let config = ProcessorConfig::default().with_workflow_profile_sample(30.0);
        assert_eq!(Sampler::profile_sample(&table, &config).unwrap(), Some(30.0));
    }

    #[test]
    fn test_stored_and_absent_sample() {
        let config = ProcessorConfig::default();
        let table = orders().with_profiler_config(TableProfilerConfig::with_sample(10.0));
        assert_eq!(Sampler::profile_sample(&table, &config).unwrap(), Some(10.0));
        assert_eq!(Sampler::profile_sample(&orders(), &config).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_stored_sample_is_rejected() {
        let table = orders().with_profiler_config(TableProfilerConfig::with_sample(250.0));
        let err = Sampler::profile_sample(&table, &ProcessorConfig::default()).unwrap_err();
        assert!(matches!(err, ProfilerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_explicit_query_bypasses_percentage() {
        let catalog = InMemoryCatalog::new();
        let config = ProcessorConfig::default().with_table(
            TableProfileDef::new("db.sales.orders")
                .with_profile_sample(20.0)
                .with_profile_sample_query("SELECT * FROM orders WHERE id > 10"),
        );
        let spec = sampler().resolve(&orders(), &config, &catalog).await.unwrap();
        assert_eq!(
            spec,
            SamplingSpec::Query {
                query: "SELECT * FROM orders WHERE id > 10".to_string()
            }
        );
        assert_eq!(spec.profile_sample(), None);
    }

    #[tokio::test]
    async fn test_stored_query_ignored_when_record_exists() {
        let catalog = InMemoryCatalog::new();
        let table = orders().with_profiler_config(TableProfilerConfig {
            profile_sample: Some(40.0),
            profile_query: Some("SELECT 1".to_string()),
        });

        let spec = sampler()
            .resolve(&table, &ProcessorConfig::default(), &catalog)
            .await
            .unwrap();
        assert_eq!(spec.profile_query(), Some("SELECT 1"));

        let config =
            ProcessorConfig::default().with_table(TableProfileDef::new("db.sales.orders"));
        let spec = sampler().resolve(&table, &config, &catalog).await.unwrap();
        assert_eq!(spec, SamplingSpec::Percentage { percentage: 40.0 });
    }

    #[tokio::test]
    async fn test_clear_query_updates_catalog() {
        let catalog = InMemoryCatalog::new();
        let table = orders().with_profiler_config(TableProfilerConfig {
            profile_sample: Some(40.0),
            profile_query: Some("SELECT 1".to_string()),
        });
        let config = ProcessorConfig::default().with_table(
            TableProfileDef::new("db.sales.orders")
                .with_profile_sample_query("SELECT 2")
                .with_clear_sample_query(true),
        );

        let spec = sampler().resolve(&table, &config, &catalog).await.unwrap();
        assert_eq!(spec, SamplingSpec::Percentage { percentage: 40.0 });
        assert_eq!(
            catalog.sampling_config("db.sales.orders").await,
            Some(TableProfilerConfig::with_sample(40.0))
        );
    }

    #[tokio::test]
    async fn test_full_table_when_nothing_configured() {
        let catalog = InMemoryCatalog::new();
        let spec = sampler()
            .resolve(&orders(), &ProcessorConfig::default(), &catalog)
            .await
            .unwrap();
        assert_eq!(spec, SamplingSpec::Full);
    }

    #[test]
    fn test_partition_window_from_clock() {
        let partition = sampler().partition(&events(), None).unwrap().unwrap();
        assert_eq!(partition.field, "created_at");
        assert_eq!(
            partition.filter,
            PartitionFilter::Window {
                start: Utc.with_ymd_and_hms(2021, 7, 2, 12, 0, 0).unwrap(),
                end: now(),
            }
        );
    }

    #[test]
    fn test_partition_record_overrides() {
        let record = TableProfileDef::new("bq.analytics.events")
            .with_partition_field("event_date")
            .with_partition_query_duration(7);
        let partition = sampler().partition(&events(), Some(&record)).unwrap().unwrap();
        assert_eq!(partition.field, "event_date");
        match partition.filter {
            PartitionFilter::Window { start, end } => assert_eq!(end - start, TimeDelta::days(7)),
            other => panic!("expected a window, got {other:?}"),
        }

        let record = record.with_partition_values(vec![json!("2021-07-01"), json!("2021-07-02")]);
        let partition = sampler().partition(&events(), Some(&record)).unwrap().unwrap();
        assert!(matches!(
            partition.filter,
            PartitionFilter::Values { ref values } if values.len() == 2
        ));
    }

    #[test]
    fn test_partition_skipped_for_query_and_other_services() {
        let record =
            TableProfileDef::new("bq.analytics.events").with_profile_sample_query("SELECT 1");
        assert!(sampler().partition(&events(), Some(&record)).unwrap().is_none());

        let not_bigquery = events().with_service_type(ServiceType::Postgres);
        assert!(sampler().partition(&not_bigquery, None).unwrap().is_none());

        let unpartitioned = Table::new("bq.analytics.users", vec![])
            .with_service_type(ServiceType::BigQuery);
        assert!(sampler().partition(&unpartitioned, None).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_partition_window_is_a_configuration_error() {
        let catalog = InMemoryCatalog::new();
        let config = ProcessorConfig::default().with_table(
            TableProfileDef::new("bq.analytics.events").with_partition_query_duration(200_000_000),
        );
        assert!(config.validate().is_ok());

        let err = sampler()
            .resolve(&events(), &config, &catalog)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfilerError::Configuration(ref msg) if msg.contains("200000000")));
    }

    #[tokio::test]
    async fn test_query_and_partition_are_exclusive() {
        let catalog = InMemoryCatalog::new();
        let table = events().with_profiler_config(TableProfilerConfig::with_query("SELECT 1"));
        let spec = sampler()
            .resolve(&table, &ProcessorConfig::default(), &catalog)
            .await
            .unwrap();
        assert_eq!(spec.mode(), "query");
    }
}
