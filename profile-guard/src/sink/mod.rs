//! Persistence of processor responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::catalog::CatalogClient;
use crate::core::{ProfilerResponse, TableProfilerConfig};
use crate::error::{ProfilerError, Result};

/// Records written and failed by a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStatus {
    /// `Table: <fqn>` for every persisted response
    pub records_written: Vec<String>,
    pub failures: Vec<String>,
}

impl SinkStatus {
    pub fn records_written(&mut self, record: impl Into<String>) {
        self.records_written.push(record.into());
    }

    pub fn failure(&mut self, record: impl Into<String>) {
        self.failures.push(record.into());
    }
}

/// Consumer of [`ProfilerResponse`]s.
#[async_trait]
pub trait Sink: Send {
    /// Persists one response. Fails with `SinkPersist`.
    async fn write_record(&mut self, record: &ProfilerResponse) -> Result<()>;

    fn status(&self) -> &SinkStatus;
}

/// Writes responses back to the catalog.
///
/// For each table the profile is stored first, then the sampling
/// configuration the profile was computed with, then every test result and
/// finally the sample rows.
pub struct CatalogSink {
    catalog: Arc<dyn CatalogClient>,
    status: SinkStatus,
}

impl CatalogSink {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            catalog,
            status: SinkStatus::default(),
        }
    }

    async fn persist(&self, record: &ProfilerResponse) -> Result<()> {
        let fqn = record.table.fully_qualified_name.as_str();
        let profile = &record.profile;

        self.catalog.persist_profile(fqn, profile).await?;

        if profile.profile_sample.is_some() || profile.profile_query.is_some() {
            let config = TableProfilerConfig {
                profile_sample: profile.profile_sample,
                profile_query: profile.profile_query.clone(),
            };
            self.catalog.update_table_sampling_config(fqn, &config).await?;
        }

        for outcome in &record.test_results {
            self.catalog
                .persist_test_result(&outcome.test_case_fqn, &outcome.result)
                .await?;
        }

        if let Some(sample) = &record.sample_data {
            debug!(rows = sample.len(), "Persisting sample data");
            self.catalog.persist_sample(fqn, sample).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for CatalogSink {
    #[instrument(skip_all, fields(table = %record.table.fully_qualified_name))]
    async fn write_record(&mut self, record: &ProfilerResponse) -> Result<()> {
        let fqn = &record.table.fully_qualified_name;
        match self.persist(record).await {
            Ok(()) => {
                info!("Successfully ingested profiler & test data for {fqn}");
                self.status.records_written(format!("Table: {fqn}"));
                Ok(())
            }
            Err(err) => {
                error!("Failed to sink profiler & test data for {fqn} - {err}");
                self.status.failure(format!("Table: {fqn}"));
                Err(ProfilerError::sink_persist(fqn, err.to_string()))
            }
        }
    }

    fn status(&self) -> &SinkStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogOperation, InMemoryCatalog};
    use crate::core::{
        Column, ColumnDataType, Table, TableData, TableProfile, TestCaseOutcome, TestCaseResult,
    };
    use chrono::Utc;

    fn response(profile: TableProfile) -> ProfilerResponse {
        let now = profile.timestamp;
        ProfilerResponse {
            table: Table::new(
                "shop.sales.orders",
                vec![Column::new("id", ColumnDataType::Int)],
            ),
            profile,
            test_results: vec![TestCaseOutcome {
                test_case_fqn: "shop.sales.orders.orders_rows".to_string(),
                result: TestCaseResult::success(now, "Found 10.0 rows vs. the expected 10"),
            }],
            sample_data: Some(TableData {
                columns: vec!["id".to_string()],
                rows: vec![vec![Some("1".to_string())]],
            }),
        }
    }

    #[tokio::test]
    async fn test_everything_is_persisted() {
        let catalog = InMemoryCatalog::new();
        let mut sink = CatalogSink::new(Arc::new(catalog.clone()));
        let mut profile = TableProfile::new(Utc::now()).with_row_count(10.0);
        profile.profile_sample = Some(50.0);

        sink.write_record(&response(profile)).await.unwrap();

        assert_eq!(catalog.profiles("shop.sales.orders").await.len(), 1);
        assert_eq!(
            catalog.test_results("shop.sales.orders.orders_rows").await.len(),
            1
        );
        assert_eq!(catalog.sample("shop.sales.orders").await.unwrap().len(), 1);
        assert_eq!(
            catalog.sampling_config("shop.sales.orders").await,
            Some(TableProfilerConfig::with_sample(50.0))
        );
        assert_eq!(sink.status().records_written, vec!["Table: shop.sales.orders"]);
    }

    #[tokio::test]
    async fn test_unsampled_profile_leaves_sampling_config_alone() {
        let catalog = InMemoryCatalog::new();
        let mut sink = CatalogSink::new(Arc::new(catalog.clone()));

        sink.write_record(&response(TableProfile::new(Utc::now())))
            .await
            .unwrap();

        assert_eq!(catalog.sampling_config("shop.sales.orders").await, None);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let catalog = InMemoryCatalog::new();
        catalog.fail_on(CatalogOperation::PersistTestResult).await;
        let mut sink = CatalogSink::new(Arc::new(catalog.clone()));

        let err = sink
            .write_record(&response(TableProfile::new(Utc::now())))
            .await
            .unwrap_err();

        assert!(matches!(err, ProfilerError::SinkPersist { .. }));
        assert!(sink.status().records_written.is_empty());
        assert_eq!(sink.status().failures, vec!["Table: shop.sales.orders"]);
        // earlier writes are not rolled back
        assert_eq!(catalog.profiles("shop.sales.orders").await.len(), 1);
    }
}
