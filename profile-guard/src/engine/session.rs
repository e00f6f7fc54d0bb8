//! [`QueryEngine`] backed by a DataFusion [`SessionContext`].

use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use async_trait::async_trait;
use datafusion::common::TableReference;
use datafusion::error::DataFusionError;
use datafusion::prelude::*;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument};

use super::{MetricRequest, QueryEngine, SampleHandle, TableHandle};
use crate::core::{Table, TableData};
use crate::error::{ProfilerError, Result};
use crate::profiler::Metric;
use crate::sampler::{PartitionFilter, PartitionSpec, SamplingSpec};

const ROW_NUMBER_COLUMN: &str = "__pg_rn";

/// Runs profiling queries in-process with DataFusion.
///
/// Tables are looked up in the session by the relation name they were
/// registered under. Unless mapped with [`DataFusionEngine::with_table`], a
/// table's relation is the last segment of its fully qualified name.
///
/// ```rust,ignore
/// let ctx = SessionContext::new();
/// ctx.register_table("orders", Arc::new(mem_table))?;
///
/// let engine = DataFusionEngine::new(ctx)
///     .with_table("mysql.shop.sales.orders", "orders");
/// ```
#[derive(Clone)]
pub struct DataFusionEngine {
    ctx: SessionContext,
    relations: HashMap<String, String>,
}

impl fmt::Debug for DataFusionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionEngine")
            .field("session_id", &self.ctx.session_id())
            .field("relations", &self.relations)
            .finish()
    }
}

impl DataFusionEngine {
    /// Creates an engine over an existing session.
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            relations: HashMap::new(),
        }
    }

    /// Maps a table's fully qualified name to a registered relation.
    pub fn with_table(
        mut self,
        table_fqn: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        self.relations.insert(table_fqn.into(), relation.into());
        self
    }

    /// The underlying session.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn sample_sql(handle: &TableHandle, sampling: &SamplingSpec) -> Option<String> {
        let relation = quote_ident(&handle.relation);
        match sampling {
            SamplingSpec::Full => None,
            SamplingSpec::Query { query } => Some(query.clone()),
            SamplingSpec::Percentage { percentage } => {
                let columns = handle
                    .columns
                    .iter()
                    .map(|c| quote_ident(&c.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                // Without known columns rows are numbered in scan order
                let (projection, window) = if columns.is_empty() {
                    ("*".to_string(), "OVER ()".to_string())
                } else {
                    (columns.clone(), format!("OVER (ORDER BY {columns})"))
                };
                let rn = quote_ident(ROW_NUMBER_COLUMN);
                let numbered = format!(
                    "SELECT *, CAST(row_number() {window} AS DOUBLE) AS {rn} FROM {relation}"
                );
                // Keeps exactly floor(n * p / 100) rows, spread evenly
                Some(format!(
                    "SELECT {projection} FROM ({numbered}) AS numbered \
                     WHERE floor({rn} * {percentage} / 100.0) > \
                     floor(({rn} - 1) * {percentage} / 100.0)"
                ))
            }
            SamplingSpec::Partition(PartitionSpec { field, filter }) => {
                let field = quote_ident(field);
                let predicate = match filter {
                    PartitionFilter::Window { start, end } => format!(
                        "{field} >= CAST('{}' AS TIMESTAMP) AND {field} < CAST('{}' AS TIMESTAMP)",
                        start.format("%Y-%m-%d %H:%M:%S"),
                        end.format("%Y-%m-%d %H:%M:%S")
                    ),
                    PartitionFilter::Values { values } => format!(
                        "{field} IN ({})",
                        values.iter().map(sql_literal).collect::<Vec<_>>().join(", ")
                    ),
                };
                Some(format!("SELECT * FROM {relation} WHERE {predicate}"))
            }
        }
    }

    fn metric_sql(relation: &str, request: &MetricRequest) -> Result<String> {
        let relation = quote_ident(relation);
        if request.metric == Metric::RowCount {
            return Ok(format!("SELECT CAST(COUNT(*) AS DOUBLE) FROM {relation}"));
        }

        let column = request.column.as_deref().ok_or_else(|| {
            ProfilerError::Internal(format!("metric {} needs a column", request.metric))
        })?;
        let col = quote_ident(column);
        let aggregate = match request.metric {
            Metric::ValuesCount => format!("COUNT({col})"),
            Metric::NullCount => format!("COUNT(*) - COUNT({col})"),
            Metric::DistinctCount => format!("COUNT(DISTINCT {col})"),
            Metric::UniqueCount => {
                return Ok(format!(
                    "SELECT CAST(COUNT(*) AS DOUBLE) FROM \
                     (SELECT {col} FROM {relation} WHERE {col} IS NOT NULL GROUP BY {col} HAVING COUNT(*) = 1) AS singles"
                ));
            }
            Metric::Min => format!("MIN(CAST({col} AS DOUBLE))"),
            Metric::Max => format!("MAX(CAST({col} AS DOUBLE))"),
            Metric::Mean => format!("AVG(CAST({col} AS DOUBLE))"),
            Metric::Sum => format!("SUM(CAST({col} AS DOUBLE))"),
            Metric::Stddev => format!("STDDEV_POP(CAST({col} AS DOUBLE))"),
            Metric::MinLength => format!("MIN(character_length(CAST({col} AS VARCHAR)))"),
            Metric::MaxLength => format!("MAX(character_length(CAST({col} AS VARCHAR)))"),
            Metric::MeanLength => format!("AVG(character_length(CAST({col} AS VARCHAR)))"),
            other => {
                return Err(ProfilerError::Internal(format!(
                    "metric {other} is not computed by a query"
                )))
            }
        };
        Ok(format!("SELECT CAST({aggregate} AS DOUBLE) FROM {relation}"))
    }

    fn sample_relation(relation: &str) -> String {
        format!("__sample_{relation}")
    }
}

#[async_trait]
impl QueryEngine for DataFusionEngine {
    #[instrument(skip(self, table), fields(table = %table.fully_qualified_name))]
    async fn resolve(&self, table: &Table) -> Result<TableHandle> {
        let relation = self
            .relations
            .get(&table.fully_qualified_name)
            .cloned()
            .unwrap_or_else(|| table.name().to_string());

        if !self.ctx.table_exist(TableReference::bare(relation.clone()))? {
            return Err(ProfilerError::catalog_lookup(
                "table",
                &table.fully_qualified_name,
                format!("relation '{relation}' is not registered in the session"),
            ));
        }

        Ok(TableHandle {
            table_fqn: table.fully_qualified_name.clone(),
            relation,
            columns: table.columns.clone(),
        })
    }

    #[instrument(skip(self, table), fields(table = %table.table_fqn, mode = sampling.mode()))]
    async fn prepare_sample(
        &self,
        table: &TableHandle,
        sampling: &SamplingSpec,
    ) -> Result<SampleHandle> {
        let Some(sql) = Self::sample_sql(table, sampling) else {
            return Ok(SampleHandle::unsampled(table));
        };
        debug!(sql = %sql, "Preparing sample");

        let fetch =
            |e: DataFusionError| ProfilerError::sample_fetch(&table.table_fqn, e.to_string());
        // Materialized: execution errors surface here and all metrics read the same rows
        let df = self.ctx.sql(&sql).await.map_err(fetch)?;
        let df = df.cache().await.map_err(fetch)?;

        let relation = Self::sample_relation(&table.relation);
        self.ctx
            .deregister_table(TableReference::bare(relation.clone()))?;
        self.ctx
            .register_table(TableReference::bare(relation.clone()), df.into_view())?;

        Ok(SampleHandle {
            table_fqn: table.table_fqn.clone(),
            relation,
            columns: table.columns.clone(),
        })
    }

    #[instrument(skip(self, sample), fields(table = %sample.table_fqn, metric = %request.key()))]
    async fn compute(
        &self,
        sample: &SampleHandle,
        request: &MetricRequest,
    ) -> Result<Option<f64>> {
        if request.metric == Metric::ColumnCount {
            return Ok(Some(sample.columns.len() as f64));
        }

        let sql = Self::metric_sql(&sample.relation, request)?;
        let batches = self.ctx.sql(&sql).await?.collect().await?;
        first_scalar(&batches)
    }

    #[instrument(skip(self, sample), fields(table = %sample.table_fqn))]
    async fn fetch_rows(&self, sample: &SampleHandle, limit: usize) -> Result<TableData> {
        let sql = format!("SELECT * FROM {} LIMIT {limit}", quote_ident(&sample.relation));
        let fetch =
            |e: &dyn fmt::Display| ProfilerError::sample_fetch(&sample.table_fqn, e.to_string());

        let df = self.ctx.sql(&sql).await.map_err(|e| fetch(&e))?;
        let columns = df
            .schema()
            .fields()
            .iter()
            .filter(|f| f.name() != ROW_NUMBER_COLUMN)
            .map(|f| f.name().clone())
            .collect::<Vec<_>>();
        let batches = df.collect().await.map_err(|e| fetch(&e))?;

        let mut rows = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                let mut values = Vec::with_capacity(columns.len());
                for (index, field) in batch.schema().fields().iter().enumerate() {
                    if field.name() == ROW_NUMBER_COLUMN {
                        continue;
                    }
                    let array = batch.column(index);
                    if array.is_null(row) {
                        values.push(None);
                    } else {
                        let value = array_value_to_string(array, row).map_err(|e| fetch(&e))?;
                        values.push(Some(value));
                    }
                }
                rows.push(values);
            }
        }

        Ok(TableData { columns, rows })
    }
}

/// Reads the first column of the first row as a float.
fn first_scalar(batches: &[RecordBatch]) -> Result<Option<f64>> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };
    let values = cast(batch.column(0), &DataType::Float64)?;
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ProfilerError::Internal("Expected Float64 array for metric".to_string()))?;

    if values.is_null(0) {
        Ok(None)
    } else {
        Ok(Some(values.value(0)))
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn sql_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnDataType};
    use crate::test_helpers::orders_context;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    async fn engine() -> DataFusionEngine {
        DataFusionEngine::new(orders_context().await).with_table("shop.sales.orders", "orders")
    }

    fn orders_table() -> Table {
        Table::new(
            "shop.sales.orders",
            vec![
                Column::new("id", ColumnDataType::Bigint),
                Column::new("customer", ColumnDataType::Varchar),
                Column::new("amount", ColumnDataType::Double),
                Column::new("created_at", ColumnDataType::Timestamp),
            ],
        )
    }

    async fn compute(
        engine: &DataFusionEngine,
        sample: &SampleHandle,
        metric: Metric,
        column: &str,
    ) -> Option<f64> {
        engine
            .compute(sample, &MetricRequest::column(metric, column))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_unknown_relation() {
        let engine = engine().await;
        let err = engine
            .resolve(&Table::new("shop.sales.missing", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfilerError::CatalogLookup { .. }));
    }

    #[tokio::test]
    async fn test_full_table_metrics() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let sample = engine.prepare_sample(&handle, &SamplingSpec::Full).await.unwrap();
        assert_eq!(sample.relation, "orders");

        let rows = engine
            .compute(&sample, &MetricRequest::table(Metric::RowCount))
            .await
            .unwrap();
        assert_eq!(rows, Some(10.0));
        let columns = engine
            .compute(&sample, &MetricRequest::table(Metric::ColumnCount))
            .await
            .unwrap();
        assert_eq!(columns, Some(4.0));

        assert_eq!(compute(&engine, &sample, Metric::ValuesCount, "customer").await, Some(8.0));
        assert_eq!(compute(&engine, &sample, Metric::NullCount, "customer").await, Some(2.0));
        assert_eq!(compute(&engine, &sample, Metric::DistinctCount, "customer").await, Some(5.0));
        assert_eq!(compute(&engine, &sample, Metric::UniqueCount, "customer").await, Some(3.0));
        assert_eq!(compute(&engine, &sample, Metric::Min, "id").await, Some(1.0));
        assert_eq!(compute(&engine, &sample, Metric::Max, "id").await, Some(10.0));
        assert_eq!(compute(&engine, &sample, Metric::Sum, "id").await, Some(55.0));
        assert_eq!(compute(&engine, &sample, Metric::Mean, "id").await, Some(5.5));
        assert_eq!(compute(&engine, &sample, Metric::MinLength, "customer").await, Some(3.0));
        assert_eq!(compute(&engine, &sample, Metric::MaxLength, "customer").await, Some(7.0));
    }

    #[tokio::test]
    async fn test_aggregate_over_all_nulls_is_absent() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let sample = engine
            .prepare_sample(&handle, &SamplingSpec::Query {
                query: "SELECT * FROM orders WHERE customer IS NULL".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(compute(&engine, &sample, Metric::MaxLength, "customer").await, None);
        assert_eq!(compute(&engine, &sample, Metric::ValuesCount, "customer").await, Some(0.0));
    }

    #[tokio::test]
    async fn test_percentage_sample_is_deterministic() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let spec = SamplingSpec::Percentage { percentage: 50.0 };

        let first = engine.prepare_sample(&handle, &spec).await.unwrap();
        let rows = engine
            .compute(&first, &MetricRequest::table(Metric::RowCount))
            .await
            .unwrap();
        assert_eq!(rows, Some(5.0));

        let second = engine.prepare_sample(&handle, &spec).await.unwrap();
        let again = engine
            .compute(&second, &MetricRequest::table(Metric::RowCount))
            .await
            .unwrap();
        assert_eq!(rows, again);
    }

    #[tokio::test]
    async fn test_partition_window_sample() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let spec = SamplingSpec::Partition(PartitionSpec {
            field: "created_at".to_string(),
            filter: PartitionFilter::Window {
                start: Utc.with_ymd_and_hms(2021, 7, 2, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2021, 7, 3, 0, 0, 0).unwrap(),
            },
        });
        let sample = engine.prepare_sample(&handle, &spec).await.unwrap();
        let rows = engine
            .compute(&sample, &MetricRequest::table(Metric::RowCount))
            .await
            .unwrap();
        assert_eq!(rows, Some(5.0));
    }

    #[tokio::test]
    async fn test_partition_values_sample() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let spec = SamplingSpec::Partition(PartitionSpec {
            field: "customer".to_string(),
            filter: PartitionFilter::Values {
                values: vec![json!("alice"), json!("o'brien")],
            },
        });
        let sample = engine.prepare_sample(&handle, &spec).await.unwrap();
        let rows = engine
            .compute(&sample, &MetricRequest::table(Metric::RowCount))
            .await
            .unwrap();
        assert_eq!(rows, Some(4.0));
    }

    #[tokio::test]
    async fn test_invalid_query_is_sample_fetch_error() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let err = engine
            .prepare_sample(&handle, &SamplingSpec::Query {
                query: "SELECT * FROM nowhere".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::SampleFetch { ref table, .. } if table == "shop.sales.orders"
        ));
    }

    #[tokio::test]
    async fn test_query_failing_at_execution_is_sample_fetch_error() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let err = engine
            .prepare_sample(&handle, &SamplingSpec::Query {
                query: "SELECT * FROM orders WHERE CAST(customer AS BIGINT) > 0".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProfilerError::SampleFetch { .. }));
        assert!(!engine.context().table_exist("__sample_orders").unwrap());
    }

    #[tokio::test]
    async fn test_percentage_sample_follows_column_order() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let spec = SamplingSpec::Percentage { percentage: 50.0 };
        let sample = engine.prepare_sample(&handle, &spec).await.unwrap();

        // rows are numbered by (id, ...), so every second id is kept
        let data = engine.fetch_rows(&sample, 10).await.unwrap();
        let mut ids: Vec<i64> = data
            .rows
            .iter()
            .map(|row| row[0].as_deref().unwrap().parse().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_fetch_rows() {
        let engine = engine().await;
        let handle = engine.resolve(&orders_table()).await.unwrap();
        let sample = engine.prepare_sample(&handle, &SamplingSpec::Full).await.unwrap();

        let data = engine.fetch_rows(&sample, 3).await.unwrap();
        assert_eq!(data.columns, vec!["id", "customer", "amount", "created_at"]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.rows[0][0].as_deref(), Some("1"));
        assert_eq!(data.rows[0][1].as_deref(), Some("alice"));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(sql_literal(&json!("o'brien")), "'o''brien'");
        assert_eq!(sql_literal(&json!(42)), "42");
        assert_eq!(sql_literal(&json!(true)), "TRUE");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
