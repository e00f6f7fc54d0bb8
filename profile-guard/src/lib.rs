//! # Profile Guard - Table Profiling and Data Quality Tests
//!
//! Profile Guard computes statistical profiles of relational tables and
//! evaluates declarative data-quality tests against them. Queries run on
//! DataFusion; test suites, test cases and results are reconciled with a
//! metadata catalog.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use profile_guard::prelude::*;
//! use datafusion::prelude::SessionContext;
//! use std::sync::Arc;
//!
//! # async fn example() -> profile_guard::error::Result<()> {
//! let ctx = SessionContext::new();
//! // ... register the `orders` table ...
//!
//! let config = ProcessorConfig::from_json_str(r#"{
//!     "profiler": { "metrics": ["rowCount", "nullCount", "uniqueCount", "valuesCount"] },
//!     "testSuites": [{
//!         "name": "nightly",
//!         "testCases": [{
//!             "name": "orders_rows",
//!             "testDefinitionName": "tableRowCountToBeBetween",
//!             "fullyQualifiedName": "shop.sales.orders",
//!             "parameterValues": [
//!                 { "name": "minValue", "value": 10 },
//!                 { "name": "maxValue", "value": 1000 }
//!             ]
//!         }]
//!     }]
//! }"#)?;
//!
//! let engine = Arc::new(DataFusionEngine::new(ctx).with_table("shop.sales.orders", "orders"));
//! let catalog = Arc::new(InMemoryCatalog::with_builtin_definitions());
//!
//! let processor = ProfilerProcessor::new(config, engine, catalog.clone())?;
//! let mut workflow = Workflow::new(processor, CatalogSink::new(catalog));
//!
//! let table = Table::new(
//!     "shop.sales.orders",
//!     vec![Column::new("id", ColumnDataType::Bigint)],
//! );
//! let summary = workflow.run(&[table]).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! For every table:
//!
//! 1. the [`sampler`] picks exactly one sampling mode (explicit query,
//!    partition slice, percentage or the whole table)
//! 2. the [`profiler`] computes table and column metrics over the sample,
//!    each metric under its own time budget
//! 3. the [`validations`] evaluate the workflow and entity tests to
//!    Success, Failed or Aborted, each test identity at most once per run
//! 4. the [`processor`] bundles profile, results and sample rows into a
//!    [`crate::core::ProfilerResponse`] that the [`sink`] persists
//!
//! ## Architecture
//!
//! - **`core`**: data model shared by every stage
//! - **`engine`**: the query seam and its DataFusion implementation
//! - **`catalog`**: the metadata catalog seam and an in-memory catalog
//! - **`config`**: the workflow configuration surface
//! - **`workflow`**: the batch loop and the end-of-run summary

pub mod catalog;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod processor;
pub mod profiler;
pub mod sampler;
pub mod sink;
pub mod validations;
pub mod workflow;

#[cfg(test)]
pub mod test_helpers;
