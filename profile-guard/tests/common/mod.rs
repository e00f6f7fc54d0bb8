//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use arrow::array::{Int64Array, StringArray, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone, Utc};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

use profile_guard::prelude::*;

pub const USERS: &str = "warehouse.crm.users";
pub const VISITS: &str = "warehouse.web.visits";
pub const EVENTS: &str = "bq.analytics.events";

/// The instant every test runs "at".
pub fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 2, 12, 0, 0).unwrap()
}

fn nanos(day: u32, hour: u32) -> i64 {
    Utc.with_ymd_and_hms(2021, 7, day, hour, 0, 0)
        .unwrap()
        .timestamp_nanos_opt()
        .unwrap()
}

/// Session with three relations:
///
/// - `users`: 100 rows, `id` 1..=100, `score` cycling 1, 2, 3, `email` never null
/// - `visits`: 10 rows, `visitor` with 5 values seen exactly once
/// - `events`: 6 rows, 3 of them in `[2021-07-01 12:00, 2021-07-02 12:00)`
pub async fn warehouse_context() -> SessionContext {
    let ctx = SessionContext::new();

    let users = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("score", DataType::Int64, false),
        Field::new("email", DataType::Utf8, false),
    ]));
    let emails: Vec<String> = (1..=100).map(|i| format!("user{i}@example.com")).collect();
    let batch = RecordBatch::try_new(
        users.clone(),
        vec![
            Arc::new(Int64Array::from((1..=100).collect::<Vec<i64>>())),
            Arc::new(Int64Array::from(
                (0..100).map(|i| i % 3 + 1).collect::<Vec<i64>>(),
            )),
            Arc::new(StringArray::from(emails)),
        ],
    )
    .unwrap();
    ctx.register_table(
        "users",
        Arc::new(MemTable::try_new(users, vec![vec![batch]]).unwrap()),
    )
    .unwrap();

    let visits = Arc::new(Schema::new(vec![Field::new("visitor", DataType::Utf8, true)]));
    let batch = RecordBatch::try_new(
        visits.clone(),
        vec![Arc::new(StringArray::from(vec![
            "ann", "ann", "ben", "ben", "cy", "dee", "eve", "fay", "gus", "ann",
        ]))],
    )
    .unwrap();
    ctx.register_table(
        "visits",
        Arc::new(MemTable::try_new(visits, vec![vec![batch]]).unwrap()),
    )
    .unwrap();

    let events = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
    ]));
    let batch = RecordBatch::try_new(
        events.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6])),
            Arc::new(TimestampNanosecondArray::from(vec![
                nanos(1, 6),
                nanos(1, 18),
                nanos(2, 3),
                nanos(2, 11),
                nanos(2, 13),
                nanos(3, 1),
            ])),
        ],
    )
    .unwrap();
    ctx.register_table(
        "events",
        Arc::new(MemTable::try_new(events, vec![vec![batch]]).unwrap()),
    )
    .unwrap();

    ctx
}

pub fn users() -> Table {
    Table::new(
        USERS,
        vec![
            Column::new("id", ColumnDataType::Bigint),
            Column::new("score", ColumnDataType::Int),
            Column::new("email", ColumnDataType::Varchar),
        ],
    )
}

pub fn visits() -> Table {
    Table::new(VISITS, vec![Column::new("visitor", ColumnDataType::Varchar)])
}

pub fn events() -> Table {
    Table::new(
        EVENTS,
        vec![
            Column::new("id", ColumnDataType::Bigint),
            Column::new("created_at", ColumnDataType::Timestamp),
        ],
    )
    .with_service_type(ServiceType::BigQuery)
    .with_partition(vec!["created_at".to_string()])
}

pub async fn engine() -> Arc<DataFusionEngine> {
    Arc::new(
        DataFusionEngine::new(warehouse_context().await)
            .with_table(USERS, "users")
            .with_table(VISITS, "visits")
            .with_table(EVENTS, "events"),
    )
}

/// A processor over the warehouse fixtures with the clock frozen at [`run_time`].
pub async fn processor(config: ProcessorConfig, catalog: &InMemoryCatalog) -> ProfilerProcessor {
    ProfilerProcessor::new(config, engine().await, Arc::new(catalog.clone()))
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(run_time())))
}

pub fn test_case(
    name: &str,
    definition: &str,
    table: &str,
    column: Option<&str>,
    params: Vec<(&str, serde_json::Value)>,
) -> TestCaseDef {
    TestCaseDef {
        name: name.to_string(),
        description: None,
        test_definition_name: definition.to_string(),
        fully_qualified_name: table.to_string(),
        column_name: column.map(str::to_string),
        parameter_values: params
            .into_iter()
            .map(|(name, value)| profile_guard::core::TestCaseParameterValue::new(name, value))
            .collect(),
    }
}

pub fn suite(name: &str, cases: Vec<TestCaseDef>) -> TestSuiteDef {
    TestSuiteDef {
        name: name.to_string(),
        description: None,
        schedule_interval: None,
        test_cases: cases,
    }
}
