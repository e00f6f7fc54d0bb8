//! In-memory tables shared by unit tests.

use arrow::array::{Float64Array, Int64Array, StringArray, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{TimeZone, Utc};
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

fn nanos(day: u32, hour: u32) -> i64 {
    Utc.with_ymd_and_hms(2021, 7, day, hour, 0, 0)
        .unwrap()
        .timestamp_nanos_opt()
        .unwrap()
}

/// Registers `orders` with ten rows:
///
/// - `id` 1..=10
/// - `customer` with two nulls, five distinct values, three of them unique
/// - `amount` with one null
/// - `created_at`, five rows on 2021-07-02 and five on 2021-07-01
pub async fn orders_context() -> SessionContext {
    let ctx = SessionContext::new();

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("customer", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, true),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from((1..=10).collect::<Vec<i64>>())),
            Arc::new(StringArray::from(vec![
                Some("alice"),
                Some("bob"),
                Some("alice"),
                Some("carol"),
                None,
                Some("bob"),
                Some("o'brien"),
                Some("alice"),
                None,
                Some("dave"),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(12.5),
                Some(40.0),
                Some(7.25),
                None,
                Some(99.0),
                Some(15.0),
                Some(3.5),
                Some(61.0),
                Some(20.0),
                Some(8.75),
            ])),
            Arc::new(TimestampNanosecondArray::from(vec![
                nanos(2, 1),
                nanos(2, 4),
                nanos(2, 9),
                nanos(2, 15),
                nanos(2, 23),
                nanos(1, 1),
                nanos(1, 4),
                nanos(1, 9),
                nanos(1, 15),
                nanos(1, 23),
            ])),
        ],
    )
    .unwrap();

    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table("orders", Arc::new(table)).unwrap();
    ctx
}
