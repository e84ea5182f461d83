use std::sync::Arc;

use common::time_util::format_epoch_as_utc_plus_2;
use parquet::schema::types::Type;

/// A single row exactly as it sits in a day's Parquet file: `date_time` and
/// `ts` already rendered to their on-disk string form.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub date_time: String,
    pub value: Option<f64>,
    pub ts: String,
}

impl StoredRow {
    pub fn from_collapsed(id: i64, row: &cdc_collapser::CollapsedRow) -> Self {
        StoredRow {
            id,
            date_time: row.date_time.clone(),
            value: row.value,
            ts: format_epoch_as_utc_plus_2(row.ts),
        }
    }
}

/// The fixed on-disk schema for every day file: `id` and `date_time` and
/// `ts` are always present, `value` may be null.
pub fn day_file_schema() -> Arc<Type> {
    let message_type = "
        message day_row {
            REQUIRED INT64 id;
            REQUIRED BYTE_ARRAY date_time (UTF8);
            OPTIONAL DOUBLE value;
            REQUIRED BYTE_ARRAY ts (UTF8);
        }
    ";
    Arc::new(
        parquet::schema::parser::parse_message_type(message_type)
            .expect("day_row schema is a fixed, compile-time-valid literal"),
    )
}
