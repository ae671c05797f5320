//! SQLite value binding and decoding.
//!
//! SQLite stores everything with one of five affinities (INTEGER, REAL,
//! TEXT, BLOB, NULL), so richer types travel as text: decimals, UUIDs, and
//! JSON are bound as strings and recovered by declared column type on the
//! way out.

use std::sync::Arc;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};

use crate::traits::{ColumnInfo, Row, SqlType, Value};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind one value onto a query, widening to SQLite's storage classes.
pub(crate) fn bind_value(query: SqliteQuery<'_>, sql_type: SqlType, value: Value) -> SqliteQuery<'_> {
    match value {
        Value::Null => bind_null(query, sql_type),
        Value::Bool(v) => query.bind(v),
        Value::Int16(v) => query.bind(i64::from(v)),
        Value::Int32(v) => query.bind(i64::from(v)),
        Value::Int64(v) => query.bind(v),
        Value::UInt32(v) => query.bind(i64::from(v)),
        Value::UInt64(v) => query.bind(v as i64),
        Value::Float32(v) => query.bind(f64::from(v)),
        Value::Float64(v) => query.bind(v),
        Value::Decimal(d) => query.bind(d.to_string()),
        Value::Text(s) => query.bind(s),
        Value::Bytes(b) => query.bind(b),
        Value::Date(d) => query.bind(d),
        Value::Time(t) => query.bind(t),
        Value::DateTime(dt) => query.bind(dt),
        Value::DateTimeTz(dt) => query.bind(dt),
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j.to_string()),
    }
}

fn bind_null(query: SqliteQuery<'_>, sql_type: SqlType) -> SqliteQuery<'_> {
    match sql_type {
        SqlType::Bool
        | SqlType::TinyInt
        | SqlType::SmallInt
        | SqlType::Int
        | SqlType::BigInt => query.bind(None::<i64>),
        SqlType::Real | SqlType::Double => query.bind(None::<f64>),
        SqlType::Binary => query.bind(None::<Vec<u8>>),
        _ => query.bind(None::<String>),
    }
}

/// Build column metadata from a native row.
pub(crate) fn column_info(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnInfo::new(col.name(), col.type_info().name(), idx))
        .collect()
}

/// Convert a native row into the unified row shape.
pub(crate) fn convert_row(columns: Arc<Vec<ColumnInfo>>, row: &SqliteRow) -> Row {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_value(row, idx, col.type_info().name()))
        .collect();
    Row::new(columns, values)
}

fn decode_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    match type_name.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "BIGINT" | "INT2" | "INT8"
        | "UNSIGNED BIG INT" => row
            .try_get::<i64, _>(index)
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .or_else(|_| row.try_get::<i64, _>(index).map(|v| Value::Bool(v != 0)))
            .unwrap_or(Value::Null),
        "REAL" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => row
            .try_get::<f64, _>(index)
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "VARYING CHARACTER" | "NCHAR" | "NVARCHAR" | "CHARACTER" | "CHAR"
        | "CLOB" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),
        "BLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        "DATE" => decode_text_as(row, index, |s| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .ok()
        }),
        "TIME" => decode_text_as(row, index, |s| {
            chrono::NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map(Value::Time)
                .ok()
        }),
        "DATETIME" | "TIMESTAMP" => decode_text_as(row, index, |s| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(Value::DateTime)
                .ok()
        }),
        "NUMERIC" | "DECIMAL" => {
            if let Ok(s) = row.try_get::<String, _>(index) {
                s.trim()
                    .parse::<rust_decimal::Decimal>()
                    .map(Value::Decimal)
                    .unwrap_or(Value::Text(s))
            } else if let Ok(v) = row.try_get::<f64, _>(index) {
                Value::Float64(v)
            } else {
                Value::Null
            }
        }
        _ => decode_unknown(row, index),
    }
}

// Column type names from expressions are often empty in SQLite, so walk the
// storage classes until one decodes.
fn decode_unknown(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int64(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float64(v);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::Bytes(v);
    }
    Value::Null
}

fn decode_text_as(
    row: &SqliteRow,
    index: usize,
    parse: impl Fn(&str) -> Option<Value>,
) -> Value {
    match row.try_get::<String, _>(index) {
        Ok(s) => parse(s.trim()).unwrap_or(Value::Text(s)),
        Err(_) => Value::Null,
    }
}
