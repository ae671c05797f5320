//! PostgreSQL value binding and decoding.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow, PgSslMode};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::traits::{ColumnInfo, Row, SqlType, SslMode, Value};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Map the generic SSL mode onto the native option.
pub(crate) fn map_ssl_mode(mode: &SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Bind one value onto a query.
///
/// NULLs are bound through a typed `Option` so the server sees the intended
/// parameter type instead of inferring text.
pub(crate) fn bind_value(query: PgQuery<'_>, sql_type: SqlType, value: Value) -> PgQuery<'_> {
    match value {
        Value::Null => bind_null(query, sql_type),
        Value::Bool(v) => query.bind(v),
        Value::Int16(v) => query.bind(v),
        Value::Int32(v) => query.bind(v),
        Value::Int64(v) => query.bind(v),
        Value::UInt32(v) => query.bind(i64::from(v)),
        Value::UInt64(v) => query.bind(v as i64),
        Value::Float32(v) => query.bind(v),
        Value::Float64(v) => query.bind(v),
        Value::Decimal(d) => query.bind(d),
        Value::Text(s) => query.bind(s),
        Value::Bytes(b) => query.bind(b),
        Value::Date(d) => query.bind(d),
        Value::Time(t) => query.bind(t),
        Value::DateTime(dt) => query.bind(dt),
        Value::DateTimeTz(dt) => query.bind(dt),
        Value::Uuid(u) => query.bind(u),
        Value::Json(j) => query.bind(j),
    }
}

fn bind_null(query: PgQuery<'_>, sql_type: SqlType) -> PgQuery<'_> {
    match sql_type {
        SqlType::Bool => query.bind(None::<bool>),
        SqlType::TinyInt | SqlType::SmallInt => query.bind(None::<i16>),
        SqlType::Int => query.bind(None::<i32>),
        SqlType::BigInt => query.bind(None::<i64>),
        SqlType::Real => query.bind(None::<f32>),
        SqlType::Double => query.bind(None::<f64>),
        SqlType::Decimal => query.bind(None::<Decimal>),
        SqlType::Binary => query.bind(None::<Vec<u8>>),
        SqlType::Date => query.bind(None::<NaiveDate>),
        SqlType::Time => query.bind(None::<NaiveTime>),
        SqlType::DateTime => query.bind(None::<NaiveDateTime>),
        SqlType::TimestampTz => query.bind(None::<DateTime<Utc>>),
        SqlType::Uuid => query.bind(None::<Uuid>),
        SqlType::Json => query.bind(None::<serde_json::Value>),
        SqlType::VarChar | SqlType::Text => query.bind(None::<String>),
    }
}

/// Build column metadata from a native row.
pub(crate) fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnInfo::new(col.name(), col.type_info().name(), idx))
        .collect()
}

/// Convert a native row into the unified row shape.
pub(crate) fn convert_row(columns: Arc<Vec<ColumnInfo>>, row: &PgRow) -> Row {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_value(row, idx, col.type_info().name()))
        .collect();
    Row::new(columns, values)
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    match type_name {
        "BOOL" => decode_as::<bool>(row, index, Value::Bool),
        "INT2" => decode_as::<i16>(row, index, Value::Int16),
        "INT4" => decode_as::<i32>(row, index, Value::Int32),
        "INT8" => decode_as::<i64>(row, index, Value::Int64),
        "FLOAT4" => decode_as::<f32>(row, index, Value::Float32),
        "FLOAT8" => decode_as::<f64>(row, index, Value::Float64),
        "NUMERIC" => decode_as::<Decimal>(row, index, Value::Decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            decode_as::<String>(row, index, Value::Text)
        }
        "BYTEA" => decode_as::<Vec<u8>>(row, index, Value::Bytes),
        "DATE" => decode_as::<NaiveDate>(row, index, Value::Date),
        "TIME" => decode_as::<NaiveTime>(row, index, Value::Time),
        "TIMESTAMP" => decode_as::<NaiveDateTime>(row, index, Value::DateTime),
        "TIMESTAMPTZ" => decode_as::<DateTime<Utc>>(row, index, Value::DateTimeTz),
        "UUID" => decode_as::<Uuid>(row, index, Value::Uuid),
        "JSON" | "JSONB" => decode_as::<serde_json::Value>(row, index, Value::Json),
        _ => decode_unknown(row, index),
    }
}

fn decode_as<'r, T>(row: &'r PgRow, index: usize, wrap: impl Fn(T) -> Value) -> Value
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(index).map(wrap).unwrap_or(Value::Null)
}

fn decode_unknown(row: &PgRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int64(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float64(v);
    }
    Value::Null
}

/// Quote a possibly schema-qualified identifier for a `CALL` statement.
pub(crate) fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("tally"), "\"tally\"");
        assert_eq!(quote_identifier("audit.tally"), "\"audit\".\"tally\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
