//! MySQL value binding and decoding.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow, MySqlSslMode};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as _, TypeInfo, ValueRef};

use crate::traits::{ColumnInfo, Row, SqlType, SslMode, Value};

pub(crate) type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Map the generic SSL mode onto the native option.
pub(crate) fn map_ssl_mode(mode: &SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disable => MySqlSslMode::Disabled,
        SslMode::Prefer => MySqlSslMode::Preferred,
        SslMode::Require => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
    }
}

/// Bind one value onto a query.
///
/// MySQL has no UUID type, so UUIDs travel as their hyphenated text form.
pub(crate) fn bind_value(query: MySqlQuery<'_>, sql_type: SqlType, value: Value) -> MySqlQuery<'_> {
    match value {
        Value::Null => bind_null(query, sql_type),
        Value::Bool(v) => query.bind(v),
        Value::Int16(v) => query.bind(v),
        Value::Int32(v) => query.bind(v),
        Value::Int64(v) => query.bind(v),
        Value::UInt32(v) => query.bind(v),
        Value::UInt64(v) => query.bind(v),
        Value::Float32(v) => query.bind(v),
        Value::Float64(v) => query.bind(v),
        Value::Decimal(d) => query.bind(d),
        Value::Text(s) => query.bind(s),
        Value::Bytes(b) => query.bind(b),
        Value::Date(d) => query.bind(d),
        Value::Time(t) => query.bind(t),
        Value::DateTime(dt) => query.bind(dt),
        Value::DateTimeTz(dt) => query.bind(dt),
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j),
    }
}

fn bind_null(query: MySqlQuery<'_>, sql_type: SqlType) -> MySqlQuery<'_> {
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
        SqlType::Json => query.bind(None::<serde_json::Value>),
        SqlType::VarChar | SqlType::Text | SqlType::Uuid => query.bind(None::<String>),
    }
}

/// Build column metadata from a native row.
pub(crate) fn column_info(row: &MySqlRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnInfo::new(col.name(), col.type_info().name(), idx))
        .collect()
}

/// Convert a native row into the unified row shape.
pub(crate) fn convert_row(columns: Arc<Vec<ColumnInfo>>, row: &MySqlRow) -> Row {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_value(row, idx, col.type_info().name()))
        .collect();
    Row::new(columns, values)
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    match type_name {
        "BOOLEAN" => decode_as::<bool>(row, index, Value::Bool),
        "TINYINT" => decode_as::<i8>(row, index, |v| Value::Int16(i16::from(v))),
        "SMALLINT" => decode_as::<i16>(row, index, Value::Int16),
        "MEDIUMINT" | "INT" => decode_as::<i32>(row, index, Value::Int32),
        "BIGINT" => decode_as::<i64>(row, index, Value::Int64),
        "TINYINT UNSIGNED" => decode_as::<u8>(row, index, |v| Value::UInt32(u32::from(v))),
        "SMALLINT UNSIGNED" => decode_as::<u16>(row, index, |v| Value::UInt32(u32::from(v))),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => decode_as::<u32>(row, index, Value::UInt32),
        "BIGINT UNSIGNED" => decode_as::<u64>(row, index, Value::UInt64),
        "FLOAT" => decode_as::<f32>(row, index, Value::Float32),
        "DOUBLE" => decode_as::<f64>(row, index, Value::Float64),
        "DECIMAL" => decode_as::<Decimal>(row, index, Value::Decimal),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
            decode_as::<String>(row, index, Value::Text)
        }
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            decode_as::<Vec<u8>>(row, index, Value::Bytes)
        }
        "DATE" => decode_as::<NaiveDate>(row, index, Value::Date),
        "TIME" => decode_as::<NaiveTime>(row, index, Value::Time),
        "DATETIME" => decode_as::<NaiveDateTime>(row, index, Value::DateTime),
        "TIMESTAMP" => decode_as::<DateTime<Utc>>(row, index, Value::DateTimeTz),
        "JSON" => decode_as::<serde_json::Value>(row, index, Value::Json),
        _ => decode_unknown(row, index),
    }
}

fn decode_as<'r, T>(row: &'r MySqlRow, index: usize, wrap: impl Fn(T) -> Value) -> Value
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<T, _>(index).map(wrap).unwrap_or(Value::Null)
}

fn decode_unknown(row: &MySqlRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int64(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::Bytes(v);
    }
    Value::Null
}

/// Quote a possibly schema-qualified identifier for a `CALL` statement.
pub(crate) fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}
