//! Provider-agnostic row and value types.
//!
//! This module contains:
//! - `Value` - A unified value type for any database value
//! - `ColumnInfo` - Metadata about a column in a result set
//! - `Row` - One result row, sharing column metadata with its result set
//!
//! `Value::Null` is the null sentinel: it stands for a database NULL on the
//! way in (parameter values) and on the way out (result cells). Host-level
//! `Option::None` always converts to `Value::Null`, never to a panic or a
//! missing slot.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unified value type covering the types the supported backends produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Database NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit unsigned integer (MySQL).
    UInt32(u32),
    /// 64-bit unsigned integer (MySQL).
    UInt64(u64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date without time.
    Date(NaiveDate),
    /// Time without date.
    Time(NaiveTime),
    /// Date and time without timezone.
    DateTime(NaiveDateTime),
    /// Date and time with timezone, stored as UTC.
    DateTimeTz(DateTime<Utc>),
    /// UUID.
    Uuid(Uuid),
    /// JSON document.
    Json(serde_json::Value),
}

impl Value {
    /// Check whether this value is the null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the contained type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeTz(_) => "datetimetz",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    /// Render this value as a display string.
    ///
    /// NULL renders as `NULL`, bytes as lowercase hex with a `\x` prefix,
    /// temporal types in ISO-8601 shapes.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::UInt32(v) => v.to_string(),
            Value::UInt64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("\\x{}", hex::encode(b)),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::DateTimeTz(dt) => dt.to_rfc3339(),
            Value::Uuid(u) => u.to_string(),
            Value::Json(j) => serde_json::to_string(j).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTimeTz(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Provider-specific type name, e.g. `INT4` or `VARCHAR`.
    pub type_name: String,
    /// Column position, 0-indexed.
    pub ordinal: usize,
    /// Whether the column allows NULL values, when the provider reports it.
    pub nullable: Option<bool>,
}

impl ColumnInfo {
    /// Create column metadata with unknown nullability.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ordinal,
            nullable: None,
        }
    }

    /// Set the nullability flag.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

static NULL_VALUE: Value = Value::Null;

/// One result row.
///
/// All rows of a result set share the same column metadata through an `Arc`,
/// so cloning a row does not duplicate the column descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<ColumnInfo>>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row against shared column metadata.
    pub fn new(columns: Arc<Vec<ColumnInfo>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Create a row from bare values, without column metadata.
    ///
    /// Lookups by name return `None` for such rows; access by ordinal works
    /// as usual. Mostly useful in tests and for hand-built fixtures.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            columns: Arc::new(Vec::new()),
            values,
        }
    }

    /// Column metadata shared by this row's result set.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Number of values in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by ordinal.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by ordinal, treating out-of-range as NULL.
    pub fn get_or_null(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL_VALUE)
    }

    /// Get a value by column name. Names compare case-insensitively.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .and_then(|c| self.values.get(c.ordinal))
    }

    /// Get a value by column name, treating unknown names as NULL.
    pub fn get_named_or_null(&self, name: &str) -> &Value {
        self.get_named(name).unwrap_or(&NULL_VALUE)
    }

    /// Iterate over the values in ordinal order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume the row, yielding its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_columns() -> Arc<Vec<ColumnInfo>> {
        Arc::new(vec![
            ColumnInfo::new("id", "INT4", 0),
            ColumnInfo::new("name", "VARCHAR", 1),
        ])
    }

    #[test]
    fn test_null_sentinel() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(false).is_null());
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn test_option_none_becomes_null() {
        let v: Value = Option::<i32>::None.into();
        assert_eq!(v, Value::Null);

        let v: Value = Some(7i64).into();
        assert_eq!(v, Value::Int64(7));
    }

    #[test]
    fn test_display_rendering() {
        assert_eq!(Value::Null.to_display_string(), "NULL");
        assert_eq!(Value::Int32(-5).to_display_string(), "-5");
        assert_eq!(Value::Text("abc".into()).to_display_string(), "abc");
        assert_eq!(
            Value::Bytes(vec![0xDE, 0xAD]).to_display_string(),
            "\\xdead"
        );
    }

    #[test]
    fn test_row_access_by_ordinal_and_name() {
        let row = Row::new(
            person_columns(),
            vec![Value::Int32(1), Value::Text("ada".into())],
        );
        assert_eq!(row.get(0), Some(&Value::Int32(1)));
        assert_eq!(row.get_named("NAME"), Some(&Value::Text("ada".into())));
        assert_eq!(row.get(5), None);
        assert!(row.get_or_null(5).is_null());
        assert!(row.get_named_or_null("missing").is_null());
    }

    #[test]
    fn test_row_from_values_has_no_names() {
        let row = Row::from_values(vec![Value::Int64(9)]);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get_named("anything"), None);
        assert_eq!(row.get(0), Some(&Value::Int64(9)));
    }

    #[test]
    fn test_value_serde_round_trip() {
        let v = Value::Decimal(Decimal::new(12345, 2));
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
