//! Null-safe value coercion helpers.
//!
//! Reading entities out of result rows means turning loosely typed values
//! into concrete primitives. The helpers here never fail: a NULL, a wrong
//! variant, or an unparsable text rendering all coerce to a fallback value
//! instead of an error.
//!
//! `convert` falls back to the type's zero value, `convert_or` to a caller
//! default:
//!
//! ```
//! use sqlbridge::coerce::{convert, convert_or};
//! use sqlbridge::Value;
//!
//! assert_eq!(convert::<bool>(&Value::Text("true".into())), true);
//! assert_eq!(convert::<i64>(&Value::Null), 0);
//! assert_eq!(convert_or(&Value::Text("notanumber".into()), 42i32), 42);
//! ```
//!
//! Text values are parsed leniently (surrounding whitespace ignored), so a
//! backend that reports numbers as text still coerces cleanly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use uuid::Uuid;

use crate::traits::Value;

/// Fallible extraction of a concrete type from a [`Value`].
///
/// `None` means the value was NULL, the wrong shape, or unparsable; callers
/// decide the fallback through [`convert`] or [`convert_or`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

/// Coerce a value, falling back to the type's zero value.
pub fn convert<T: FromValue + Default>(value: &Value) -> T {
    T::from_value(value).unwrap_or_default()
}

/// Coerce a value, falling back to the supplied default.
pub fn convert_or<T: FromValue>(value: &Value, default: T) -> T {
    T::from_value(value).unwrap_or(default)
}

fn parse_text<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.trim().parse().ok()
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int16(0) | Value::Int32(0) | Value::Int64(0) | Value::UInt32(0)
            | Value::UInt64(0) => Some(false),
            Value::Int16(1) | Value::Int32(1) | Value::Int64(1) | Value::UInt32(1)
            | Value::UInt64(1) => Some(true),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

macro_rules! from_value_int {
    ($ty:ty) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Int16(v) => <$ty>::try_from(*v).ok(),
                    Value::Int32(v) => <$ty>::try_from(*v).ok(),
                    Value::Int64(v) => <$ty>::try_from(*v).ok(),
                    Value::UInt32(v) => <$ty>::try_from(*v).ok(),
                    Value::UInt64(v) => <$ty>::try_from(*v).ok(),
                    Value::Decimal(d) => d.trunc().to_i64().and_then(|v| <$ty>::try_from(v).ok()),
                    Value::Text(s) => parse_text(s),
                    _ => None,
                }
            }
        }
    };
}

from_value_int!(i16);
from_value_int!(i32);
from_value_int!(i64);
from_value_int!(u32);
from_value_int!(u64);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt32(v) => Some(f64::from(*v)),
            Value::UInt64(v) => Some(*v as f64),
            Value::Decimal(d) => d.to_f64(),
            Value::Text(s) => parse_text(s),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float32(v) => Some(*v),
            Value::Text(s) => parse_text(s),
            other => f64::from_value(other).map(|v| v as f32),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(*d),
            Value::Int16(v) => Some(Decimal::from(*v)),
            Value::Int32(v) => Some(Decimal::from(*v)),
            Value::Int64(v) => Some(Decimal::from(*v)),
            Value::UInt32(v) => Some(Decimal::from(*v)),
            Value::UInt64(v) => Some(Decimal::from(*v)),
            Value::Float32(v) => Decimal::from_f32(*v),
            Value::Float64(v) => Decimal::from_f64(*v),
            Value::Text(s) => parse_text(s),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(other.to_display_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            Value::Text(s) => Some(s.clone().into_bytes()),
            _ => None,
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::DateTimeTz(dt) => Some(dt.naive_utc().date()),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Time(t) => Some(*t),
            Value::DateTime(dt) => Some(dt.time()),
            Value::DateTimeTz(dt) => Some(dt.naive_utc().time()),
            Value::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").ok(),
            _ => None,
        }
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            Value::DateTimeTz(dt) => Some(dt.naive_utc()),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::Text(s) => parse_naive_datetime(s),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTimeTz(dt) => Some(*dt),
            Value::DateTime(dt) => Some(Utc.from_utc_datetime(dt)),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt)),
            Value::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| parse_naive_datetime(s).map(|dt| Utc.from_utc_datetime(&dt))),
            _ => None,
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(u) => Some(*u),
            Value::Text(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(j) => Some(j.clone()),
            Value::Text(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }
}
