//! Typed command parameters and the name/placeholder binder.
//!
//! Parameter names carry a single leading `@` marker. [`format_parameter_name`]
//! enforces that invariant: a bare name gets the marker prepended, an already
//! marked name is returned unchanged, and the marker is never doubled.
//!
//! Command text refers to parameters by that marked name. Before execution a
//! driver rewrites each `@name` token into its native placeholder (`$1` for
//! PostgreSQL, `?` for MySQL and SQLite) through [`bind_statement`], which
//! also yields the bound values in occurrence order. Tokens inside string
//! literals and quoted identifiers are left alone, and `@@` escapes the
//! marker for backends with `@@`-prefixed system variables.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::{SqlType, Value};

/// The marker token carried by every parameter name.
pub const PARAMETER_MARKER: char = '@';

/// Data flow direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDirection {
    /// Value flows into the statement.
    #[default]
    Input,
    /// Value is produced by the statement.
    Output,
    /// Value flows in and is updated on the way out.
    InputOutput,
}

impl ParameterDirection {
    /// Whether the parameter carries a value into the statement.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input | Self::InputOutput)
    }

    /// Whether the statement writes a value back.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Output | Self::InputOutput)
    }
}

/// Normalize a parameter name to carry the marker exactly once.
pub fn format_parameter_name(name: &str) -> Result<String> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(Error::EmptyParameterName);
    }
    if name.starts_with(PARAMETER_MARKER) {
        Ok(name.to_string())
    } else {
        Ok(format!("{PARAMETER_MARKER}{name}"))
    }
}

/// A named, typed, directional command parameter.
///
/// Defaults are chosen so the common case stays short: size 0 (provider
/// default), direction input, nullable. A host-side missing value is stored
/// as [`Value::Null`] and reaches the backend as SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    name: String,
    sql_type: SqlType,
    size: u32,
    direction: ParameterDirection,
    nullable: bool,
    source_column: Option<String>,
    value: Value,
}

impl SqlParameter {
    /// Create an input parameter.
    pub fn new(name: &str, sql_type: SqlType, value: impl Into<Value>) -> Result<Self> {
        Ok(Self {
            name: format_parameter_name(name)?,
            sql_type,
            size: 0,
            direction: ParameterDirection::Input,
            nullable: true,
            source_column: None,
            value: value.into(),
        })
    }

    /// Create an output parameter with no initial value.
    pub fn output(name: &str, sql_type: SqlType) -> Result<Self> {
        let mut parameter = Self::new(name, sql_type, Value::Null)?;
        parameter.direction = ParameterDirection::Output;
        Ok(parameter)
    }

    /// Set the size hint, in bytes or characters depending on the type.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set the direction.
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Mark the parameter as not accepting NULL.
    pub fn not_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Record the result-set column this parameter is sourced from.
    pub fn with_source_column(mut self, column: impl Into<String>) -> Self {
        self.source_column = Some(column.into());
        self
    }

    /// The normalized name, marker included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without its marker.
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches(PARAMETER_MARKER)
    }

    /// The provider-independent type tag.
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// The size hint, 0 meaning provider default.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The data flow direction.
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// Whether the parameter accepts NULL.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The source column, if recorded.
    pub fn source_column(&self) -> Option<&str> {
        self.source_column.as_deref()
    }

    /// The current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Placeholder syntax of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
    /// `?` for every placeholder (MySQL, SQLite).
    Positional,
}

/// A statement ready for the native client: rewritten SQL plus the values to
/// bind, typed and in occurrence order.
#[derive(Debug, Clone)]
pub(crate) struct BoundStatement {
    pub sql: String,
    pub values: Vec<(SqlType, Value)>,
}

/// Rewrite `@name` tokens into native placeholders and collect bind values.
///
/// Every occurrence gets its own placeholder, so a parameter referenced twice
/// is bound twice. Referencing a name that is not declared on the command is
/// an error raised before any I/O.
pub(crate) fn bind_statement(
    text: &str,
    parameters: &[SqlParameter],
    style: PlaceholderStyle,
) -> Result<BoundStatement> {
    let mut sql = String::with_capacity(text.len());
    let mut values: Vec<(SqlType, Value)> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                sql.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                sql.push(c);
            }
            PARAMETER_MARKER if !in_single && !in_double => {
                if chars.peek() == Some(&PARAMETER_MARKER) {
                    // `@@` escapes the marker (MySQL system variables).
                    chars.next();
                    sql.push(PARAMETER_MARKER);
                    sql.push(PARAMETER_MARKER);
                    continue;
                }
                let mut ident = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if ident.is_empty() {
                    sql.push(PARAMETER_MARKER);
                    continue;
                }
                let parameter = parameters
                    .iter()
                    .find(|p| p.bare_name().eq_ignore_ascii_case(&ident))
                    .ok_or_else(|| {
                        Error::UnknownParameter(format!("{PARAMETER_MARKER}{ident}"))
                    })?;
                values.push((parameter.sql_type(), parameter.value().clone()));
                match style {
                    PlaceholderStyle::Numbered => {
                        sql.push('$');
                        sql.push_str(&values.len().to_string());
                    }
                    PlaceholderStyle::Positional => sql.push('?'),
                }
            }
            _ => sql.push(c),
        }
    }

    Ok(BoundStatement { sql, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_param() -> SqlParameter {
        SqlParameter::new("id", SqlType::Int, 7i32).unwrap()
    }

    #[test]
    fn test_marker_prepended_exactly_once() {
        assert_eq!(format_parameter_name("id").unwrap(), "@id");
        assert_eq!(format_parameter_name("@id").unwrap(), "@id");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            format_parameter_name(""),
            Err(Error::EmptyParameterName)
        ));
        assert!(format_parameter_name("   ").is_err());
    }

    #[test]
    fn test_parameter_defaults() {
        let p = id_param();
        assert_eq!(p.name(), "@id");
        assert_eq!(p.bare_name(), "id");
        assert_eq!(p.size(), 0);
        assert_eq!(p.direction(), ParameterDirection::Input);
        assert!(p.is_nullable());
        assert_eq!(p.value(), &Value::Int32(7));
    }

    #[test]
    fn test_output_parameter_starts_null() {
        let p = SqlParameter::output("total", SqlType::BigInt).unwrap();
        assert_eq!(p.direction(), ParameterDirection::Output);
        assert!(p.value().is_null());
        assert!(p.direction().is_output());
        assert!(!p.direction().is_input());
    }

    #[test]
    fn test_none_value_becomes_null() {
        let p = SqlParameter::new("x", SqlType::Int, Option::<i32>::None).unwrap();
        assert!(p.value().is_null());
    }

    #[test]
    fn test_bind_numbered_placeholders() {
        let params = vec![
            id_param(),
            SqlParameter::new("name", SqlType::VarChar, "ada").unwrap(),
        ];
        let bound = bind_statement(
            "SELECT * FROM t WHERE id = @id AND name = @name",
            &params,
            PlaceholderStyle::Numbered,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = $1 AND name = $2");
        assert_eq!(bound.values.len(), 2);
        assert_eq!(bound.values[0].1, Value::Int32(7));
    }

    #[test]
    fn test_bind_positional_placeholders() {
        let params = vec![id_param()];
        let bound = bind_statement(
            "UPDATE t SET n = n + 1 WHERE id = @id",
            &params,
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(bound.sql, "UPDATE t SET n = n + 1 WHERE id = ?");
    }

    #[test]
    fn test_repeated_reference_binds_twice() {
        let params = vec![id_param()];
        let bound = bind_statement(
            "SELECT * FROM t WHERE a = @id OR b = @id",
            &params,
            PlaceholderStyle::Numbered,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE a = $1 OR b = $2");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn test_quoted_text_left_alone() {
        let params = vec![id_param()];
        let bound = bind_statement(
            "SELECT '@id', \"@id\" FROM t WHERE id = @id",
            &params,
            PlaceholderStyle::Numbered,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT '@id', \"@id\" FROM t WHERE id = $1");
        assert_eq!(bound.values.len(), 1);
    }

    #[test]
    fn test_double_marker_is_escaped() {
        let bound = bind_statement(
            "SELECT @@version",
            &[],
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT @@version");
        assert!(bound.values.is_empty());
    }

    #[test]
    fn test_unknown_parameter_is_an_error() {
        let err = bind_statement(
            "SELECT * FROM t WHERE id = @missing",
            &[],
            PlaceholderStyle::Numbered,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownParameter(name) if name == "@missing"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let params = vec![id_param()];
        let bound = bind_statement(
            "SELECT * FROM t WHERE id = @ID",
            &params,
            PlaceholderStyle::Positional,
        )
        .unwrap();
        assert_eq!(bound.values.len(), 1);
        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = ?");
    }

    #[test]
    fn test_bare_marker_passes_through() {
        let bound = bind_statement("SELECT 'a' @ 'b'", &[], PlaceholderStyle::Positional);
        assert_eq!(bound.unwrap().sql, "SELECT 'a' @ 'b'");
    }
}
