//! In-memory tabular structures and their fluent builder.
//!
//! A [`DataTable`] is a named column collection plus rows, validated on
//! every push: arity, null policy, maximum lengths, and primary-key/unique
//! duplicates. [`DataTableBuilder`] assembles the column layout before any
//! rows exist, so shape errors surface at build time.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{ColumnInfo, ResultSet, Row, SqlType, Value};

/// A column definition in a [`DataTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataColumn {
    name: String,
    sql_type: SqlType,
    nullable: bool,
    unique: bool,
    max_length: Option<u32>,
    default_value: Option<Value>,
}

impl DataColumn {
    /// Create a nullable, non-unique column.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            unique: false,
            max_length: None,
            default_value: None,
        }
    }

    /// Disallow NULL values.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Require values to be distinct across rows.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Cap the length of text values.
    pub fn max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Substitute this value when a NULL is pushed.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column type tag.
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Whether NULL values are allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A named, constraint-checked, in-memory table.
#[derive(Debug, Clone)]
pub struct DataTable {
    name: String,
    columns: Vec<DataColumn>,
    primary_key: Vec<usize>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column definitions.
    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    /// Names of the primary key columns, in key order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.primary_key
            .iter()
            .map(|&i| self.columns[i].name())
            .collect()
    }

    /// The rows pushed so far.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column's ordinal by name. Names compare case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Validate and append a row.
    ///
    /// NULLs falling on a column with a default value take the default;
    /// NULLs on a non-nullable column without one are rejected. Text values
    /// are checked against the column's maximum length, and primary-key and
    /// unique columns against every existing row.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let mut resolved = Vec::with_capacity(values.len());
        for (column, value) in self.columns.iter().zip(values) {
            let value = match value {
                Value::Null => match &column.default_value {
                    Some(default) => default.clone(),
                    None if column.nullable => Value::Null,
                    None => return Err(Error::NullViolation(column.name.clone())),
                },
                other => other,
            };
            if let (Some(max), Value::Text(s)) = (column.max_length, &value) {
                if s.chars().count() as u32 > max {
                    return Err(Error::MaxLengthExceeded {
                        column: column.name.clone(),
                        max,
                    });
                }
            }
            resolved.push(value);
        }

        for (index, column) in self.columns.iter().enumerate() {
            if !column.unique {
                continue;
            }
            let candidate = &resolved[index];
            if candidate.is_null() {
                continue;
            }
            if self.rows.iter().any(|row| &row[index] == candidate) {
                return Err(Error::UniqueViolation(column.name.clone()));
            }
        }

        if !self.primary_key.is_empty() {
            let key: Vec<&Value> = self.primary_key.iter().map(|&i| &resolved[i]).collect();
            for row in &self.rows {
                if self.primary_key.iter().map(|&i| &row[i]).eq(key.iter().copied()) {
                    let first = self.primary_key[0];
                    return Err(Error::UniqueViolation(self.columns[first].name.clone()));
                }
            }
        }

        self.rows.push(resolved);
        Ok(())
    }

    /// Fill a table from a materialized query result.
    ///
    /// Column types are inferred from the provider type names, defaulting to
    /// text; no constraints are applied.
    pub fn from_result_set(name: impl Into<String>, result: &ResultSet) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyTableName);
        }
        let columns = result
            .columns
            .iter()
            .map(|c| DataColumn::new(&c.name, SqlType::from_type_name(&c.type_name)))
            .collect();
        let rows = result
            .rows
            .iter()
            .map(|row| row.values().cloned().collect())
            .collect();
        Ok(Self {
            name,
            columns,
            primary_key: Vec::new(),
            rows,
        })
    }

    /// View the table as a result set, for row mapping.
    pub fn to_result_set(&self) -> ResultSet {
        let columns: Arc<Vec<ColumnInfo>> = Arc::new(
            self.columns
                .iter()
                .enumerate()
                .map(|(idx, c)| {
                    ColumnInfo::new(c.name(), c.sql_type().name(), idx)
                        .with_nullable(c.is_nullable())
                })
                .collect(),
        );
        let rows = self
            .rows
            .iter()
            .map(|values| Row::new(columns.clone(), values.clone()))
            .collect();
        ResultSet::new(columns, rows)
    }
}

/// Fluent builder for [`DataTable`] column layouts.
///
/// ```
/// use sqlbridge::{DataTableBuilder, SqlType, Value};
///
/// let mut table = DataTableBuilder::new("users")
///     .column("id", SqlType::Int, |c| c.not_null())
///     .column("email", SqlType::VarChar, |c| c.unique().max_length(128))
///     .primary_key(&["id"])
///     .build()
///     .unwrap();
///
/// table
///     .push_row(vec![Value::Int32(1), Value::Text("ada@example.com".into())])
///     .unwrap();
/// ```
pub struct DataTableBuilder {
    name: String,
    columns: Vec<DataColumn>,
    primary_key: Vec<String>,
}

impl DataTableBuilder {
    /// Start a builder for a table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Add a column, shaping it through the configuration closure.
    pub fn column(
        mut self,
        name: impl Into<String>,
        sql_type: SqlType,
        configure: impl FnOnce(DataColumn) -> DataColumn,
    ) -> Self {
        self.columns.push(configure(DataColumn::new(name, sql_type)));
        self
    }

    /// Declare the primary key columns, in key order.
    ///
    /// Key columns become non-nullable, and the key tuple must be distinct
    /// across rows.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Validate the layout and produce an empty table.
    pub fn build(self) -> Result<DataTable> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyTableName);
        }

        let mut columns = self.columns;
        for (index, column) in columns.iter().enumerate() {
            let duplicate = columns[..index]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name));
            if duplicate {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }

        let mut key_indices = Vec::with_capacity(self.primary_key.len());
        for key_column in &self.primary_key {
            let index = columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(key_column))
                .ok_or_else(|| Error::UnknownColumn(key_column.clone()))?;
            key_indices.push(index);
        }
        for &index in &key_indices {
            columns[index].nullable = false;
        }

        Ok(DataTable {
            name: self.name,
            columns,
            primary_key: key_indices,
            rows: Vec::new(),
        })
    }
}
