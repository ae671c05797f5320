//! Error types for data-access operations.
//!
//! Local validation failures (empty command text, unknown parameter names,
//! mismatched configuration) are raised before any I/O happens. Errors
//! reported by the database itself pass through unchanged in the
//! [`Error::Sqlx`] variant.

use crate::traits::Provider;

/// Result type alias for data-access operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for data-access operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command text or stored procedure name was empty.
    #[error("command text must not be empty")]
    EmptyCommandText,

    /// A parameter was declared with an empty name.
    #[error("parameter name must not be empty")]
    EmptyParameterName,

    /// A data table was given an empty name.
    #[error("table name must not be empty")]
    EmptyTableName,

    /// A parameter with the same name is already on the command.
    #[error("parameter '{0}' is already declared")]
    DuplicateParameter(String),

    /// A column with the same name is already on the table.
    #[error("column '{0}' is already declared")]
    DuplicateColumn(String),

    /// Command text referenced a parameter that was never declared, or a
    /// value was requested for a name the command does not carry.
    #[error("no parameter named '{0}' on this command")]
    UnknownParameter(String),

    /// A column name was referenced that the table does not have.
    #[error("no column named '{0}'")]
    UnknownColumn(String),

    /// The connection configuration does not fit the selected provider.
    #[error("invalid connection configuration: {0}")]
    InvalidConfig(String),

    /// A connection URL could not be parsed.
    #[error("invalid connection url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An operation was attempted before `connect` succeeded.
    #[error("database is not connected")]
    NotConnected,

    /// The provider has no equivalent for the requested operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: Provider,
        operation: &'static str,
    },

    /// Parameter discovery found no stored procedure with the given name.
    #[error("stored procedure '{0}' was not found")]
    ProcedureNotFound(String),

    /// A row was pushed with the wrong number of values.
    #[error("row has {actual} values but the table has {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// A null value was pushed into a column that does not allow nulls.
    #[error("column '{0}' does not allow null values")]
    NullViolation(String),

    /// A duplicate value was pushed into a unique or primary-key column.
    #[error("duplicate value for unique column '{0}'")]
    UniqueViolation(String),

    /// A text value exceeded the column's maximum length.
    #[error("value for column '{column}' exceeds the maximum length of {max}")]
    MaxLengthExceeded { column: String, max: u32 },

    /// Error reported by the underlying database client.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
