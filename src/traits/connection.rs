//! Core connection trait shared by all drivers.
//!
//! `ProviderConnection` is the seam between the `Database` facade and the
//! backend drivers: create the native connection pool, run commands, stream
//! rows, and discover stored-procedure signatures. Provider errors raised
//! during execution pass through unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::row::{ColumnInfo, Row};
use super::types::{ConnectionConfig, Provider};
use crate::command::SqlCommand;
use crate::error::Result;
use crate::params::SqlParameter;

/// A boxed connection, as produced by the factory.
pub type BoxedConnection = Box<dyn ProviderConnection>;

/// A lazy, single-pass stream of result rows.
///
/// The underlying cursor cannot be rewound: once a row has been yielded it is
/// gone, and dropping the stream abandons the remainder.
pub type RowStream = BoxStream<'static, Result<Row>>;

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// Column metadata, shared with every row.
    pub columns: Arc<Vec<ColumnInfo>>,
    /// The result rows.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Create a result set from shared columns and rows.
    pub fn new(columns: Arc<Vec<ColumnInfo>>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// Interface every backend driver implements.
///
/// Implementations hold an optional native pool behind an async lock, so all
/// methods take `&self`; calling an execution method before `connect` fails
/// with `Error::NotConnected`.
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    /// The backend this connection talks to.
    fn provider(&self) -> Provider;

    /// The configuration this connection was created from.
    fn config(&self) -> &ConnectionConfig;

    /// Establish the native connection pool.
    async fn connect(&self) -> Result<()>;

    /// Close the pool and release its connections.
    async fn close(&self) -> Result<()>;

    /// Whether `connect` has succeeded and the pool is still open.
    async fn is_connected(&self) -> bool;

    /// Execute a command that returns no rows.
    ///
    /// Returns the affected-row count. Output and input-output parameter
    /// values are written back onto the command where the backend supports
    /// them.
    async fn execute(&self, command: &mut SqlCommand) -> Result<u64>;

    /// Execute a command and materialize every result row.
    async fn query(&self, command: &SqlCommand) -> Result<ResultSet>;

    /// Execute a command and stream result rows one at a time.
    async fn stream(&self, command: &SqlCommand) -> Result<RowStream>;

    /// Query the backend catalog for a stored procedure's parameters.
    async fn derive_parameters(&self, procedure: &str) -> Result<Vec<SqlParameter>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::row::Value;

    #[test]
    fn test_result_set_accessors() {
        let columns = Arc::new(vec![ColumnInfo::new("n", "INT4", 0)]);
        let rows = vec![
            Row::new(columns.clone(), vec![Value::Int32(1)]),
            Row::new(columns.clone(), vec![Value::Int32(2)]),
        ];
        let set = ResultSet::new(columns, rows);
        assert_eq!(set.row_count(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.first().unwrap().get(0), Some(&Value::Int32(1)));
    }

    #[test]
    fn test_empty_result_set() {
        let set = ResultSet::default();
        assert!(set.is_empty());
        assert!(set.first().is_none());
    }
}
