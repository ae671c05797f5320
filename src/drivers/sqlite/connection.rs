//! SQLite connection implementation.
//!
//! Wraps a SQLx `SqlitePool` behind the `ProviderConnection` trait. SQLite
//! has no stored procedures, so procedure commands, output parameters, and
//! parameter discovery all fail with a typed unsupported error.

use std::str::FromStr;
use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::types::{bind_value, column_info, convert_row};
use crate::command::{CommandKind, SqlCommand};
use crate::error::{Error, Result};
use crate::params::{BoundStatement, PlaceholderStyle, SqlParameter, bind_statement};
use crate::traits::{
    BoxedConnection, ColumnInfo, ConnectionConfig, ConnectionParams, Provider, ProviderConnection,
    ResultSet, RowStream,
};

const MAX_POOL_CONNECTIONS: u32 = 5;
const STREAM_BUFFER_ROWS: usize = 64;

/// SQLite database connection over a file or in-memory database.
pub struct SqliteDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<SqlitePool>>,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("config", &self.config)
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteDriver {
    /// Create a driver from configuration without connecting.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Create a boxed driver for factory use.
    pub fn boxed(config: ConnectionConfig) -> BoxedConnection {
        Box::new(Self::new(config))
    }

    fn build_connect_options(&self) -> Result<SqliteConnectOptions> {
        match &self.config.params {
            ConnectionParams::File { path, read_only } => {
                let mut options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(!read_only)
                    .foreign_keys(true)
                    .busy_timeout(self.config.command_timeout);
                if *read_only {
                    options = options.read_only(true);
                } else {
                    options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
                }
                Ok(options)
            }
            ConnectionParams::InMemory => {
                let options = SqliteConnectOptions::from_str(":memory:")
                    .map_err(Error::from)?
                    .foreign_keys(true)
                    .busy_timeout(self.config.command_timeout);
                Ok(options)
            }
            ConnectionParams::Server { .. } => Err(Error::InvalidConfig(
                "SQLite does not accept server connection parameters".to_string(),
            )),
        }
    }

    async fn pool(&self) -> Result<SqlitePool> {
        let guard = self.pool.read().await;
        guard.as_ref().cloned().ok_or(Error::NotConnected)
    }

    /// Translate the command into native SQL plus bind values.
    fn prepare(&self, command: &SqlCommand) -> Result<BoundStatement> {
        if command.kind() == CommandKind::StoredProcedure {
            return Err(Error::Unsupported {
                provider: Provider::Sqlite,
                operation: "stored procedures",
            });
        }
        if command
            .parameters()
            .iter()
            .any(|p| p.direction().is_output())
        {
            return Err(Error::Unsupported {
                provider: Provider::Sqlite,
                operation: "output parameters",
            });
        }
        bind_statement(
            command.text(),
            command.parameters(),
            PlaceholderStyle::Positional,
        )
    }
}

#[async_trait]
impl ProviderConnection for SqliteDriver {
    fn provider(&self) -> Provider {
        Provider::Sqlite
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn connect(&self) -> Result<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let options = self.build_connect_options()?;
        // An in-memory database is private to its connection, so the pool
        // must not hand out a second one.
        let max_connections = match self.config.params {
            ConnectionParams::InMemory => 1,
            _ => MAX_POOL_CONNECTIONS,
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(self.config.command_timeout)
            .connect_with(options)
            .await?;
        tracing::debug!(db = %self.config.display_name(), "sqlite pool opened");
        *guard = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(db = %self.config.display_name(), "sqlite pool closed");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match self.pool.read().await.as_ref() {
            Some(pool) => !pool.is_closed(),
            None => false,
        }
    }

    async fn execute(&self, command: &mut SqlCommand) -> Result<u64> {
        let bound = self.prepare(command)?;
        let pool = self.pool().await?;
        let mut query = sqlx::query(&bound.sql);
        for (sql_type, value) in bound.values.clone() {
            query = bind_value(query, sql_type, value);
        }
        let result = query.execute(&pool).await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, command: &SqlCommand) -> Result<ResultSet> {
        let bound = self.prepare(command)?;
        let pool = self.pool().await?;
        let mut query = sqlx::query(&bound.sql);
        for (sql_type, value) in bound.values.clone() {
            query = bind_value(query, sql_type, value);
        }
        let native_rows = query.fetch_all(&pool).await?;
        let columns = Arc::new(
            native_rows
                .first()
                .map(column_info)
                .unwrap_or_default(),
        );
        let rows = native_rows
            .iter()
            .map(|r| convert_row(columns.clone(), r))
            .collect();
        Ok(ResultSet::new(columns, rows))
    }

    async fn stream(&self, command: &SqlCommand) -> Result<RowStream> {
        let bound = self.prepare(command)?;
        let pool = self.pool().await?;
        let (tx, rx) = async_channel::bounded(STREAM_BUFFER_ROWS);
        smol::spawn(async move {
            let BoundStatement { sql, values } = bound;
            let mut query = sqlx::query(&sql);
            for (sql_type, value) in values {
                query = bind_value(query, sql_type, value);
            }
            let mut native_rows = query.fetch(&pool);
            let mut columns: Option<Arc<Vec<ColumnInfo>>> = None;
            while let Some(item) = native_rows.next().await {
                let message = match item {
                    Ok(native) => {
                        let shared = columns
                            .get_or_insert_with(|| Arc::new(column_info(&native)))
                            .clone();
                        Ok(convert_row(shared, &native))
                    }
                    Err(e) => Err(Error::from(e)),
                };
                // A dropped receiver abandons the rest of the cursor.
                if tx.send(message).await.is_err() {
                    break;
                }
            }
        })
        .detach();
        Ok(Box::pin(rx))
    }

    async fn derive_parameters(&self, _procedure: &str) -> Result<Vec<SqlParameter>> {
        Err(Error::Unsupported {
            provider: Provider::Sqlite,
            operation: "stored procedure parameter discovery",
        })
    }
}
