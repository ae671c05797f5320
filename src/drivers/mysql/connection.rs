//! MySQL connection implementation.
//!
//! Wraps a SQLx `MySqlPool` behind the `ProviderConnection` trait. Stored
//! procedures run through `CALL` for input-only parameter lists; output
//! parameters would need session-variable plumbing the wire protocol does
//! not expose through plain statements, so they are rejected as unsupported.

use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use super::types::{bind_value, column_info, convert_row, map_ssl_mode, quote_identifier};
use crate::command::{CommandKind, SqlCommand};
use crate::error::{Error, Result};
use crate::params::{
    BoundStatement, ParameterDirection, PlaceholderStyle, SqlParameter, bind_statement,
};
use crate::traits::{
    BoxedConnection, ColumnInfo, ConnectionConfig, ConnectionParams, Provider, ProviderConnection,
    ResultSet, RowStream, SqlType, Value,
};

const MAX_POOL_CONNECTIONS: u32 = 5;
const STREAM_BUFFER_ROWS: usize = 64;

/// MySQL database connection.
pub struct MySqlDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<MySqlPool>>,
}

impl std::fmt::Debug for MySqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDriver")
            .field("config", &self.config)
            .field("pool", &"<MySqlPool>")
            .finish()
    }
}

impl MySqlDriver {
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

    fn build_connect_options(&self) -> Result<MySqlConnectOptions> {
        match &self.config.params {
            ConnectionParams::Server {
                hostname,
                port,
                username,
                password,
                database,
                ssl_mode,
                ..
            } => Ok(MySqlConnectOptions::new()
                .host(hostname)
                .port(*port)
                .username(username)
                .password(password)
                .database(database)
                .ssl_mode(map_ssl_mode(ssl_mode))),
            ConnectionParams::File { .. } | ConnectionParams::InMemory => {
                Err(Error::InvalidConfig(
                    "MySQL requires server connection parameters".to_string(),
                ))
            }
        }
    }

    async fn pool(&self) -> Result<MySqlPool> {
        let guard = self.pool.read().await;
        guard.as_ref().cloned().ok_or(Error::NotConnected)
    }

    /// Translate the command into native SQL plus bind values.
    fn prepare(&self, command: &SqlCommand) -> Result<BoundStatement> {
        match command.kind() {
            CommandKind::Text => bind_statement(
                command.text(),
                command.parameters(),
                PlaceholderStyle::Positional,
            ),
            CommandKind::StoredProcedure => {
                if command
                    .parameters()
                    .iter()
                    .any(|p| p.direction().is_output())
                {
                    return Err(Error::Unsupported {
                        provider: Provider::MySql,
                        operation: "output parameters in stored procedure calls",
                    });
                }
                let values: Vec<(SqlType, Value)> = command
                    .parameters()
                    .iter()
                    .map(|p| (p.sql_type(), p.value().clone()))
                    .collect();
                let placeholders = vec!["?"; values.len()].join(", ");
                let sql = format!(
                    "CALL {}({})",
                    quote_identifier(command.text()),
                    placeholders
                );
                Ok(BoundStatement { sql, values })
            }
        }
    }
}

#[async_trait]
impl ProviderConnection for MySqlDriver {
    fn provider(&self) -> Provider {
        Provider::MySql
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
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .acquire_timeout(self.config.command_timeout)
            .connect_with(options)
            .await?;
        tracing::debug!(db = %self.config.display_name(), "mysql pool opened");
        *guard = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(db = %self.config.display_name(), "mysql pool closed");
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
                if tx.send(message).await.is_err() {
                    break;
                }
            }
        })
        .detach();
        Ok(Box::pin(rx))
    }

    async fn derive_parameters(&self, procedure: &str) -> Result<Vec<SqlParameter>> {
        let pool = self.pool().await?;

        let known: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM information_schema.ROUTINES \
             WHERE ROUTINE_SCHEMA = DATABASE() AND ROUTINE_NAME = ?",
        )
        .bind(procedure)
        .fetch_one(&pool)
        .await?;
        if known == 0 {
            return Err(Error::ProcedureNotFound(procedure.to_string()));
        }

        let rows = sqlx::query(
            "SELECT PARAMETER_NAME, DATA_TYPE, PARAMETER_MODE \
             FROM information_schema.PARAMETERS \
             WHERE SPECIFIC_SCHEMA = DATABASE() AND SPECIFIC_NAME = ? \
               AND PARAMETER_NAME IS NOT NULL \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(procedure)
        .fetch_all(&pool)
        .await?;

        let mut parameters = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = sqlx::Row::try_get(row, "PARAMETER_NAME")?;
            let data_type: String = sqlx::Row::try_get(row, "DATA_TYPE")?;
            let mode: Option<String> = sqlx::Row::try_get(row, "PARAMETER_MODE")?;

            let direction = match mode.as_deref() {
                Some("OUT") => ParameterDirection::Output,
                Some("INOUT") => ParameterDirection::InputOutput,
                _ => ParameterDirection::Input,
            };
            parameters.push(
                SqlParameter::new(&name, SqlType::from_type_name(&data_type), Value::Null)?
                    .with_direction(direction),
            );
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config() -> ConnectionConfig {
        ConnectionConfig::new(
            Provider::MySql,
            ConnectionParams::server("localhost", 3306, "app", "secret", "app"),
        )
    }

    #[test]
    fn test_prepare_text_command_uses_question_marks() {
        let driver = MySqlDriver::new(server_config());
        let mut command = SqlCommand::sql_text("SELECT * FROM t WHERE id = @id").unwrap();
        command.add_in_parameter("id", SqlType::Int, 1i32).unwrap();
        let bound = driver.prepare(&command).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = ?");
    }

    #[test]
    fn test_prepare_stored_procedure_renders_call() {
        let driver = MySqlDriver::new(server_config());
        let mut command = SqlCommand::stored_procedure("tally").unwrap();
        command
            .add_in_parameter("who", SqlType::VarChar, "ada")
            .unwrap();
        let bound = driver.prepare(&command).unwrap();
        assert_eq!(bound.sql, "CALL `tally`(?)");
    }

    #[test]
    fn test_output_parameters_rejected() {
        let driver = MySqlDriver::new(server_config());
        let mut command = SqlCommand::stored_procedure("tally").unwrap();
        command.add_out_parameter("total", SqlType::BigInt).unwrap();
        let err = driver.prepare(&command).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_system_variables_survive_binding() {
        let driver = MySqlDriver::new(server_config());
        let command = SqlCommand::sql_text("SELECT @@version").unwrap();
        let bound = driver.prepare(&command).unwrap();
        assert_eq!(bound.sql, "SELECT @@version");
    }
}
