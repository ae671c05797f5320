//! PostgreSQL connection implementation.
//!
//! Wraps a SQLx `PgPool` behind the `ProviderConnection` trait. The command
//! timeout is pushed down as `statement_timeout`, stored procedures run
//! through `CALL`, and procedure signatures come from
//! `information_schema.parameters`.

use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

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

/// PostgreSQL database connection.
pub struct PostgresDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<PgPool>>,
}

impl std::fmt::Debug for PostgresDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDriver")
            .field("config", &self.config)
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl PostgresDriver {
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

    fn build_connect_options(&self) -> Result<PgConnectOptions> {
        match &self.config.params {
            ConnectionParams::Server {
                hostname,
                port,
                username,
                password,
                database,
                ssl_mode,
                ..
            } => {
                let statement_timeout = self.config.command_timeout.as_millis().to_string();
                Ok(PgConnectOptions::new()
                    .host(hostname)
                    .port(*port)
                    .username(username)
                    .password(password)
                    .database(database)
                    .ssl_mode(map_ssl_mode(ssl_mode))
                    .options([("statement_timeout", statement_timeout.as_str())]))
            }
            ConnectionParams::File { .. } | ConnectionParams::InMemory => {
                Err(Error::InvalidConfig(
                    "PostgreSQL requires server connection parameters".to_string(),
                ))
            }
        }
    }

    async fn pool(&self) -> Result<PgPool> {
        let guard = self.pool.read().await;
        guard.as_ref().cloned().ok_or(Error::NotConnected)
    }

    /// Translate the command into native SQL plus bind values.
    ///
    /// Procedure commands render as `CALL name($1, ...)` with every declared
    /// parameter in declaration order; output-only slots are bound as typed
    /// NULLs.
    fn prepare(&self, command: &SqlCommand) -> Result<BoundStatement> {
        match command.kind() {
            CommandKind::Text => bind_statement(
                command.text(),
                command.parameters(),
                PlaceholderStyle::Numbered,
            ),
            CommandKind::StoredProcedure => {
                let values: Vec<(SqlType, Value)> = command
                    .parameters()
                    .iter()
                    .map(|p| {
                        let value = if p.direction().is_input() {
                            p.value().clone()
                        } else {
                            Value::Null
                        };
                        (p.sql_type(), value)
                    })
                    .collect();
                let placeholders: Vec<String> =
                    (1..=values.len()).map(|i| format!("${i}")).collect();
                let sql = format!(
                    "CALL {}({})",
                    quote_identifier(command.text()),
                    placeholders.join(", ")
                );
                Ok(BoundStatement { sql, values })
            }
        }
    }

    /// Copy a `CALL` result row back onto output parameters, in declaration
    /// order.
    fn write_back_outputs(command: &mut SqlCommand, row: &crate::traits::Row) {
        let output_indices: Vec<usize> = command
            .parameters()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.direction().is_output())
            .map(|(i, _)| i)
            .collect();
        for (slot, parameter_index) in output_indices.into_iter().enumerate() {
            if let Some(value) = row.get(slot) {
                command.set_parameter_value_at(parameter_index, value.clone());
            }
        }
    }
}

#[async_trait]
impl ProviderConnection for PostgresDriver {
    fn provider(&self) -> Provider {
        Provider::Postgres
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
        let pool = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .acquire_timeout(self.config.command_timeout)
            .connect_with(options)
            .await?;
        tracing::debug!(db = %self.config.display_name(), "postgres pool opened");
        *guard = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(db = %self.config.display_name(), "postgres pool closed");
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

        if command.kind() == CommandKind::StoredProcedure {
            let mut query = sqlx::query(&bound.sql);
            for (sql_type, value) in bound.values.clone() {
                query = bind_value(query, sql_type, value);
            }
            // CALL reports no affected-row count; its single result row, if
            // any, carries the output parameter values.
            if let Some(native) = query.fetch_optional(&pool).await? {
                let columns = Arc::new(column_info(&native));
                let row = convert_row(columns, &native);
                Self::write_back_outputs(command, &row);
            }
            return Ok(0);
        }

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
            "SELECT count(*) FROM information_schema.routines \
             WHERE routine_schema = current_schema() AND routine_name = $1",
        )
        .bind(procedure)
        .fetch_one(&pool)
        .await?;
        if known == 0 {
            return Err(Error::ProcedureNotFound(procedure.to_string()));
        }

        let rows = sqlx::query(
            "SELECT p.parameter_name, p.data_type, p.parameter_mode \
             FROM information_schema.parameters p \
             JOIN information_schema.routines r \
               ON r.specific_name = p.specific_name \
              AND r.specific_schema = p.specific_schema \
             WHERE r.routine_schema = current_schema() AND r.routine_name = $1 \
             ORDER BY p.ordinal_position",
        )
        .bind(procedure)
        .fetch_all(&pool)
        .await?;

        let mut parameters = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let name: Option<String> = sqlx::Row::try_get(row, "parameter_name")?;
            let data_type: Option<String> = sqlx::Row::try_get(row, "data_type")?;
            let mode: Option<String> = sqlx::Row::try_get(row, "parameter_mode")?;

            let name = name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("p{}", index + 1));
            let direction = match mode.as_deref() {
                Some("OUT") => ParameterDirection::Output,
                Some("INOUT") => ParameterDirection::InputOutput,
                _ => ParameterDirection::Input,
            };
            let sql_type = SqlType::from_type_name(data_type.as_deref().unwrap_or_default());
            parameters
                .push(SqlParameter::new(&name, sql_type, Value::Null)?.with_direction(direction));
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config() -> ConnectionConfig {
        ConnectionConfig::new(
            Provider::Postgres,
            ConnectionParams::server("localhost", 5432, "app", "secret", "app"),
        )
    }

    #[test]
    fn test_prepare_text_command_uses_numbered_placeholders() {
        let driver = PostgresDriver::new(server_config());
        let mut command =
            SqlCommand::sql_text("SELECT * FROM t WHERE id = @id AND id <> @id").unwrap();
        command.add_in_parameter("id", SqlType::Int, 1i32).unwrap();
        let bound = driver.prepare(&command).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = $1 AND id <> $2");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn test_prepare_stored_procedure_renders_call() {
        let driver = PostgresDriver::new(server_config());
        let mut command = SqlCommand::stored_procedure("audit.tally").unwrap();
        command
            .add_in_parameter("who", SqlType::VarChar, "ada")
            .unwrap()
            .add_out_parameter("total", SqlType::BigInt)
            .unwrap();
        let bound = driver.prepare(&command).unwrap();
        assert_eq!(bound.sql, "CALL \"audit\".\"tally\"($1, $2)");
        assert_eq!(bound.values[0].1, Value::Text("ada".into()));
        assert!(bound.values[1].1.is_null());
    }

    #[test]
    fn test_file_params_rejected() {
        let config = ConnectionConfig::new(
            Provider::Postgres,
            ConnectionParams::file("/tmp/nope.db", false),
        );
        let driver = PostgresDriver::new(config);
        assert!(driver.build_connect_options().is_err());
    }

    #[test]
    fn test_execute_before_connect_fails() {
        smol::block_on(async {
            let driver = PostgresDriver::new(server_config());
            let mut command = SqlCommand::sql_text("SELECT 1").unwrap();
            let err = driver.execute(&mut command).await.unwrap_err();
            assert!(matches!(err, Error::NotConnected));
        });
    }
}
