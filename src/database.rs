//! The database facade.
//!
//! [`Database`] binds a backend driver, produced by the factory from an
//! immutable configuration, and exposes the command surface: create text or
//! stored-procedure commands stamped with the configured timeout, execute
//! them as non-query/reader/table, read output parameters back, and discover
//! stored-procedure signatures.
//!
//! A `Database` holds no state beyond its configuration and the driver's
//! pool handle, so sharing one instance across tasks is as safe as the
//! underlying pool. Closing is explicit; per-operation connection checkout
//! and return is the pool's responsibility and happens on every exit path.

use crate::command::{CommandKind, SqlCommand};
use crate::drivers::ProviderFactory;
use crate::error::{Error, Result};
use crate::table::DataTable;
use crate::traits::{BoxedConnection, ConnectionConfig, Provider, ResultSet, Row, RowStream};

/// Facade over one configured backend connection.
pub struct Database {
    connection: BoxedConnection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("provider", &self.provider())
            .field("target", &self.config().display_name())
            .finish()
    }
}

impl Database {
    /// Create a database facade from a configuration.
    ///
    /// The configuration is validated and the driver selected here; no I/O
    /// happens until [`connect`](Self::connect).
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Ok(Self {
            connection: ProviderFactory::create(config)?,
        })
    }

    /// Create a database facade from a connection URL.
    pub fn from_url(url: &str) -> Result<Self> {
        Self::new(ConnectionConfig::from_url(url)?)
    }

    /// The backend this facade talks to.
    pub fn provider(&self) -> Provider {
        self.connection.provider()
    }

    /// The configuration this facade was created from.
    pub fn config(&self) -> &ConnectionConfig {
        self.connection.config()
    }

    /// Open the underlying connection pool.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) -> Result<()> {
        self.connection.close().await
    }

    /// Whether the pool is open.
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Create a free-form SQL text command with the configured timeout.
    pub fn sql_text(&self, text: &str) -> Result<SqlCommand> {
        Ok(SqlCommand::sql_text(text)?.with_timeout(self.config().command_timeout))
    }

    /// Create a stored-procedure command with the configured timeout.
    pub fn stored_proc(&self, name: &str) -> Result<SqlCommand> {
        Ok(SqlCommand::stored_procedure(name)?.with_timeout(self.config().command_timeout))
    }

    /// Execute a command that returns no rows.
    ///
    /// Returns the affected-row count and writes output parameter values
    /// back onto the command where the backend supports them.
    pub async fn execute_non_query(&self, command: &mut SqlCommand) -> Result<u64> {
        tracing::debug!(
            kind = ?command.kind(),
            parameters = command.parameters().len(),
            "executing non-query"
        );
        let affected = self.connection.execute(command).await?;
        tracing::debug!(rows_affected = affected, "non-query complete");
        Ok(affected)
    }

    /// Execute a command and stream its rows.
    ///
    /// The stream is lazy, single-pass, and cannot be restarted; drop it to
    /// abandon the rest of the cursor.
    pub async fn execute_reader(&self, command: &SqlCommand) -> Result<RowStream> {
        tracing::debug!(
            kind = ?command.kind(),
            parameters = command.parameters().len(),
            "executing reader"
        );
        self.connection.stream(command).await
    }

    /// Execute a command and materialize the full result.
    pub async fn execute_result(&self, command: &SqlCommand) -> Result<ResultSet> {
        tracing::debug!(
            kind = ?command.kind(),
            parameters = command.parameters().len(),
            "executing query"
        );
        let result = self.connection.query(command).await?;
        tracing::debug!(rows = result.row_count(), "query complete");
        Ok(result)
    }

    /// Execute a command and load the result into a [`DataTable`].
    pub async fn execute_table(&self, name: &str, command: &SqlCommand) -> Result<DataTable> {
        let result = self.execute_result(command).await?;
        DataTable::from_result_set(name, &result)
    }

    /// Execute a command and return its first row, if any.
    pub async fn execute_row(&self, command: &SqlCommand) -> Result<Option<Row>> {
        let mut result = self.connection.query(command).await?;
        if result.rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(result.rows.swap_remove(0)))
        }
    }

    /// Discover a stored procedure's parameters and add them to the command.
    ///
    /// Parameters the caller already declared are kept as-is, so values set
    /// before discovery survive it. Only meaningful for stored-procedure
    /// commands.
    pub async fn discover_parameters(&self, command: &mut SqlCommand) -> Result<()> {
        if command.kind() != CommandKind::StoredProcedure {
            return Err(Error::Unsupported {
                provider: self.provider(),
                operation: "parameter discovery on text commands",
            });
        }
        let discovered = self.connection.derive_parameters(command.text()).await?;
        tracing::debug!(
            procedure = command.text(),
            discovered = discovered.len(),
            "discovered stored procedure parameters"
        );
        for parameter in discovered {
            if command.parameter(parameter.name()).is_none() {
                command.add_parameter(parameter)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::convert;
    use crate::mapper;
    use crate::traits::{ConnectionParams, SqlType, Value};
    use futures::StreamExt;
    use std::time::Duration;

    fn sqlite_in_memory() -> Database {
        Database::new(ConnectionConfig::new(
            Provider::Sqlite,
            ConnectionParams::in_memory(),
        ))
        .unwrap()
    }

    #[test]
    fn test_commands_inherit_configured_timeout() {
        let db = Database::new(
            ConnectionConfig::new(Provider::Sqlite, ConnectionParams::in_memory())
                .with_command_timeout(Duration::from_secs(7)),
        )
        .unwrap();
        let command = db.sql_text("SELECT 1").unwrap();
        assert_eq!(command.timeout(), Duration::from_secs(7));

        let command = db.stored_proc("tally").unwrap();
        assert_eq!(command.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_empty_command_text_fails_before_io() {
        let db = sqlite_in_memory();
        assert!(matches!(db.sql_text(""), Err(Error::EmptyCommandText)));
        assert!(matches!(db.stored_proc(" "), Err(Error::EmptyCommandText)));
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let result = Database::new(ConnectionConfig::new(
            Provider::Postgres,
            ConnectionParams::in_memory(),
        ));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_url_selects_provider() {
        let db = Database::from_url("sqlite::memory:").unwrap();
        assert_eq!(db.provider(), Provider::Sqlite);
    }

    #[test]
    fn test_discovery_rejected_for_text_commands() {
        smol::block_on(async {
            let db = sqlite_in_memory();
            let mut command = db.sql_text("SELECT 1").unwrap();
            let err = db.discover_parameters(&mut command).await.unwrap_err();
            assert!(matches!(err, Error::Unsupported { .. }));
        });
    }

    #[test]
    fn test_facade_round_trip_on_sqlite() {
        smol::block_on(async {
            let db = sqlite_in_memory();
            db.connect().await.unwrap();

            let mut create = db
                .sql_text("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
                .unwrap();
            db.execute_non_query(&mut create).await.unwrap();

            for (id, body) in [(1i32, "first"), (2, "second"), (3, "third")] {
                let mut insert = db
                    .sql_text("INSERT INTO notes (id, body) VALUES (@id, @body)")
                    .unwrap();
                insert
                    .add_in_parameter("id", SqlType::Int, id)
                    .unwrap()
                    .add_in_parameter("body", SqlType::Text, body)
                    .unwrap();
                assert_eq!(db.execute_non_query(&mut insert).await.unwrap(), 1);
            }

            let select = db.sql_text("SELECT id, body FROM notes ORDER BY id").unwrap();
            let table = db.execute_table("notes", &select).await.unwrap();
            assert_eq!(table.row_count(), 3);
            assert_eq!(table.columns()[1].name(), "body");

            let row = db.execute_row(&select).await.unwrap().unwrap();
            assert_eq!(convert::<i64>(row.get_named_or_null("id")), 1);

            let mut missing = db
                .sql_text("SELECT id FROM notes WHERE id = @id")
                .unwrap();
            missing.add_in_parameter("id", SqlType::Int, 99i32).unwrap();
            assert!(db.execute_row(&missing).await.unwrap().is_none());

            db.close().await.unwrap();
        });
    }

    #[test]
    fn test_facade_reader_streams_in_order() {
        smol::block_on(async {
            let db = sqlite_in_memory();
            db.connect().await.unwrap();

            let mut create = db.sql_text("CREATE TABLE seq (n INTEGER)").unwrap();
            db.execute_non_query(&mut create).await.unwrap();
            for n in 0..10i32 {
                let mut insert = db.sql_text("INSERT INTO seq (n) VALUES (@n)").unwrap();
                insert.add_in_parameter("n", SqlType::Int, n).unwrap();
                db.execute_non_query(&mut insert).await.unwrap();
            }

            let select = db.sql_text("SELECT n FROM seq ORDER BY n").unwrap();
            let reader = db.execute_reader(&select).await.unwrap();
            let mut mapped = mapper::map_stream(reader, |row| convert::<i64>(row.get_or_null(0)));

            let mut seen = Vec::new();
            while let Some(item) = mapped.next().await {
                seen.push(item.unwrap());
            }
            assert_eq!(seen, (0..10).collect::<Vec<i64>>());

            db.close().await.unwrap();
        });
    }
}
