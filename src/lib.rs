//! Provider-agnostic SQL commands, typed parameters, and row mapping.
//!
//! `sqlbridge` wraps the SQLx backends for PostgreSQL, MySQL, and SQLite
//! behind one small surface: build a [`SqlCommand`] with named `@parameters`,
//! execute it through a [`Database`] facade, and turn result rows into typed
//! entities with plain mapping functions and null-safe [`coerce`] helpers.
//!
//! Every operation is a direct pass-through to the underlying client:
//! pooling belongs to SQLx, provider errors propagate unchanged, and the
//! facade itself holds nothing but its configuration.
//!
//! ```
//! use sqlbridge::{SqlCommand, SqlType};
//! use sqlbridge::coerce::convert_or;
//! use sqlbridge::Value;
//!
//! let mut command = SqlCommand::sql_text(
//!     "SELECT name FROM users WHERE id = @id",
//! )?;
//! command.add_in_parameter("id", SqlType::Int, 42i32)?;
//!
//! // Parameter names carry the marker exactly once.
//! assert_eq!(command.parameter("id").unwrap().name(), "@id");
//!
//! // Coercion never fails; it defaults.
//! assert_eq!(convert_or(&Value::Null, "guest".to_string()), "guest");
//! # Ok::<(), sqlbridge::Error>(())
//! ```
//!
//! Executing against a live database goes through [`Database`]:
//!
//! ```no_run
//! use sqlbridge::{Database, SqlType};
//!
//! # async fn demo() -> sqlbridge::Result<()> {
//! let db = Database::from_url("sqlite://app.db")?;
//! db.connect().await?;
//!
//! let mut insert = db.sql_text("INSERT INTO users (name) VALUES (@name)")?;
//! insert.add_in_parameter("name", SqlType::Text, "ada")?;
//! let affected = db.execute_non_query(&mut insert).await?;
//! assert_eq!(affected, 1);
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod coerce;
pub mod command;
pub mod database;
pub mod drivers;
pub mod error;
pub mod mapper;
pub mod params;
pub mod table;
pub mod traits;

pub use command::{CommandKind, SqlCommand};
pub use database::Database;
pub use drivers::ProviderFactory;
pub use error::{Error, Result};
pub use mapper::EntityMapper;
pub use params::{PARAMETER_MARKER, ParameterDirection, SqlParameter, format_parameter_name};
pub use table::{DataColumn, DataTable, DataTableBuilder};
pub use traits::{
    BoxedConnection, ColumnInfo, ConnectionConfig, ConnectionParams, Provider, ProviderConnection,
    ResultSet, Row, RowStream, SqlType, SslMode, Value,
};
