//! Backend driver implementations.
//!
//! One module per supported backend, each implementing the
//! `ProviderConnection` trait over a SQLx pool:
//!
//! - **postgres**: PostgreSQL, numbered placeholders, `CALL` with output
//!   parameter write-back
//! - **mysql**: MySQL/MariaDB, positional placeholders, input-only `CALL`
//! - **sqlite**: embedded SQLite over a file or in-memory database
//!
//! [`ProviderFactory`] selects the driver from a connection configuration.

mod factory;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use factory::ProviderFactory;
pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;
