//! Backend abstraction traits and types.
//!
//! This module defines the seam between the `Database` facade and the
//! concrete drivers:
//!
//! - **Types** (`types`): provider enum, SQL type tags, connection
//!   configuration
//! - **Row/Value** (`row`): provider-agnostic value representation
//! - **Connection** (`connection`): the driver trait, result sets, and row
//!   streams

pub mod connection;
pub mod row;
pub mod types;

pub use connection::{BoxedConnection, ProviderConnection, ResultSet, RowStream};
pub use row::{ColumnInfo, Row, Value};
pub use types::{
    ConnectionConfig, ConnectionParams, DEFAULT_COMMAND_TIMEOUT, Provider, SqlType, SslMode,
};
