//! SQLite driver.

mod connection;
mod types;

pub use connection::SqliteDriver;
