//! Connection factory.
//!
//! Maps a validated [`ConnectionConfig`] to the matching driver. This is the
//! single place where a backend is selected; everything above it works
//! against the [`ProviderConnection`] trait.
//!
//! [`ProviderConnection`]: crate::traits::ProviderConnection

use super::mysql::MySqlDriver;
use super::postgres::PostgresDriver;
use super::sqlite::SqliteDriver;
use crate::error::Result;
use crate::traits::{BoxedConnection, ConnectionConfig, Provider};

/// Factory producing boxed driver connections.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the driver matching the configuration.
    ///
    /// The configuration is validated first, so a provider/parameter
    /// mismatch fails here rather than at connect time.
    pub fn create(config: ConnectionConfig) -> Result<BoxedConnection> {
        config.validate()?;
        Ok(match config.provider {
            Provider::Postgres => PostgresDriver::boxed(config),
            Provider::MySql => MySqlDriver::boxed(config),
            Provider::Sqlite => SqliteDriver::boxed(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ConnectionParams;

    #[test]
    fn test_factory_creates_each_provider() {
        let sqlite = ProviderFactory::create(ConnectionConfig::new(
            Provider::Sqlite,
            ConnectionParams::in_memory(),
        ))
        .unwrap();
        assert_eq!(sqlite.provider(), Provider::Sqlite);

        let postgres = ProviderFactory::create(ConnectionConfig::new(
            Provider::Postgres,
            ConnectionParams::server("localhost", 5432, "u", "p", "db"),
        ))
        .unwrap();
        assert_eq!(postgres.provider(), Provider::Postgres);

        let mysql = ProviderFactory::create(ConnectionConfig::new(
            Provider::MySql,
            ConnectionParams::server("localhost", 3306, "u", "p", "db"),
        ))
        .unwrap();
        assert_eq!(mysql.provider(), Provider::MySql);
    }

    #[test]
    fn test_factory_rejects_mismatched_config() {
        let result = ProviderFactory::create(ConnectionConfig::new(
            Provider::Postgres,
            ConnectionParams::in_memory(),
        ));
        assert!(result.is_err());
    }
}
