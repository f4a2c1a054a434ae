//! Destination connectors.
//!
//! A [`Connector`] is the capability set the loader needs from a destination
//! engine. Every method except [`Connector::connect`],
//! [`Connector::disconnect`] and [`Connector::test_connection`] requires an
//! open handle and returns [`ConnectorError::NotConnected`] otherwise.
//! Callers normally hold the handle through a [`Session`], which disconnects
//! on every exit path.

pub mod ddl;
pub mod sqlite;

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::TabularDataset,
    error::{ConnectorError, ValidationError},
    mapping::ColumnMapping,
};

pub use sqlite::SqliteConnector;

pub const POSTGRESQL_DEFAULT_PORT: u16 = 5432;
pub const MYSQL_DEFAULT_PORT: u16 = 3306;
pub const MSSQL_DEFAULT_PORT: u16 = 1433;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Postgresql,
    Mysql,
    Sqlite,
    Mssql,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Postgresql => "postgresql",
            DatabaseType::Mysql => "mysql",
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Mssql => "mssql",
        }
    }

    /// Server engines listen on a port; embedded ones have none.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::Postgresql => Some(POSTGRESQL_DEFAULT_PORT),
            DatabaseType::Mysql => Some(MYSQL_DEFAULT_PORT),
            DatabaseType::Mssql => Some(MSSQL_DEFAULT_PORT),
            DatabaseType::Sqlite => None,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub db_type: DatabaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database name, or the file path for embedded engines.
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl ConnectionDescriptor {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            host: None,
            port: None,
            database: path.into(),
            username: None,
            password: None,
        }
    }

    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = |field: &'static str| ValidationError::MissingConnectionField {
            db_type: self.db_type,
            field,
        };
        if self.database.trim().is_empty() {
            return Err(missing("database"));
        }
        if self.db_type == DatabaseType::Sqlite {
            return Ok(());
        }
        if self.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
            return Err(missing("host"));
        }
        if self.username.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(missing("username"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InsertSummary {
    pub rows_inserted: usize,
    pub rows_failed: usize,
}

pub trait Connector {
    /// Human-readable engine name used in messages.
    fn engine(&self) -> &'static str;

    fn descriptor(&self) -> &ConnectionDescriptor;

    fn is_connected(&self) -> bool;

    /// Opens the handle. Calling it on an open connector is a no-op.
    fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Releases the handle, rolling back any open transaction. Always safe to call.
    fn disconnect(&mut self);

    /// Connects, reads the engine identity, and restores the previous state.
    /// Failures are reported in the result, never returned as errors.
    fn test_connection(&mut self) -> ConnectionTestResult;

    fn table_exists(&self, table: &str) -> Result<bool, ConnectorError>;

    fn create_table(&mut self, table: &str, mappings: &[ColumnMapping])
    -> Result<(), ConnectorError>;

    fn drop_table(&mut self, table: &str) -> Result<(), ConnectorError>;

    /// Inserts every row in chunks of `batch_size` as one unit of work.
    ///
    /// On failure nothing from this call remains and the error reports every
    /// source row as failed.
    fn insert_data(
        &mut self,
        table: &str,
        dataset: &TabularDataset,
        batch_size: usize,
    ) -> Result<InsertSummary, ConnectorError>;

    /// Creates an index and returns the name it was created under.
    fn create_index(
        &mut self,
        table: &str,
        columns: &[String],
        index_name: Option<&str>,
    ) -> Result<String, ConnectorError>;

    fn row_count(&self, table: &str) -> Result<usize, ConnectorError>;

    fn begin_transaction(&mut self) -> Result<(), ConnectorError>;

    fn commit_transaction(&mut self) -> Result<(), ConnectorError>;

    fn rollback_transaction(&mut self) -> Result<(), ConnectorError>;
}

/// An open connection that is released when dropped.
pub struct Session<'a, C: Connector + ?Sized> {
    connector: &'a mut C,
}

impl<'a, C: Connector + ?Sized> Session<'a, C> {
    pub fn open(connector: &'a mut C) -> Result<Self, ConnectorError> {
        connector.connect()?;
        debug!(
            "Opened {} session for '{}'",
            connector.engine(),
            connector.descriptor().database
        );
        Ok(Self { connector })
    }
}

impl<C: Connector + ?Sized> Deref for Session<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.connector
    }
}

impl<C: Connector + ?Sized> DerefMut for Session<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connector
    }
}

impl<C: Connector + ?Sized> Drop for Session<'_, C> {
    fn drop(&mut self) {
        self.connector.disconnect();
        debug!("Closed {} session", self.connector.engine());
    }
}

/// Builds the connector for a descriptor's engine.
pub fn connector_for(
    descriptor: &ConnectionDescriptor,
) -> Result<Box<dyn Connector>, ConnectorError> {
    match descriptor.db_type {
        DatabaseType::Sqlite => Ok(Box::new(SqliteConnector::new(descriptor.clone()))),
        other => Err(ConnectorError::Unsupported(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_are_distinct_per_engine() {
        assert_eq!(DatabaseType::Postgresql.default_port(), Some(5432));
        assert_eq!(DatabaseType::Mysql.default_port(), Some(3306));
        assert_eq!(DatabaseType::Mssql.default_port(), Some(1433));
        assert_eq!(DatabaseType::Sqlite.default_port(), None);
    }

    #[test]
    fn server_descriptors_require_host_and_username() {
        let mut descriptor = ConnectionDescriptor {
            db_type: DatabaseType::Postgresql,
            host: None,
            port: None,
            database: "warehouse".into(),
            username: Some("loader".into()),
            password: None,
        };
        assert_eq!(
            descriptor.validate(),
            Err(ValidationError::MissingConnectionField {
                db_type: DatabaseType::Postgresql,
                field: "host"
            })
        );
        descriptor.host = Some("db.internal".into());
        assert!(descriptor.validate().is_ok());
        assert_eq!(descriptor.effective_port(), Some(5432));

        assert!(ConnectionDescriptor::sqlite("").validate().is_err());
        assert!(ConnectionDescriptor::sqlite("local.db").validate().is_ok());
    }

    #[test]
    fn connector_for_rejects_engines_without_a_connector() {
        let mut descriptor = ConnectionDescriptor::sqlite("x.db");
        descriptor.db_type = DatabaseType::Mysql;
        assert!(matches!(
            connector_for(&descriptor),
            Err(ConnectorError::Unsupported(DatabaseType::Mysql))
        ));
    }

    #[test]
    fn password_is_never_serialized() {
        let mut descriptor = ConnectionDescriptor::sqlite("x.db");
        descriptor.password = Some("hunter2".into());
        let yaml = serde_yaml::to_string(&descriptor).unwrap();
        assert!(!yaml.contains("hunter2"));
    }
}
