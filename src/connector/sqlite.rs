use log::{debug, info, warn};
use rusqlite::{
    Connection, params, params_from_iter,
    types::{ToSql, ToSqlOutput},
};

use super::{
    ConnectionDescriptor, ConnectionTestResult, Connector, InsertSummary,
    ddl::{self, SqlDialect},
};
use crate::{
    data::Value,
    dataset::TabularDataset,
    error::ConnectorError,
    mapping::{ColumnMapping, TargetType},
};

const ENGINE: &str = "SQLite";

/// SQLite has no native boolean or temporal types; they are stored as INTEGER and TEXT.
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn native_type(&self, target: TargetType) -> &'static str {
        match target {
            TargetType::Integer | TargetType::Bigint | TargetType::Boolean => "INTEGER",
            TargetType::Float | TargetType::Decimal => "REAL",
            TargetType::String
            | TargetType::Text
            | TargetType::Date
            | TargetType::Datetime
            | TargetType::Timestamp
            | TargetType::Json => "TEXT",
        }
    }

    fn autoincrement(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Boolean(b) => ToSqlOutput::from(i64::from(*b)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Date(_) | Value::Timestamp(_) => ToSqlOutput::from(self.to_text()),
        })
    }
}

pub struct SqliteConnector {
    descriptor: ConnectionDescriptor,
    conn: Option<Connection>,
}

impl SqliteConnector {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            conn: None,
        }
    }

    fn conn(&self) -> Result<&Connection, ConnectorError> {
        self.conn.as_ref().ok_or(ConnectorError::NotConnected)
    }

    fn execute(&self, sql: &str) -> Result<(), ConnectorError> {
        debug!("{sql}");
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn server_version(&self) -> Result<String, ConnectorError> {
        let version: String = self
            .conn()?
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(format!("{ENGINE} {version}"))
    }
}

impl Connector for SqliteConnector {
    fn engine(&self) -> &'static str {
        ENGINE
    }

    fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connect(&mut self) -> Result<(), ConnectorError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let failed = |err: rusqlite::Error| ConnectorError::Connection {
            engine: ENGINE,
            message: err.to_string(),
        };
        let conn = Connection::open(&self.descriptor.database).map_err(failed)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(failed)?;
        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if !conn.is_autocommit() {
            warn!("Rolling back open transaction on '{}'", self.descriptor.database);
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                warn!("Rollback during disconnect failed: {err}");
            }
        }
        if let Err((_, err)) = conn.close() {
            warn!("Closing '{}' failed: {err}", self.descriptor.database);
        }
    }

    fn test_connection(&mut self) -> ConnectionTestResult {
        let was_connected = self.is_connected();
        let outcome = match self.connect() {
            Ok(()) => self.server_version(),
            Err(err) => Err(err),
        };
        if !was_connected {
            self.disconnect();
        }
        match outcome {
            Ok(version) => ConnectionTestResult {
                success: true,
                message: "Connection successful".to_string(),
                server_version: Some(version),
                database: Some(self.descriptor.database.clone()),
            },
            Err(err) => ConnectionTestResult {
                success: false,
                message: format!("Connection failed: {err}"),
                server_version: None,
                database: None,
            },
        }
    }

    fn table_exists(&self, table: &str) -> Result<bool, ConnectorError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create_table(
        &mut self,
        table: &str,
        mappings: &[ColumnMapping],
    ) -> Result<(), ConnectorError> {
        self.execute(&ddl::create_table_sql(&SqliteDialect, table, mappings))?;
        info!("Created table '{table}' with {} column(s)", mappings.len());
        Ok(())
    }

    fn drop_table(&mut self, table: &str) -> Result<(), ConnectorError> {
        self.execute(&ddl::drop_table_sql(&SqliteDialect, table))?;
        info!("Dropped table '{table}'");
        Ok(())
    }

    fn insert_data(
        &mut self,
        table: &str,
        dataset: &TabularDataset,
        batch_size: usize,
    ) -> Result<InsertSummary, ConnectorError> {
        let total = dataset.row_count();
        if total == 0 {
            return Ok(InsertSummary::default());
        }
        let sql = ddl::insert_sql(&SqliteDialect, table, &dataset.column_names());
        let conn = self.conn.as_mut().ok_or(ConnectorError::NotConnected)?;
        match insert_rows(conn, &sql, dataset, batch_size.max(1)) {
            Ok(rows_inserted) => Ok(InsertSummary {
                rows_inserted,
                rows_failed: 0,
            }),
            Err(err) => {
                warn!("Insert into '{table}' failed, rolled back {total} row(s): {err}");
                Err(ConnectorError::Insert {
                    table: table.to_string(),
                    rows_failed: total,
                    message: err.to_string(),
                })
            }
        }
    }

    fn create_index(
        &mut self,
        table: &str,
        columns: &[String],
        index_name: Option<&str>,
    ) -> Result<String, ConnectorError> {
        let name = index_name
            .map(str::to_string)
            .unwrap_or_else(|| ddl::default_index_name(table, columns));
        self.execute(&ddl::create_index_sql(&SqliteDialect, table, columns, &name))?;
        info!("Created index '{name}' on '{table}'");
        Ok(name)
    }

    fn row_count(&self, table: &str) -> Result<usize, ConnectorError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            SqliteDialect.quote_identifier(table)
        );
        let count: i64 = self.conn()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn begin_transaction(&mut self) -> Result<(), ConnectorError> {
        self.execute("BEGIN IMMEDIATE")
    }

    fn commit_transaction(&mut self) -> Result<(), ConnectorError> {
        self.execute("COMMIT")
    }

    fn rollback_transaction(&mut self) -> Result<(), ConnectorError> {
        if self.conn()?.is_autocommit() {
            return Ok(());
        }
        self.execute("ROLLBACK")
    }
}

// All chunks share one savepoint; dropping it uncommitted rolls every chunk back.
fn insert_rows(
    conn: &mut Connection,
    sql: &str,
    dataset: &TabularDataset,
    batch_size: usize,
) -> rusqlite::Result<usize> {
    let total = dataset.row_count();
    let savepoint = conn.savepoint()?;
    {
        let mut stmt = savepoint.prepare(sql)?;
        for (batch, start) in (0..total).step_by(batch_size).enumerate() {
            let end = (start + batch_size).min(total);
            for row in start..end {
                stmt.execute(params_from_iter(dataset.row(row)))?;
            }
            debug!("Batch {} wrote rows {}..{}", batch + 1, start + 1, end);
        }
    }
    savepoint.commit()?;
    Ok(total)
}
