#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use sheetload::{
    connector::{ConnectionDescriptor, SqliteConnector},
    data::Value,
    dataset::{Column, TabularDataset},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn database(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn descriptor(&self, name: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::sqlite(self.database(name).to_string_lossy().to_string())
    }

    pub fn connector(&self, name: &str) -> SqliteConnector {
        SqliteConnector::new(self.descriptor(name))
    }

    /// Opens the database directly, bypassing the connector, for assertions.
    pub fn open(&self, name: &str) -> Connection {
        Connection::open(self.database(name)).expect("open sqlite database")
    }

    pub fn count_rows(&self, name: &str, table: &str) -> i64 {
        self.open(name)
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })
            .expect("count rows")
    }

    pub fn table_exists(&self, name: &str, table: &str) -> bool {
        let count: i64 = self
            .open(name)
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .expect("query sqlite_master");
        count > 0
    }
}

/// Builds a dataset whose columns hold text cells, `None` meaning null.
pub fn text_dataset(columns: &[(&str, &[Option<&str>])]) -> TabularDataset {
    TabularDataset::new(
        columns
            .iter()
            .map(|(name, cells)| {
                Column::new(*name, cells.iter().map(|c| c.map(Value::from)).collect())
            })
            .collect(),
    )
    .expect("equal-length columns")
}

pub fn integer_column(name: &str, values: impl IntoIterator<Item = Option<i64>>) -> Column {
    Column::new(name, values.into_iter().map(|v| v.map(Value::Integer)).collect())
}
