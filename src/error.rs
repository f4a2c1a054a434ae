use thiserror::Error;

use crate::{connector::DatabaseType, mapper::TransformationError, mapping::TargetType};

/// Rejections raised while building a load request, before any destination I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("column name must not be empty")]
    EmptyColumnName,

    #[error(
        "max_length is only valid for string or text columns (column '{column}' targets {target})"
    )]
    MaxLengthNotAllowed { column: String, target: TargetType },

    #[error("max_length for column '{0}' must be greater than zero")]
    ZeroMaxLength(String),

    #[error("unknown target type '{0}'")]
    UnknownTargetType(String),

    #[error("column '{0}' is mapped more than once")]
    DuplicateMapping(String),

    #[error("column '{0}' not found in dataset")]
    UnknownColumn(String),

    #[error("an index needs at least one column")]
    EmptyIndex,

    #[error("at least one column mapping is required")]
    NoMappings,

    #[error("invalid table name '{0}': use letters, digits and underscores, not starting with a digit")]
    InvalidTableName(String),

    #[error("batch_size must be between {min} and {max}, got {value}")]
    BatchSize { value: usize, min: usize, max: usize },

    #[error("{db_type} connections require '{field}'")]
    MissingConnectionField { db_type: DatabaseType, field: &'static str },
}

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Failed to connect to {engine}: {message}")]
    Connection { engine: &'static str, message: String },

    #[error("no open connection to the destination; connect first")]
    NotConnected,

    #[error("unsupported database type: {0}")]
    Unsupported(DatabaseType),

    #[error("insert into '{table}' failed and was rolled back ({rows_failed} row(s) not loaded): {message}")]
    Insert {
        table: String,
        rows_failed: usize,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Connection(ConnectorError),

    #[error("Table '{0}' already exists")]
    SchemaConflict(String),

    #[error("data transformation failed for {} column(s)", .0.len())]
    Transformation(Vec<TransformationError>),

    #[error("destination error: {0}")]
    Destination(ConnectorError),
}
