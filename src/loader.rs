//! Upload orchestration.
//!
//! [`upload`] drives any [`Connector`] through one load: validate, connect,
//! resolve the existence policy, then drop/create, insert and index inside a
//! single destination transaction. Either the whole sequence commits or the
//! destination is left as it was. [`load`] puts the mapper in front of it and
//! refuses to touch the destination when any column failed to transform.

use std::sync::OnceLock;

use clap::ValueEnum;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    connector::{ConnectionDescriptor, Connector, InsertSummary, Session, connector_for},
    dataset::TabularDataset,
    error::{ConnectorError, LoadError, ValidationError},
    mapper::{self, TransformationError},
    mapping::{ColumnMapping, validate_mappings},
};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Fail,
    Replace,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub if_exists: IfExists,
    pub batch_size: usize,
    pub index: Option<IndexRequest>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            if_exists: IfExists::Fail,
            batch_size: DEFAULT_BATCH_SIZE,
            index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub table_name: String,
    pub rows_inserted: usize,
    pub rows_failed: usize,
    pub message: String,
}

pub fn validate_batch_size(batch_size: usize) -> Result<(), ValidationError> {
    if (MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
        Ok(())
    } else {
        Err(ValidationError::BatchSize {
            value: batch_size,
            min: MIN_BATCH_SIZE,
            max: MAX_BATCH_SIZE,
        })
    }
}

fn table_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

pub fn validate_table_name(table_name: &str) -> Result<(), ValidationError> {
    if table_name_pattern().is_some_and(|pattern| pattern.is_match(table_name)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTableName(table_name.to_string()))
    }
}

fn validate_request(
    dataset: &TabularDataset,
    table_name: &str,
    mappings: &[ColumnMapping],
    options: &UploadOptions,
) -> Result<(), ValidationError> {
    validate_batch_size(options.batch_size)?;
    validate_table_name(table_name)?;
    validate_mappings(mappings)?;
    if let Some(missing) = mappings
        .iter()
        .map(ColumnMapping::column_name)
        .find(|name| dataset.column(name).is_none())
    {
        return Err(ValidationError::UnknownColumn(missing.to_string()));
    }
    if let Some(index) = &options.index {
        if index.columns.is_empty() {
            return Err(ValidationError::EmptyIndex);
        }
        if let Some(missing) = index
            .columns
            .iter()
            .find(|col| !mappings.iter().any(|m| m.column_name() == col.as_str()))
        {
            return Err(ValidationError::UnknownColumn(missing.clone()));
        }
    }
    Ok(())
}

/// Loads an already-transformed dataset into `table_name`.
///
/// Only the mapped columns are written, in mapping order. An insert failure
/// is reported as an unsuccessful [`UploadResult`] counting every row as
/// failed; every other failure is a [`LoadError`].
pub fn upload<C: Connector + ?Sized>(
    connector: &mut C,
    dataset: &TabularDataset,
    table_name: &str,
    mappings: &[ColumnMapping],
    options: &UploadOptions,
) -> Result<UploadResult, LoadError> {
    validate_request(dataset, table_name, mappings, options)?;
    let names: Vec<&str> = mappings.iter().map(ColumnMapping::column_name).collect();
    let projected = dataset
        .select(&names)
        .map_err(|err| ValidationError::UnknownColumn(err.to_string()))?;

    let mut session = Session::open(connector).map_err(LoadError::Connection)?;
    let exists = session
        .table_exists(table_name)
        .map_err(LoadError::Destination)?;
    if exists && options.if_exists == IfExists::Fail {
        info!("Table '{table_name}' exists and policy is fail; nothing written");
        return Err(LoadError::SchemaConflict(table_name.to_string()));
    }
    info!(
        "Loading {} row(s) into '{table_name}' (exists: {exists}, policy: {:?})",
        projected.row_count(),
        options.if_exists
    );

    session
        .begin_transaction()
        .map_err(LoadError::Destination)?;
    match write_table(&mut *session, &projected, table_name, mappings, exists, options) {
        Ok(summary) => {
            session
                .commit_transaction()
                .map_err(LoadError::Destination)?;
            let result = UploadResult {
                success: true,
                table_name: table_name.to_string(),
                rows_inserted: summary.rows_inserted,
                rows_failed: summary.rows_failed,
                message: format!(
                    "Successfully uploaded {} rows to table '{table_name}'",
                    summary.rows_inserted
                ),
            };
            info!("{}", result.message);
            Ok(result)
        }
        Err(err) => {
            warn!("Load into '{table_name}' failed; rolling back");
            if let Err(rollback) = session.rollback_transaction() {
                warn!("Rollback failed: {rollback}");
            }
            match err {
                ConnectorError::Insert { rows_failed, .. } => Ok(UploadResult {
                    success: false,
                    table_name: table_name.to_string(),
                    rows_inserted: 0,
                    rows_failed,
                    message: err.to_string(),
                }),
                other => Err(LoadError::Destination(other)),
            }
        }
    }
}

fn write_table<C: Connector + ?Sized>(
    connector: &mut C,
    dataset: &TabularDataset,
    table_name: &str,
    mappings: &[ColumnMapping],
    exists: bool,
    options: &UploadOptions,
) -> Result<InsertSummary, ConnectorError> {
    if !exists {
        connector.create_table(table_name, mappings)?;
    } else if options.if_exists == IfExists::Replace {
        connector.drop_table(table_name)?;
        connector.create_table(table_name, mappings)?;
    }
    let summary = connector.insert_data(table_name, dataset, options.batch_size)?;
    if let Some(index) = &options.index {
        connector.create_index(table_name, &index.columns, index.name.as_deref())?;
    }
    Ok(summary)
}

/// Transforms `dataset` and uploads the result through the descriptor's connector.
pub fn load(
    dataset: &TabularDataset,
    connection: &ConnectionDescriptor,
    table_name: &str,
    mappings: &[ColumnMapping],
    options: &UploadOptions,
) -> Result<UploadResult, LoadError> {
    connection.validate()?;
    validate_batch_size(options.batch_size)?;
    validate_table_name(table_name)?;
    validate_mappings(mappings)?;

    let (transformed, errors) = mapper::apply(dataset, mappings);
    if !errors.is_empty() {
        warn!(
            "Load into '{table_name}' vetoed: {} column(s) failed to transform",
            errors.len()
        );
        return Err(LoadError::Transformation(errors));
    }

    let mut connector = connector_for(connection).map_err(LoadError::Connection)?;
    upload(connector.as_mut(), &transformed, table_name, mappings, options)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_inserted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_failed: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TransformationError>,
}

impl LoadResponse {
    pub fn from_outcome(outcome: Result<UploadResult, LoadError>) -> Self {
        match outcome {
            Ok(result) => Self {
                success: result.success,
                message: result.message,
                table_name: Some(result.table_name),
                rows_inserted: Some(result.rows_inserted),
                rows_failed: Some(result.rows_failed),
                errors: Vec::new(),
            },
            Err(LoadError::Transformation(errors)) => Self {
                success: false,
                message: "Data transformation failed".to_string(),
                table_name: None,
                rows_inserted: None,
                rows_failed: None,
                errors,
            },
            Err(err) => Self {
                success: false,
                message: err.to_string(),
                table_name: None,
                rows_inserted: None,
                rows_failed: None,
                errors: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, dataset::Column, mapping::TargetType};

    fn dataset() -> TabularDataset {
        TabularDataset::new(vec![Column::new("id", vec![Some(Value::Integer(1))])]).unwrap()
    }

    #[test]
    fn batch_size_bounds_are_inclusive() {
        assert!(validate_batch_size(1).is_ok());
        assert!(validate_batch_size(10_000).is_ok());
        assert!(matches!(
            validate_batch_size(0),
            Err(ValidationError::BatchSize { value: 0, .. })
        ));
        assert!(validate_batch_size(10_001).is_err());
    }

    #[test]
    fn table_names_must_be_identifiers() {
        assert!(validate_table_name("sales_2024").is_ok());
        assert!(validate_table_name("_staging").is_ok());
        assert!(validate_table_name("2024_sales").is_err());
        assert!(validate_table_name("drop table; --").is_err());
        assert!(validate_table_name("").is_err());
    }

    #[test]
    fn validation_runs_before_any_io() {
        let options = UploadOptions {
            index: Some(IndexRequest {
                columns: vec!["nope".into()],
                name: None,
            }),
            ..UploadOptions::default()
        };
        let mappings = vec![ColumnMapping::new("id", TargetType::Integer)];
        // the path is never opened because validation fails first
        let mut connector = crate::connector::SqliteConnector::new(ConnectionDescriptor::sqlite(
            "/nonexistent/dir/never.db",
        ));
        let err = upload(&mut connector, &dataset(), "t", &mappings, &options).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation(ValidationError::UnknownColumn(ref c)) if c == "nope"
        ));
    }

    #[test]
    fn index_without_columns_is_its_own_error() {
        let options = UploadOptions {
            index: Some(IndexRequest {
                columns: Vec::new(),
                name: None,
            }),
            ..UploadOptions::default()
        };
        let mappings = vec![ColumnMapping::new("id", TargetType::Integer)];
        let mut connector = crate::connector::SqliteConnector::new(ConnectionDescriptor::sqlite(
            "/nonexistent/dir/never.db",
        ));
        let err = upload(&mut connector, &dataset(), "t", &mappings, &options).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation(ValidationError::EmptyIndex)
        ));
        assert_eq!(err.to_string(), "an index needs at least one column");
    }

    #[test]
    fn transformation_veto_becomes_error_list() {
        let response = LoadResponse::from_outcome(Err(LoadError::Transformation(vec![
            TransformationError {
                column: "qty".into(),
                error: "bad".into(),
            },
        ])));
        assert!(!response.success);
        assert_eq!(response.errors.len(), 1);
        assert!(response.rows_inserted.is_none());
    }
}
