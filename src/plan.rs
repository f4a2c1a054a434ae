use std::{
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    connector::ConnectionDescriptor,
    error::ValidationError,
    loader::{self, DEFAULT_BATCH_SIZE, IfExists, IndexRequest, UploadOptions},
    mapping::{self, ColumnMapping},
    profile::DatasetProfile,
};

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// The YAML document that records every decision a load needs.
///
/// ```yaml
/// connection:
///   db_type: sqlite
///   database: warehouse.db
/// table_name: sales
/// if_exists: replace
/// batch_size: 500
/// index:
///   columns: [region]
/// columns:
///   - column_name: id
///     target_type: integer
///     is_primary_key: true
///     is_nullable: false
///   - column_name: amount
///     target_type: decimal
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPlan {
    pub connection: ConnectionDescriptor,
    pub table_name: String,
    #[serde(default)]
    pub if_exists: IfExists,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexRequest>,
    pub columns: Vec<ColumnMapping>,
}

impl LoadPlan {
    /// Starter plan taking every profiler suggestion as-is: all columns nullable, no keys.
    pub fn from_profile(profile: &DatasetProfile, connection: ConnectionDescriptor) -> Self {
        let columns = profile
            .columns
            .iter()
            .map(|column| {
                ColumnMapping::new(&column.name, column.suggested_type)
                    .with_source_type(column.dtype.as_str())
            })
            .collect();
        Self {
            connection,
            table_name: profile.table_name.clone(),
            if_exists: IfExists::Fail,
            batch_size: DEFAULT_BATCH_SIZE,
            index: None,
            columns,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening load plan {path:?}"))?;
        let plan: LoadPlan = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing load plan {path:?}"))?;
        plan.validate()
            .with_context(|| format!("Validating load plan {path:?}"))?;
        Ok(plan)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating load plan {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing load plan YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing load plan to YAML string")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.connection.validate()?;
        loader::validate_table_name(&self.table_name)?;
        loader::validate_batch_size(self.batch_size)?;
        mapping::validate_mappings(&self.columns)
    }

    pub fn options(&self) -> UploadOptions {
        UploadOptions {
            if_exists: self.if_exists,
            batch_size: self.batch_size,
            index: self.index.clone(),
        }
    }
}
