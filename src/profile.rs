//! Column profiling and target type suggestions.
//!
//! Profiling is a pure function of the dataset: the same input always yields
//! the same profiles, and ambiguous columns fall back to `string` instead of
//! failing.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
};

use anyhow::{Result, anyhow};
use heck::ToSnakeCase;
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;

use crate::{
    data::{Value, parse_flexible_datetime},
    dataset::{Column, ColumnKind, TabularDataset},
    mapping::TargetType,
};

pub const SAMPLE_VALUES: usize = 5;
pub const PREVIEW_ROWS: usize = 5;
pub const TOP_VALUES: usize = 10;

const DATE_SNIFF_LIMIT: usize = 100;
const STRING_MAX_LENGTH: usize = 255;
const BOOLEAN_TOKENS: &[&str] = &["true", "false", "1", "0", "yes", "no"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: ColumnKind,
    pub missing_count: usize,
    pub unique_count: usize,
    pub sample_values: Vec<Value>,
    pub suggested_type: TargetType,
    pub is_numeric: bool,
    pub is_datetime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub table_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub preview: Vec<Vec<Option<Value>>>,
    pub has_missing_values: bool,
    pub total_missing_values: usize,
}

/// Profiles every column, keyed by column name.
pub fn profile(dataset: &TabularDataset) -> BTreeMap<String, ColumnProfile> {
    dataset
        .columns()
        .iter()
        .map(|column| (column.name().to_string(), profile_column(column)))
        .collect()
}

pub fn profile_column(column: &Column) -> ColumnProfile {
    let suggested_type = suggest_type(column);
    debug!(
        "Column '{}' ({}) suggests {}",
        column.name(),
        column.kind(),
        suggested_type
    );
    ColumnProfile {
        name: column.name().to_string(),
        dtype: column.kind(),
        missing_count: column.null_count(),
        unique_count: distinct_count(column),
        sample_values: column.non_null().take(SAMPLE_VALUES).cloned().collect(),
        suggested_type,
        is_numeric: column.kind().is_numeric(),
        is_datetime: column.kind().is_temporal(),
    }
}

/// Suggests a target type; the first matching rule wins.
pub fn suggest_type(column: &Column) -> TargetType {
    if column.non_null().next().is_none() {
        return TargetType::String;
    }
    match column.kind() {
        ColumnKind::Integer => {
            let max = column
                .non_null()
                .filter_map(|value| match value {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            if max > i64::from(i32::MAX) {
                TargetType::Bigint
            } else {
                TargetType::Integer
            }
        }
        ColumnKind::Float => TargetType::Float,
        ColumnKind::Boolean => TargetType::Boolean,
        ColumnKind::Date => TargetType::Date,
        ColumnKind::Timestamp => TargetType::Datetime,
        ColumnKind::Text | ColumnKind::Empty => suggest_textual(column),
    }
}

fn suggest_textual(column: &Column) -> TargetType {
    let sample: Vec<String> = column
        .non_null()
        .take(DATE_SNIFF_LIMIT)
        .map(Value::to_text)
        .collect();
    if sample
        .iter()
        .all(|value| parse_flexible_datetime(value).is_some())
    {
        return TargetType::Date;
    }
    if sample
        .iter()
        .all(|value| BOOLEAN_TOKENS.contains(&value.to_lowercase().as_str()))
    {
        return TargetType::Boolean;
    }
    let max_length = column
        .non_null()
        .map(|value| value.to_text().chars().count())
        .max()
        .unwrap_or(0);
    if max_length > STRING_MAX_LENGTH {
        TargetType::Text
    } else {
        TargetType::String
    }
}

fn distinct_count(column: &Column) -> usize {
    column
        .non_null()
        .map(Value::to_text)
        .collect::<HashSet<_>>()
        .len()
}

/// Snake-cased file stem, made safe to use as a table identifier.
pub fn suggest_table_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_snake_case();
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match cleaned.chars().next() {
        None => "imported_data".to_string(),
        Some(first) if first.is_ascii_digit() => format!("table_{cleaned}"),
        Some(_) => cleaned,
    }
}

pub fn profile_dataset(dataset: &TabularDataset, source: Option<&Path>) -> DatasetProfile {
    let columns: Vec<ColumnProfile> = dataset.columns().iter().map(profile_column).collect();
    let total_missing_values = dataset.total_missing();
    info!(
        "Profiled {} column(s) across {} row(s)",
        dataset.column_count(),
        dataset.row_count()
    );
    DatasetProfile {
        table_name: source
            .map(suggest_table_name)
            .unwrap_or_else(|| "imported_data".to_string()),
        row_count: dataset.row_count(),
        column_count: dataset.column_count(),
        columns,
        preview: dataset.head(PREVIEW_ROWS),
        has_missing_values: total_missing_values > 0,
        total_missing_values,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent with fewer than two values.
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthSummary {
    pub min_length: usize,
    pub max_length: usize,
    pub avg_length: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column_name: String,
    pub dtype: ColumnKind,
    pub count: usize,
    pub missing_count: usize,
    pub unique_count: usize,
    #[serde(flatten)]
    pub numeric: Option<NumericSummary>,
    #[serde(flatten)]
    pub lengths: Option<LengthSummary>,
    pub top_values: Vec<ValueCount>,
}

pub fn column_stats(dataset: &TabularDataset, column_name: &str) -> Result<ColumnStats> {
    let column = dataset
        .column(column_name)
        .ok_or_else(|| anyhow!("Column '{column_name}' not found in dataset"))?;
    let numeric = column
        .kind()
        .is_numeric()
        .then(|| numeric_summary(column))
        .flatten();
    let lengths = (column.kind() == ColumnKind::Text)
        .then(|| length_summary(column))
        .flatten();
    Ok(ColumnStats {
        column_name: column.name().to_string(),
        dtype: column.kind(),
        count: column.len() - column.null_count(),
        missing_count: column.null_count(),
        unique_count: distinct_count(column),
        numeric,
        lengths,
        top_values: top_values(column, TOP_VALUES),
    })
}

fn numeric_summary(column: &Column) -> Option<NumericSummary> {
    let values: Vec<f64> = column
        .non_null()
        .filter_map(Value::as_f64)
        .filter(|v| !v.is_nan())
        .sorted_by(|a, b| a.total_cmp(b))
        .collect();
    let (&min, &max) = (values.first()?, values.last()?);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    let std = (values.len() > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    });
    Some(NumericSummary {
        min,
        max,
        mean,
        median,
        std,
    })
}

fn length_summary(column: &Column) -> Option<LengthSummary> {
    let lengths: Vec<usize> = column
        .non_null()
        .map(|value| value.to_text().chars().count())
        .collect();
    let (min_length, max_length) = lengths.iter().copied().minmax().into_option()?;
    Some(LengthSummary {
        min_length,
        max_length,
        avg_length: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
    })
}

fn top_values(column: &Column, limit: usize) -> Vec<ValueCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.non_null() {
        *counts.entry(value.to_text()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .sorted_by(|(a_value, a_count), (b_value, b_count)| {
            b_count.cmp(a_count).then_with(|| a_value.cmp(b_value))
        })
        .take(limit)
        .map(|(value, count)| ValueCount { value, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(name: &str, values: &[i64]) -> Column {
        Column::new(name, values.iter().map(|v| Some(Value::Integer(*v))).collect())
    }

    fn texts(name: &str, values: &[&str]) -> Column {
        Column::new(name, values.iter().map(|v| Some(Value::from(*v))).collect())
    }

    #[test]
    fn integer_columns_split_on_32_bit_bound() {
        assert_eq!(suggest_type(&ints("a", &[1, 2, 3, 2_147_483_648])), TargetType::Bigint);
        assert_eq!(suggest_type(&ints("a", &[1, 2, 3])), TargetType::Integer);
        assert_eq!(suggest_type(&ints("a", &[2_147_483_647])), TargetType::Integer);
    }

    #[test]
    fn textual_columns_detect_dates_booleans_and_length() {
        assert_eq!(
            suggest_type(&texts("d", &["2024-01-01", "2024-02-01"])),
            TargetType::Date
        );
        assert_eq!(suggest_type(&texts("b", &["yes", "no", "yes"])), TargetType::Boolean);
        assert_eq!(suggest_type(&texts("b", &["True", "0"])), TargetType::Boolean);
        let long = "x".repeat(300);
        assert_eq!(suggest_type(&texts("t", &[long.as_str()])), TargetType::Text);
        let short = "y".repeat(50);
        assert_eq!(suggest_type(&texts("s", &[short.as_str()])), TargetType::String);
    }

    #[test]
    fn all_null_column_suggests_string() {
        let column = Column::new("empty", vec![None, None]);
        assert_eq!(suggest_type(&column), TargetType::String);
        let profile = profile_column(&column);
        assert_eq!(profile.missing_count, 2);
        assert!(profile.sample_values.is_empty());
    }

    #[test]
    fn profile_reports_counts_and_samples() {
        let column = Column::new(
            "n",
            vec![
                Some(Value::Integer(1)),
                None,
                Some(Value::Integer(1)),
                Some(Value::Integer(2)),
                Some(Value::Integer(3)),
                Some(Value::Integer(4)),
                Some(Value::Integer(5)),
            ],
        );
        let profile = profile_column(&column);
        assert_eq!(profile.missing_count, 1);
        assert_eq!(profile.unique_count, 5);
        assert_eq!(profile.sample_values.len(), SAMPLE_VALUES);
        assert!(profile.is_numeric);
        assert!(!profile.is_datetime);
    }

    #[test]
    fn suggest_table_name_snake_cases_stem() {
        assert_eq!(suggest_table_name(Path::new("/tmp/Sales Report.csv")), "sales_report");
        assert_eq!(suggest_table_name(Path::new("2024-orders.csv")), "table_2024_orders");
    }

    #[test]
    fn column_stats_for_numeric_and_text() {
        let dataset = TabularDataset::new(vec![
            ints("n", &[1, 2, 3, 4]),
            texts("s", &["aa", "b", "aa", "cccc"]),
        ])
        .unwrap();
        let numeric = column_stats(&dataset, "n").unwrap();
        let summary = numeric.numeric.unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert!((summary.std.unwrap() - 1.2909944).abs() < 1e-6);

        let text = column_stats(&dataset, "s").unwrap();
        let lengths = text.lengths.unwrap();
        assert_eq!((lengths.min_length, lengths.max_length), (1, 4));
        assert_eq!(text.top_values[0], ValueCount { value: "aa".into(), count: 2 });
        assert_eq!(text.top_values[1].value, "b");

        assert!(column_stats(&dataset, "missing").is_err());
    }
}
