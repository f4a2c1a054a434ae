//! Applies column mappings to a dataset.
//!
//! Every mapping is attempted independently against a private copy of the
//! input. A column that cannot be transformed keeps its original values and
//! contributes one [`TransformationError`]; the caller decides what to do
//! with a non-empty error list (the loader refuses to touch the destination).

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    data::{
        Value, integral_f64, is_null_sentinel, parse_boolean_token, parse_flexible_date,
        parse_flexible_datetime, parse_float_text, parse_integer_text, round_to_places,
    },
    dataset::{Column, ColumnKind, TabularDataset},
    mapping::{ColumnMapping, TargetType},
};

const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationError {
    pub column: String,
    pub error: String,
}

impl TransformationError {
    fn new(column: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnValidation {
    pub null_count: usize,
    pub dtype: ColumnKind,
    pub truncated_values: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformationReport {
    pub total_rows: usize,
    pub errors: Vec<TransformationError>,
    pub has_errors: bool,
    pub columns: BTreeMap<String, ColumnValidation>,
}

/// Output of [`transform`]: the transformed copy plus everything learned on the way.
#[derive(Debug, Clone)]
pub struct Transformation {
    dataset: TabularDataset,
    errors: Vec<TransformationError>,
    truncated: BTreeMap<String, usize>,
}

impl Transformation {
    pub fn dataset(&self) -> &TabularDataset {
        &self.dataset
    }

    pub fn errors(&self) -> &[TransformationError] {
        &self.errors
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn truncated(&self, column: &str) -> usize {
        self.truncated.get(column).copied().unwrap_or(0)
    }

    pub fn report(&self) -> TransformationReport {
        let columns = self
            .dataset
            .columns()
            .iter()
            .map(|column| {
                (
                    column.name().to_string(),
                    ColumnValidation {
                        null_count: column.null_count(),
                        dtype: column.kind(),
                        truncated_values: self.truncated(column.name()),
                    },
                )
            })
            .collect();
        TransformationReport {
            total_rows: self.dataset.row_count(),
            errors: self.errors.clone(),
            has_errors: !self.errors.is_empty(),
            columns,
        }
    }

    pub fn into_parts(self) -> (TabularDataset, Vec<TransformationError>) {
        (self.dataset, self.errors)
    }
}

struct ColumnOutcome {
    column: Column,
    truncated: usize,
}

/// Transforms `dataset` under `mappings`, leaving the caller's dataset untouched.
pub fn apply(
    dataset: &TabularDataset,
    mappings: &[ColumnMapping],
) -> (TabularDataset, Vec<TransformationError>) {
    transform(dataset, mappings).into_parts()
}

pub fn transform(dataset: &TabularDataset, mappings: &[ColumnMapping]) -> Transformation {
    let outcomes: Vec<(&ColumnMapping, Result<ColumnOutcome, String>)> = mappings
        .iter()
        .map(|mapping| (mapping, transform_column(dataset, mapping)))
        .collect();

    let mut transformed = dataset.clone();
    let mut errors = Vec::new();
    let mut truncated = BTreeMap::new();
    for (mapping, outcome) in outcomes {
        let name = mapping.column_name();
        let applied = outcome.and_then(|outcome| {
            transformed
                .replace_column(outcome.column)
                .map_err(|err| err.to_string())?;
            Ok(outcome.truncated)
        });
        match applied {
            Ok(count) => {
                if count > 0 {
                    warn!("Truncated {count} value(s) in column '{name}' to fit max_length");
                    truncated.insert(name.to_string(), count);
                }
                debug!("Column '{name}' mapped to {}", mapping.target_type());
            }
            Err(error) => {
                warn!("Column '{name}' could not be transformed: {error}");
                errors.push(TransformationError::new(name, error));
            }
        }
    }

    Transformation {
        dataset: transformed,
        errors,
        truncated,
    }
}

fn transform_column(
    dataset: &TabularDataset,
    mapping: &ColumnMapping,
) -> Result<ColumnOutcome, String> {
    let name = mapping.column_name();
    let source = dataset
        .column(name)
        .ok_or_else(|| format!("Column '{name}' not found in dataset"))?;

    let mut truncated = 0;
    let mut values: Vec<Option<Value>> = source
        .values()
        .iter()
        .map(|cell| {
            let value = cell.as_ref()?;
            let (coerced, was_truncated) = coerce(value, mapping);
            truncated += usize::from(was_truncated);
            coerced
        })
        .collect();

    if !mapping.is_nullable() && values.iter().any(Option::is_none) {
        let Some(default) = mapping.default_value() else {
            return Err(format!(
                "Column '{name}' contains NULL values but marked as NOT NULL"
            ));
        };
        let fill = coerce_scalar(&Value::Text(default.to_string()), mapping).ok_or_else(|| {
            format!(
                "Default value '{default}' for column '{name}' cannot be converted to {}",
                mapping.target_type()
            )
        })?;
        for slot in values.iter_mut().filter(|v| v.is_none()) {
            *slot = Some(fill.clone());
        }
    }

    let column = match target_kind(mapping.target_type()) {
        Some(kind) => Column::with_kind(name, kind, values),
        None => Column::new(name, values),
    };
    Ok(ColumnOutcome { column, truncated })
}

fn target_kind(target: TargetType) -> Option<ColumnKind> {
    match target {
        TargetType::Integer | TargetType::Bigint => Some(ColumnKind::Integer),
        TargetType::Float | TargetType::Decimal => Some(ColumnKind::Float),
        TargetType::String | TargetType::Text => Some(ColumnKind::Text),
        TargetType::Boolean => Some(ColumnKind::Boolean),
        TargetType::Date => Some(ColumnKind::Date),
        TargetType::Datetime | TargetType::Timestamp => Some(ColumnKind::Timestamp),
        TargetType::Json => None,
    }
}

/// Coerces one non-null value to the mapping's target type; `None` means the value becomes null.
pub fn coerce_scalar(value: &Value, mapping: &ColumnMapping) -> Option<Value> {
    coerce(value, mapping).0
}

fn coerce(value: &Value, mapping: &ColumnMapping) -> (Option<Value>, bool) {
    match mapping.target_type() {
        TargetType::Integer | TargetType::Bigint => (to_integer(value).map(Value::Integer), false),
        TargetType::Float => (to_float(value).map(Value::Float), false),
        TargetType::Decimal => (
            to_float(value)
                .map(|f| round_to_places(f, DECIMAL_PLACES))
                .map(Value::Float),
            false,
        ),
        TargetType::String | TargetType::Text => to_string(value, mapping.max_length()),
        TargetType::Boolean => (
            parse_boolean_token(&value.to_text()).map(Value::Boolean),
            false,
        ),
        TargetType::Date => (to_date(value, mapping).map(Value::Date), false),
        TargetType::Datetime | TargetType::Timestamp => {
            (to_datetime(value, mapping).map(Value::Timestamp), false)
        }
        TargetType::Json => (Some(value.clone()), false),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => integral_f64(*f),
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::Text(s) => parse_integer_text(s),
        Value::Date(_) | Value::Timestamp(_) => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) if f.is_nan() => None,
        Value::Float(f) => Some(*f),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_float_text(s),
        Value::Date(_) | Value::Timestamp(_) => None,
    }
}

fn to_string(value: &Value, max_length: Option<usize>) -> (Option<Value>, bool) {
    let mut text = value.to_text();
    let mut truncated = false;
    if let Some(max) = max_length
        && text.chars().count() > max
    {
        text = text.chars().take(max).collect();
        truncated = true;
    }
    if is_null_sentinel(&text) {
        (None, truncated)
    } else {
        (Some(Value::Text(text)), truncated)
    }
}

fn to_date(value: &Value, mapping: &ColumnMapping) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::Text(s) => {
            let trimmed = s.trim();
            mapping
                .date_format()
                .and_then(|format| NaiveDate::parse_from_str(trimmed, format.pattern()).ok())
                .or_else(|| parse_flexible_date(trimmed))
        }
        _ => None,
    }
}

fn to_datetime(value: &Value, mapping: &ColumnMapping) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::Text(s) => {
            let trimmed = s.trim();
            mapping
                .datetime_format()
                .and_then(|format| NaiveDateTime::parse_from_str(trimmed, format.pattern()).ok())
                .or_else(|| parse_flexible_datetime(trimmed))
        }
        _ => None,
    }
}
