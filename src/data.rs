//! Scalar cell values and the parsing helpers shared by the profiler and mapper.
//!
//! Cells are `Option<Value>`; `None` is the null marker. Parsing helpers here are
//! deliberately forgiving: they return `None` instead of an error so callers can
//! coerce a column without aborting on a single bad cell.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::Serialize;

use crate::dataset::ColumnKind;

/// Text markers that stand for a missing value once a column has been stringified.
pub const NULL_SENTINELS: &[&str] = &["nan", "NaN", "None", "NaT", "<NA>"];

const TRUE_TOKENS: &[&str] = &["true", "t", "yes", "y", "1"];
const FALSE_TOKENS: &[&str] = &["false", "f", "no", "n", "0"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

// Month-first wins over day-first for ambiguous slash dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Integer(_) => ColumnKind::Integer,
            Value::Float(_) => ColumnKind::Float,
            Value::Boolean(_) => ColumnKind::Boolean,
            Value::Date(_) => ColumnKind::Date,
            Value::Timestamp(_) => ColumnKind::Timestamp,
            Value::Text(_) => ColumnKind::Text,
        }
    }

    /// Renders the value the way a string cast of the column would.
    pub fn to_text(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Floats keep a trailing `.0` when integral so `1.0` never reads back as an integer.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn is_null_sentinel(value: &str) -> bool {
    NULL_SENTINELS.contains(&value)
}

/// Drops thousands separators and dollar signs, then trims surrounding whitespace.
pub fn strip_numeric_noise(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ',' | '$'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn parse_integer_text(value: &str) -> Option<i64> {
    let cleaned = strip_numeric_noise(value);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(parsed) = cleaned.parse::<i64>() {
        return Some(parsed);
    }
    cleaned.parse::<f64>().ok().and_then(integral_f64)
}

pub fn parse_float_text(value: &str) -> Option<f64> {
    let cleaned = strip_numeric_noise(value);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| !f.is_nan())
}

/// Returns the integer a float holds exactly, or `None` when it has a fractional part.
pub fn integral_f64(value: f64) -> Option<i64> {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
    {
        Some(value as i64)
    } else {
        None
    }
}

/// Rounds half-to-even at `places` fractional digits.
pub fn round_to_places(value: f64, places: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

pub fn parse_boolean_token(value: &str) -> Option<bool> {
    let normalized = value.trim().to_lowercase();
    if TRUE_TOKENS.contains(&normalized.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Permissive date/time parser used when no explicit format is known.
///
/// Accepts RFC 3339, the common ISO-like datetime layouts, slash/dash/dot
/// separated dates, month-name dates, and compact `YYYYMMDD`. Date-only inputs
/// resolve to midnight.
pub fn parse_flexible_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Some(parsed);
    }
    if let Some(parsed) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    {
        return Some(parsed.and_time(NaiveTime::MIN));
    }
    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }
    None
}

pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    parse_flexible_datetime(value).map(|dt| dt.date())
}
