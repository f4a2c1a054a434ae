//! Column mapping directives and the target type vocabulary.
//!
//! A [`ColumnMapping`] says how one source column becomes one destination
//! column: the [`TargetType`] to coerce into, an optional date or datetime
//! format token, and the constraints (nullability, keys, default) the
//! destination table should enforce. Mappings are validated when built,
//! whether through the builder methods or through deserialization.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Integer,
    Bigint,
    Float,
    Decimal,
    String,
    Text,
    Boolean,
    Date,
    Datetime,
    Timestamp,
    Json,
}

impl TargetType {
    pub const ALL: [TargetType; 11] = [
        TargetType::Integer,
        TargetType::Bigint,
        TargetType::Float,
        TargetType::Decimal,
        TargetType::String,
        TargetType::Text,
        TargetType::Boolean,
        TargetType::Date,
        TargetType::Datetime,
        TargetType::Timestamp,
        TargetType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Integer => "integer",
            TargetType::Bigint => "bigint",
            TargetType::Float => "float",
            TargetType::Decimal => "decimal",
            TargetType::String => "string",
            TargetType::Text => "text",
            TargetType::Boolean => "boolean",
            TargetType::Date => "date",
            TargetType::Datetime => "datetime",
            TargetType::Timestamp => "timestamp",
            TargetType::Json => "json",
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, TargetType::Integer | TargetType::Bigint)
    }

    pub fn supports_max_length(&self) -> bool {
        matches!(self, TargetType::String | TargetType::Text)
    }

    pub fn available_formats(&self) -> Vec<&'static str> {
        match self {
            TargetType::Date => DateFormat::ALL.iter().map(DateFormat::token).collect(),
            TargetType::Datetime | TargetType::Timestamp => {
                DateTimeFormat::ALL.iter().map(DateTimeFormat::token).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "integer" | "int" => Ok(TargetType::Integer),
            "bigint" => Ok(TargetType::Bigint),
            "float" | "double" | "real" => Ok(TargetType::Float),
            "decimal" | "numeric" => Ok(TargetType::Decimal),
            "string" | "varchar" => Ok(TargetType::String),
            "text" => Ok(TargetType::Text),
            "boolean" | "bool" => Ok(TargetType::Boolean),
            "date" => Ok(TargetType::Date),
            "datetime" => Ok(TargetType::Datetime),
            "timestamp" => Ok(TargetType::Timestamp),
            "json" => Ok(TargetType::Json),
            _ => Err(ValidationError::UnknownTargetType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
    #[serde(rename = "YY-MM-DD")]
    ShortYearMonthDay,
    #[serde(rename = "DD-MM-YYYY")]
    DayMonthYear,
    #[serde(rename = "DD-MM-YY")]
    DayMonthShortYear,
    #[serde(rename = "YYYY/MM/DD")]
    YearMonthDaySlash,
    #[serde(rename = "YY/MM/DD")]
    ShortYearMonthDaySlash,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYearSlash,
    #[serde(rename = "DD/MM/YY")]
    DayMonthShortYearSlash,
    #[serde(rename = "MMM DD, YYYY")]
    AbbreviatedMonthName,
    #[serde(rename = "MMMM DD, YYYY")]
    FullMonthName,
}

impl DateFormat {
    pub const ALL: [DateFormat; 10] = [
        DateFormat::YearMonthDay,
        DateFormat::ShortYearMonthDay,
        DateFormat::DayMonthYear,
        DateFormat::DayMonthShortYear,
        DateFormat::YearMonthDaySlash,
        DateFormat::ShortYearMonthDaySlash,
        DateFormat::DayMonthYearSlash,
        DateFormat::DayMonthShortYearSlash,
        DateFormat::AbbreviatedMonthName,
        DateFormat::FullMonthName,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "YYYY-MM-DD",
            DateFormat::ShortYearMonthDay => "YY-MM-DD",
            DateFormat::DayMonthYear => "DD-MM-YYYY",
            DateFormat::DayMonthShortYear => "DD-MM-YY",
            DateFormat::YearMonthDaySlash => "YYYY/MM/DD",
            DateFormat::ShortYearMonthDaySlash => "YY/MM/DD",
            DateFormat::DayMonthYearSlash => "DD/MM/YYYY",
            DateFormat::DayMonthShortYearSlash => "DD/MM/YY",
            DateFormat::AbbreviatedMonthName => "MMM DD, YYYY",
            DateFormat::FullMonthName => "MMMM DD, YYYY",
        }
    }

    /// chrono `strftime` pattern for the token.
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "%Y-%m-%d",
            DateFormat::ShortYearMonthDay => "%y-%m-%d",
            DateFormat::DayMonthYear => "%d-%m-%Y",
            DateFormat::DayMonthShortYear => "%d-%m-%y",
            DateFormat::YearMonthDaySlash => "%Y/%m/%d",
            DateFormat::ShortYearMonthDaySlash => "%y/%m/%d",
            DateFormat::DayMonthYearSlash => "%d/%m/%Y",
            DateFormat::DayMonthShortYearSlash => "%d/%m/%y",
            DateFormat::AbbreviatedMonthName => "%b %d, %Y",
            DateFormat::FullMonthName => "%B %d, %Y",
        }
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DateFormat::ALL
            .into_iter()
            .find(|f| f.token() == value.trim())
            .ok_or_else(|| format!("unknown date format '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateTimeFormat {
    #[serde(rename = "YYYY-MM-DD HH:MM:SS")]
    YearMonthDayTime,
    #[serde(rename = "DD-MM-YYYY HH:MM:SS")]
    DayMonthYearTime,
    #[serde(rename = "MM-DD-YYYY HH:MM:SS")]
    MonthDayYearTime,
    #[serde(rename = "YYYY-MM-DDTHH:MM:SS")]
    IsoLocal,
    /// Any ISO 8601 / RFC 3339 rendering; offsets are dropped.
    #[serde(rename = "ISO8601")]
    Iso8601,
}

impl DateTimeFormat {
    pub const ALL: [DateTimeFormat; 5] = [
        DateTimeFormat::YearMonthDayTime,
        DateTimeFormat::DayMonthYearTime,
        DateTimeFormat::MonthDayYearTime,
        DateTimeFormat::IsoLocal,
        DateTimeFormat::Iso8601,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            DateTimeFormat::YearMonthDayTime => "YYYY-MM-DD HH:MM:SS",
            DateTimeFormat::DayMonthYearTime => "DD-MM-YYYY HH:MM:SS",
            DateTimeFormat::MonthDayYearTime => "MM-DD-YYYY HH:MM:SS",
            DateTimeFormat::IsoLocal => "YYYY-MM-DDTHH:MM:SS",
            DateTimeFormat::Iso8601 => "ISO8601",
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            DateTimeFormat::YearMonthDayTime => "%Y-%m-%d %H:%M:%S",
            DateTimeFormat::DayMonthYearTime => "%d-%m-%Y %H:%M:%S",
            DateTimeFormat::MonthDayYearTime => "%m-%d-%Y %H:%M:%S",
            DateTimeFormat::IsoLocal => "%Y-%m-%dT%H:%M:%S",
            DateTimeFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S%.f",
        }
    }
}

impl FromStr for DateTimeFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DateTimeFormat::ALL
            .into_iter()
            .find(|f| f.token() == value.trim())
            .ok_or_else(|| format!("unknown datetime format '{value}'"))
    }
}

/// Serialized shape of a mapping; converted through [`ColumnMapping::try_from`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawColumnMapping {
    column_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    source_type: String,
    target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_format: Option<DateFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datetime_format: Option<DateTimeFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
    #[serde(default = "default_nullable")]
    is_nullable: bool,
    #[serde(default)]
    is_primary_key: bool,
    #[serde(default)]
    is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
}

const fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnMapping", into = "RawColumnMapping")]
pub struct ColumnMapping {
    column_name: String,
    source_type: String,
    target_type: TargetType,
    date_format: Option<DateFormat>,
    datetime_format: Option<DateTimeFormat>,
    max_length: Option<usize>,
    is_nullable: bool,
    is_primary_key: bool,
    is_unique: bool,
    default_value: Option<String>,
}

impl ColumnMapping {
    /// Nullable, keyless mapping with no format, length, or default.
    pub fn new(column_name: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            column_name: column_name.into(),
            source_type: String::new(),
            target_type,
            date_format: None,
            datetime_format: None,
            max_length: None,
            is_nullable: true,
            is_primary_key: false,
            is_unique: false,
            default_value: None,
        }
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }

    pub fn with_datetime_format(mut self, format: DateTimeFormat) -> Self {
        self.datetime_format = Some(format);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Result<Self, ValidationError> {
        self.max_length = Some(max_length);
        self.validate()?;
        Ok(self)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.is_primary_key = primary_key;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.is_unique = unique;
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.column_name.trim().is_empty() {
            return Err(ValidationError::EmptyColumnName);
        }
        if let Some(max_length) = self.max_length {
            if !self.target_type.supports_max_length() {
                return Err(ValidationError::MaxLengthNotAllowed {
                    column: self.column_name.clone(),
                    target: self.target_type,
                });
            }
            if max_length == 0 {
                return Err(ValidationError::ZeroMaxLength(self.column_name.clone()));
            }
        }
        Ok(())
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn date_format(&self) -> Option<DateFormat> {
        self.date_format
    }

    pub fn datetime_format(&self) -> Option<DateTimeFormat> {
        self.datetime_format
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

impl TryFrom<RawColumnMapping> for ColumnMapping {
    type Error = ValidationError;

    fn try_from(raw: RawColumnMapping) -> Result<Self, Self::Error> {
        let mapping = ColumnMapping {
            column_name: raw.column_name,
            source_type: raw.source_type,
            target_type: raw.target_type,
            date_format: raw.date_format,
            datetime_format: raw.datetime_format,
            max_length: raw.max_length,
            is_nullable: raw.is_nullable,
            is_primary_key: raw.is_primary_key,
            is_unique: raw.is_unique,
            default_value: raw.default_value,
        };
        mapping.validate()?;
        Ok(mapping)
    }
}

impl From<ColumnMapping> for RawColumnMapping {
    fn from(mapping: ColumnMapping) -> Self {
        RawColumnMapping {
            column_name: mapping.column_name,
            source_type: mapping.source_type,
            target_type: mapping.target_type,
            date_format: mapping.date_format,
            datetime_format: mapping.datetime_format,
            max_length: mapping.max_length,
            is_nullable: mapping.is_nullable,
            is_primary_key: mapping.is_primary_key,
            is_unique: mapping.is_unique,
            default_value: mapping.default_value,
        }
    }
}

/// Checks a full mapping list: each entry valid, at least one, no column mapped twice.
pub fn validate_mappings(mappings: &[ColumnMapping]) -> Result<(), ValidationError> {
    if mappings.is_empty() {
        return Err(ValidationError::NoMappings);
    }
    let mut seen = HashSet::new();
    for mapping in mappings {
        mapping.validate()?;
        if !seen.insert(mapping.column_name()) {
            return Err(ValidationError::DuplicateMapping(
                mapping.column_name().to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DataTypeInfo {
    pub type_id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub requires_format: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_formats: Vec<&'static str>,
}

pub fn data_type_catalog() -> Vec<DataTypeInfo> {
    TargetType::ALL
        .iter()
        .map(|target| {
            let (display_name, description) = match target {
                TargetType::Integer => ("Integer", "Whole numbers without decimals"),
                TargetType::Bigint => ("Big Integer", "Large whole numbers"),
                TargetType::Float => ("Float", "Decimal numbers"),
                TargetType::Decimal => ("Decimal", "Numbers rounded to two decimal places"),
                TargetType::String => ("String (VARCHAR)", "Text up to 255 characters"),
                TargetType::Text => ("Text", "Long text content"),
                TargetType::Boolean => ("Boolean", "True/False values"),
                TargetType::Date => ("Date", "Date without time"),
                TargetType::Datetime => ("DateTime", "Date with time"),
                TargetType::Timestamp => ("Timestamp", "Date and time"),
                TargetType::Json => ("JSON", "Structured document stored as text"),
            };
            let available_formats = target.available_formats();
            DataTypeInfo {
                type_id: target.as_str(),
                display_name,
                description,
                requires_format: !available_formats.is_empty(),
                available_formats,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_length_rejected_for_non_string_targets() {
        let err = ColumnMapping::new("amount", TargetType::Integer)
            .with_max_length(10)
            .unwrap_err();
        assert!(matches!(err, ValidationError::MaxLengthNotAllowed { .. }));

        let ok = ColumnMapping::new("name", TargetType::String)
            .with_max_length(10)
            .unwrap();
        assert_eq!(ok.max_length(), Some(10));
    }

    #[test]
    fn deserialization_runs_validation() {
        let yaml = "column_name: amount\ntarget_type: float\nmax_length: 5\n";
        let err = serde_yaml::from_str::<ColumnMapping>(yaml).unwrap_err();
        assert!(err.to_string().contains("max_length"));

        let yaml = "column_name: joined\ntarget_type: date\ndate_format: DD/MM/YYYY\nis_nullable: false\n";
        let mapping: ColumnMapping = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(mapping.date_format(), Some(DateFormat::DayMonthYearSlash));
        assert!(!mapping.is_nullable());
        assert!(!mapping.is_primary_key());
    }

    #[test]
    fn validate_mappings_rejects_duplicates() {
        let mappings = vec![
            ColumnMapping::new("id", TargetType::Integer),
            ColumnMapping::new("id", TargetType::String),
        ];
        assert_eq!(
            validate_mappings(&mappings),
            Err(ValidationError::DuplicateMapping("id".to_string()))
        );
        assert_eq!(validate_mappings(&[]), Err(ValidationError::NoMappings));
    }

    #[test]
    fn format_tokens_map_to_patterns() {
        assert_eq!(DateFormat::FullMonthName.pattern(), "%B %d, %Y");
        assert_eq!("DD-MM-YY".parse::<DateFormat>().unwrap().pattern(), "%d-%m-%y");
        assert_eq!(
            "YYYY-MM-DDTHH:MM:SS".parse::<DateTimeFormat>().unwrap().pattern(),
            "%Y-%m-%dT%H:%M:%S"
        );
    }

    #[test]
    fn catalog_lists_formats_for_temporal_types() {
        let catalog = data_type_catalog();
        assert_eq!(catalog.len(), TargetType::ALL.len());
        let date = catalog.iter().find(|info| info.type_id == "date").unwrap();
        assert!(date.requires_format);
        assert_eq!(date.available_formats.len(), 10);
        let integer = catalog.iter().find(|info| info.type_id == "integer").unwrap();
        assert!(!integer.requires_format);
    }
}
