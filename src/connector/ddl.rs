//! SQL text generation shared by connectors.
//!
//! Engines differ in native type names, key syntax and literals; those
//! differences live behind [`SqlDialect`] so the statement builders stay
//! engine-neutral.

use itertools::Itertools;

use crate::{
    data::{Value, format_float},
    mapper::coerce_scalar,
    mapping::{ColumnMapping, TargetType},
};

pub trait SqlDialect {
    fn native_type(&self, target: TargetType) -> &'static str;

    /// Clause appended to an inlined integer primary key.
    fn autoincrement(&self) -> &'static str;

    fn boolean_literal(&self, value: bool) -> &'static str;

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn default_index_name(table: &str, columns: &[String]) -> String {
    format!("idx_{table}_{}", columns.join("_"))
}

/// Renders a mapping's default as a literal of its target type.
///
/// Defaults that do not coerce are emitted as quoted text.
pub fn format_default(dialect: &dyn SqlDialect, mapping: &ColumnMapping, raw: &str) -> String {
    match coerce_scalar(&Value::Text(raw.to_string()), mapping) {
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Float(f)) => format_float(f),
        Some(Value::Boolean(b)) => dialect.boolean_literal(b).to_string(),
        Some(other) => quote_literal(&other.to_text()),
        None => quote_literal(raw),
    }
}

/// A lone integer key is inlined with auto-increment; anything else becomes a table constraint.
fn inline_primary_key(mappings: &[ColumnMapping]) -> Option<&str> {
    let keys: Vec<&ColumnMapping> = mappings.iter().filter(|m| m.is_primary_key()).collect();
    match keys.as_slice() {
        [single] if single.target_type().is_integral() => Some(single.column_name()),
        _ => None,
    }
}

pub fn column_definition(
    dialect: &dyn SqlDialect,
    mapping: &ColumnMapping,
    inline_key: bool,
) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.quote_identifier(mapping.column_name()),
        dialect.native_type(mapping.target_type())
    );
    if inline_key {
        sql.push_str(" PRIMARY KEY");
        let keyword = dialect.autoincrement();
        if !keyword.is_empty() {
            sql.push(' ');
            sql.push_str(keyword);
        }
    }
    if !mapping.is_nullable() {
        sql.push_str(" NOT NULL");
    }
    if mapping.is_unique() && !mapping.is_primary_key() {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = mapping.default_value() {
        sql.push_str(" DEFAULT ");
        sql.push_str(&format_default(dialect, mapping, default));
    }
    sql
}

pub fn create_table_sql(dialect: &dyn SqlDialect, table: &str, mappings: &[ColumnMapping]) -> String {
    let inline = inline_primary_key(mappings);
    let mut parts: Vec<String> = mappings
        .iter()
        .map(|mapping| column_definition(dialect, mapping, inline == Some(mapping.column_name())))
        .collect();
    if inline.is_none() {
        let keys = mappings
            .iter()
            .filter(|m| m.is_primary_key())
            .map(|m| dialect.quote_identifier(m.column_name()))
            .join(", ");
        if !keys.is_empty() {
            parts.push(format!("PRIMARY KEY ({keys})"));
        }
    }
    format!(
        "CREATE TABLE {} ({})",
        dialect.quote_identifier(table),
        parts.join(", ")
    )
}

pub fn drop_table_sql(dialect: &dyn SqlDialect, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", dialect.quote_identifier(table))
}

pub fn insert_sql(dialect: &dyn SqlDialect, table: &str, columns: &[String]) -> String {
    let names = columns.iter().map(|c| dialect.quote_identifier(c)).join(", ");
    let placeholders = (1..=columns.len()).map(|idx| dialect.placeholder(idx)).join(", ");
    format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders})",
        dialect.quote_identifier(table)
    )
}

pub fn create_index_sql(
    dialect: &dyn SqlDialect,
    table: &str,
    columns: &[String],
    index_name: &str,
) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        dialect.quote_identifier(index_name),
        dialect.quote_identifier(table),
        columns.iter().map(|c| dialect.quote_identifier(c)).join(", ")
    )
}
