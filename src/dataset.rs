//! In-memory tabular dataset and CSV loading.
//!
//! A [`TabularDataset`] is an ordered list of named [`Column`]s that all hold the
//! same number of rows. Each column carries a runtime [`ColumnKind`], inferred
//! from its values the way a dataframe reader would (integers widen to float,
//! anything heterogeneous is text).

use std::{
    collections::{HashMap, HashSet},
    fmt, fs,
    path::Path,
};

use anyhow::{Context, Result, anyhow, ensure};
use log::{debug, info};
use serde::Serialize;

use crate::{
    data::{Value, parse_integer_text},
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    Timestamp,
    Empty,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Empty => "empty",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnKind::Date | ColumnKind::Timestamp)
    }

    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Option<Value>>,
    {
        let mut kind: Option<ColumnKind> = None;
        for value in values.into_iter().flatten() {
            let next = value.kind();
            kind = Some(match kind {
                None => next,
                Some(current) if current == next => current,
                Some(current) => widen(current, next),
            });
            if kind == Some(ColumnKind::Text) {
                break;
            }
        }
        kind.unwrap_or(ColumnKind::Empty)
    }
}

fn widen(current: ColumnKind, next: ColumnKind) -> ColumnKind {
    match (current, next) {
        (ColumnKind::Integer, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Integer) => {
            ColumnKind::Float
        }
        (ColumnKind::Date, ColumnKind::Timestamp) | (ColumnKind::Timestamp, ColumnKind::Date) => {
            ColumnKind::Timestamp
        }
        _ => ColumnKind::Text,
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<Value>>) -> Self {
        let kind = ColumnKind::infer(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn with_kind(name: impl Into<String>, kind: ColumnKind, values: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for column in &columns {
                ensure!(
                    column.len() == expected,
                    "Column '{}' has {} row(s) but '{}' has {}",
                    column.name(),
                    column.len(),
                    first.name(),
                    expected
                );
            }
        }
        let mut seen = HashSet::new();
        for column in &columns {
            ensure!(
                seen.insert(column.name()),
                "Duplicate column name '{}'",
                column.name()
            );
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Swaps in a column with the same name, keeping its position.
    pub fn replace_column(&mut self, column: Column) -> Result<()> {
        ensure!(
            column.len() == self.row_count(),
            "Replacement column '{}' has {} row(s), expected {}",
            column.name(),
            column.len(),
            self.row_count()
        );
        let index = self
            .column_index(column.name())
            .ok_or_else(|| anyhow!("Column '{}' not found in dataset", column.name()))?;
        self.columns[index] = column;
        Ok(())
    }

    /// Projects the dataset onto `names`, in that order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name.as_ref())
                    .cloned()
                    .ok_or_else(|| anyhow!("Column '{}' not found in dataset", name.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    pub fn row(&self, index: usize) -> Vec<&Option<Value>> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    pub fn head(&self, rows: usize) -> Vec<Vec<Option<Value>>> {
        (0..self.row_count().min(rows))
            .map(|idx| self.row(idx).into_iter().cloned().collect())
            .collect()
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }
}

/// Reads a delimited text file into a dataset, inferring each column's kind.
///
/// Without an explicit `encoding` the bytes are tried as UTF-8 first and then
/// as windows-1252.
pub fn read_csv(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<TabularDataset> {
    io_utils::ensure_supported_extension(path)?;
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    let (text, used) = io_utils::decode_with_fallback(&bytes, encoding)
        .with_context(|| format!("Decoding {path:?}"))?;
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    let dataset = parse_csv_text(&text, delimiter)
        .with_context(|| format!("Parsing delimited data from {path:?}"))?;
    info!(
        "Loaded {} row(s) x {} column(s) from {:?} ({})",
        dataset.row_count(),
        dataset.column_count(),
        path,
        used.name()
    );
    Ok(dataset)
}

pub fn parse_csv_text(text: &str, delimiter: u8) -> Result<TabularDataset> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = dedupe_headers(
        reader
            .headers()
            .context("Reading header row")?
            .iter()
            .map(str::to_string)
            .collect(),
    );
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        for (col_idx, field) in record.iter().enumerate() {
            raw[col_idx].push(field.to_string());
        }
    }
    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| build_column(name, cells))
        .collect();
    TabularDataset::new(columns)
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    // a generated suffix must not collide with a header that is already present
    let originals: HashSet<String> = headers.iter().cloned().collect();
    let mut assigned: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            if !assigned.contains(&header) {
                assigned.insert(header.clone());
                return header;
            }
            let counter = counts.entry(header.clone()).or_insert(0);
            let name = loop {
                *counter += 1;
                let candidate = format!("{header}.{counter}");
                if !originals.contains(&candidate) && !assigned.contains(&candidate) {
                    break candidate;
                }
            };
            assigned.insert(name.clone());
            name
        })
        .collect()
}

fn build_column(name: String, cells: Vec<String>) -> Column {
    let present = || cells.iter().filter(|c| !io_utils::is_na_token(c));
    let kind = if present().next().is_none() {
        ColumnKind::Empty
    } else if present().all(|c| c.trim().parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else if present().all(|c| c.trim().parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else if present().all(|c| matches!(c.trim().to_ascii_lowercase().as_str(), "true" | "false")) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    };
    debug!("Column '{name}' read as {kind}");
    let values = cells
        .into_iter()
        .map(|cell| {
            if io_utils::is_na_token(&cell) {
                return None;
            }
            let trimmed = cell.trim();
            match kind {
                ColumnKind::Integer => parse_integer_text(trimmed).map(Value::Integer),
                ColumnKind::Float => trimmed.parse::<f64>().ok().map(Value::Float),
                ColumnKind::Boolean => Some(Value::Boolean(trimmed.eq_ignore_ascii_case("true"))),
                _ => Some(Value::Text(cell)),
            }
        })
        .collect();
    Column::with_kind(name, kind, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_widens_integer_and_float() {
        let values = vec![Some(Value::Integer(1)), None, Some(Value::Float(2.5))];
        assert_eq!(ColumnKind::infer(&values), ColumnKind::Float);
        let mixed = vec![Some(Value::Integer(1)), Some(Value::from("x"))];
        assert_eq!(ColumnKind::infer(&mixed), ColumnKind::Text);
        let empty: Vec<Option<Value>> = vec![None, None];
        assert_eq!(ColumnKind::infer(&empty), ColumnKind::Empty);
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let a = Column::new("a", vec![Some(Value::Integer(1))]);
        let b = Column::new("b", vec![None, None]);
        let err = TabularDataset::new(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("has 2 row(s)"));
    }

    #[test]
    fn parse_csv_text_infers_runtime_kinds() {
        let text = "id,amount,active,name,blank\n1,1.5,TRUE,Alice,\n2,,false,Bob,\n";
        let dataset = parse_csv_text(text, b',').unwrap();
        let kinds: Vec<ColumnKind> = dataset.columns().iter().map(Column::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Boolean,
                ColumnKind::Text,
                ColumnKind::Empty
            ]
        );
        assert_eq!(dataset.column("amount").unwrap().null_count(), 1);
        assert_eq!(dataset.total_missing(), 3);
    }

    #[test]
    fn parse_csv_text_renames_duplicate_headers() {
        let dataset = parse_csv_text("a,a,b\n1,2,3\n", b',').unwrap();
        assert_eq!(dataset.column_names(), vec!["a", "a.1", "b"]);
    }

    #[test]
    fn renamed_duplicates_skip_names_already_in_the_header() {
        let dataset = parse_csv_text("a,a,a.1\n1,2,3\n", b',').unwrap();
        assert_eq!(dataset.column_names(), vec!["a", "a.2", "a.1"]);
        assert_eq!(
            dataset.column("a.1").unwrap().values(),
            &[Some(Value::Integer(3))]
        );
    }

    #[test]
    fn select_projects_in_requested_order() {
        let dataset = parse_csv_text("a,b,c\n1,2,3\n", b',').unwrap();
        let projected = dataset.select(&["c", "a"]).unwrap();
        assert_eq!(projected.column_names(), vec!["c", "a"]);
        assert!(dataset.select(&["missing"]).is_err());
    }
}
