//! I/O utilities for reading delimited input files.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: explicit labels resolve through `encoding_rs`; without a
//!   label the input is tried as UTF-8 and then as windows-1252 (latin-1).
//! - **Missing markers**: the tokens a spreadsheet export uses for empty cells.

use std::path::Path;

use anyhow::{Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_token(value: &str) -> bool {
    NA_TOKENS.contains(&value.trim())
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn ensure_supported_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(());
    }
    if matches!(ext.as_str(), "xls" | "xlsx") {
        bail!("Excel workbooks are not supported; export {path:?} to CSV first");
    }
    bail!(
        "Unsupported file extension '{ext}'. Allowed extensions are: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    )
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: std::io::Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn fallback_encodings() -> [&'static Encoding; 2] {
    [UTF_8, WINDOWS_1252]
}

/// Decodes with the requested encoding, or walks the fallback list when none is given.
pub fn decode_with_fallback(
    bytes: &[u8],
    label: Option<&str>,
) -> Result<(String, &'static Encoding)> {
    if label.is_some() {
        let encoding = resolve_encoding(label)?;
        return decode_bytes(bytes, encoding).map(|text| (text, encoding));
    }
    let candidates = fallback_encodings();
    for encoding in candidates {
        if let Ok(text) = decode_bytes(bytes, encoding) {
            return Ok((text, encoding));
        }
    }
    Err(anyhow!(
        "Could not decode input with supported encodings ({})",
        candidates
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}
