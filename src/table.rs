use std::{borrow::Cow, fmt::Write as _};

use crate::data::Value;

/// Cells longer than this are shortened with an ellipsis.
const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(&fit_cell(cell)));
        }
    }

    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();

    let header_line = format_row(headers, &widths);
    let _ = writeln!(output, "{header_line}");

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let separator_line = format_row(&separator_cells, &separator_widths);
    let _ = writeln!(output, "{separator_line}");

    for row in rows {
        let row_line = format_row(row, &widths);
        let _ = writeln!(output, "{row_line}");
    }

    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let rendered = render_table(headers, rows);
    print!("{rendered}");
}

/// Text for one dataset cell; nulls print as `NULL`.
pub fn cell_text(value: Option<&Value>) -> String {
    value.map(Value::to_text).unwrap_or_else(|| "NULL".to_string())
}

pub fn optional_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let fitted = fit_cell(value);
        let display = display_width(fitted.as_ref());
        let mut cell = fitted.into_owned();
        let padding = widths
            .get(idx)
            .copied()
            .unwrap_or_default()
            .saturating_sub(display);
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn fit_cell(value: &str) -> Cow<'_, str> {
    let sanitized = sanitize_cell(value);
    if display_width(&sanitized) <= MAX_CELL_WIDTH {
        return sanitized;
    }
    let mut shortened: String = sanitized.chars().take(MAX_CELL_WIDTH - 1).collect();
    shortened.push('…');
    Cow::Owned(shortened)
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        let mut sanitized = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '\n' | '\r' | '\t' => sanitized.push(' '),
                other => sanitized.push(other),
            }
        }
        Cow::Owned(sanitized)
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_aligns_columns() {
        let headers = vec!["column".to_string(), "type".to_string()];
        let rows = vec![
            vec!["id".to_string(), "integer".to_string()],
            vec!["amount".to_string(), "float".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "column  type");
        assert_eq!(lines[1], "------  -------");
        assert_eq!(lines[2], "id      integer");
    }

    #[test]
    fn long_and_multiline_cells_are_fitted() {
        let long = "x".repeat(100);
        let fitted = fit_cell(&long);
        assert_eq!(fitted.chars().count(), MAX_CELL_WIDTH);
        assert!(fitted.ends_with('…'));
        assert_eq!(fit_cell("a\nb"), "a b");
        assert_eq!(cell_text(None), "NULL");
        assert_eq!(cell_text(Some(&Value::Float(2.0))), "2.0");
    }
}
