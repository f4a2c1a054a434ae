mod common;

use common::{fixture_path, text_dataset};
use sheetload::{
    data::Value,
    dataset::{ColumnKind, read_csv},
    mapper::{apply, transform},
    mapping::{ColumnMapping, DateFormat, TargetType},
};

#[test]
fn currency_amounts_become_floats_and_garbage_becomes_null() {
    let dataset = read_csv(&fixture_path("orders.csv"), None, None).expect("read fixture");
    let (out, errors) = apply(
        &dataset,
        &[ColumnMapping::new("amount", TargetType::Float)],
    );
    assert!(errors.is_empty());
    let amount = out.column("amount").unwrap();
    assert_eq!(amount.kind(), ColumnKind::Float);
    assert_eq!(
        amount.values(),
        &[
            Some(Value::Float(1250.5)),
            Some(Value::Float(80.0)),
            Some(Value::Float(12.99)),
            None,
            Some(Value::Float(300.0)),
        ]
    );
    // the caller's dataset is left alone
    assert_eq!(dataset.column("amount").unwrap().kind(), ColumnKind::Text);
}

#[test]
fn decimal_target_rounds_half_to_even() {
    let dataset = text_dataset(&[("price", &[Some("2.345"), Some("2.355"), Some("$1,000.004")])]);
    let (out, errors) = apply(&dataset, &[ColumnMapping::new("price", TargetType::Decimal)]);
    assert!(errors.is_empty());
    let values: Vec<_> = out
        .column("price")
        .unwrap()
        .values()
        .iter()
        .map(|v| v.as_ref().and_then(Value::as_f64))
        .collect();
    assert_eq!(values, vec![Some(2.34), Some(2.36), Some(1000.0)]);
}

#[test]
fn not_null_without_default_is_reported_per_column() {
    let dataset = text_dataset(&[
        ("qty", &[Some("4"), Some("n/a")]),
        ("sku", &[Some("A1"), Some("B2")]),
    ]);
    let mappings = vec![
        ColumnMapping::new("qty", TargetType::Integer).with_nullable(false),
        ColumnMapping::new("sku", TargetType::String),
    ];
    let result = transform(&dataset, &mappings);
    assert!(!result.is_clean());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].column, "qty");
    assert_eq!(
        result.errors()[0].error,
        "Column 'qty' contains NULL values but marked as NOT NULL"
    );
    // the failed column keeps its source values, the other one is still mapped
    assert_eq!(
        result.dataset().column("qty").unwrap().values()[1],
        Some(Value::Text("n/a".into()))
    );
    assert_eq!(
        result.dataset().column("sku").unwrap().kind(),
        ColumnKind::Text
    );
}

#[test]
fn not_null_with_default_fills_the_gaps() {
    let dataset = text_dataset(&[("qty", &[Some("4"), None, Some("junk")])]);
    let (out, errors) = apply(
        &dataset,
        &[ColumnMapping::new("qty", TargetType::Integer)
            .with_nullable(false)
            .with_default_value("0")],
    );
    assert!(errors.is_empty());
    assert_eq!(
        out.column("qty").unwrap().values(),
        &[
            Some(Value::Integer(4)),
            Some(Value::Integer(0)),
            Some(Value::Integer(0))
        ]
    );
}

#[test]
fn unconvertible_default_is_an_error() {
    let dataset = text_dataset(&[("qty", &[None])]);
    let (_, errors) = apply(
        &dataset,
        &[ColumnMapping::new("qty", TargetType::Integer)
            .with_nullable(false)
            .with_default_value("many")],
    );
    assert_eq!(
        errors[0].error,
        "Default value 'many' for column 'qty' cannot be converted to integer"
    );
}

#[test]
fn strings_are_truncated_and_counted() {
    let dataset = text_dataset(&[("code", &[Some("ABCDEFG"), Some("XY"), Some("ñandú")])]);
    let mapping = ColumnMapping::new("code", TargetType::String)
        .with_max_length(3)
        .unwrap();
    let result = transform(&dataset, &[mapping]);
    assert!(result.is_clean());
    assert_eq!(result.truncated("code"), 2);
    assert_eq!(
        result.dataset().column("code").unwrap().values(),
        &[
            Some(Value::Text("ABC".into())),
            Some(Value::Text("XY".into())),
            Some(Value::Text("ñan".into())),
        ]
    );
    let report = result.report();
    assert_eq!(report.total_rows, 3);
    assert!(!report.has_errors);
    assert_eq!(report.columns["code"].truncated_values, 2);
}

#[test]
fn explicit_date_format_wins_over_guessing() {
    let dataset = text_dataset(&[("when", &[Some("03/04/2024"), Some("not a date")])]);
    let (out, errors) = apply(
        &dataset,
        &[ColumnMapping::new("when", TargetType::Date).with_date_format(DateFormat::DayMonthYearSlash)],
    );
    assert!(errors.is_empty());
    let when = out.column("when").unwrap();
    assert_eq!(when.kind(), ColumnKind::Date);
    assert_eq!(when.values()[0].as_ref().unwrap().to_text(), "2024-04-03");
    assert_eq!(when.values()[1], None);
}

#[test]
fn unknown_column_is_reported_not_panicked() {
    let dataset = text_dataset(&[("a", &[Some("1")])]);
    let (_, errors) = apply(&dataset, &[ColumnMapping::new("b", TargetType::Integer)]);
    assert_eq!(errors[0].error, "Column 'b' not found in dataset");
}
