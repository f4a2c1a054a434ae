mod common;

use std::path::Path;

use common::{fixture_path, integer_column, text_dataset};
use proptest::prelude::*;
use sheetload::{
    dataset::{ColumnKind, TabularDataset, read_csv},
    mapping::TargetType,
    profile::{self, column_stats, profile_dataset, suggest_table_name, suggest_type},
};

#[test]
fn fixture_profile_suggests_types_per_column() {
    let dataset = read_csv(&fixture_path("orders.csv"), None, None).expect("read fixture");
    let summary = profile_dataset(&dataset, Some(fixture_path("orders.csv").as_path()));
    assert_eq!(summary.table_name, "orders");
    assert_eq!(summary.row_count, 5);
    assert_eq!(summary.column_count, 6);
    assert_eq!(summary.total_missing_values, 2);
    assert!(summary.has_missing_values);
    assert_eq!(summary.preview.len(), 5);

    let suggested: Vec<(&str, TargetType)> = summary
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.suggested_type))
        .collect();
    assert_eq!(
        suggested,
        vec![
            ("id", TargetType::Integer),
            ("customer", TargetType::String),
            ("amount", TargetType::String),
            ("ordered_on", TargetType::Date),
            ("express", TargetType::Boolean),
            ("notes", TargetType::String),
        ]
    );

    let notes = &summary.columns[5];
    assert_eq!(notes.missing_count, 2);
    assert_eq!(notes.unique_count, 3);
    assert_eq!(notes.sample_values.len(), 3);
}

#[test]
fn large_integers_suggest_bigint() {
    let dataset = TabularDataset::new(vec![integer_column(
        "big",
        [Some(1), Some(i64::from(i32::MAX) + 1)],
    )])
    .unwrap();
    assert_eq!(
        suggest_type(dataset.column("big").unwrap()),
        TargetType::Bigint
    );
}

#[test]
fn long_text_suggests_text_and_all_null_suggests_string() {
    let long = "x".repeat(300);
    let dataset = text_dataset(&[
        ("body", &[Some("short"), Some(long.as_str())]),
        ("blank", &[None, None]),
    ]);
    let profiles = profile::profile(&dataset);
    assert_eq!(profiles["body"].suggested_type, TargetType::Text);
    assert_eq!(profiles["blank"].suggested_type, TargetType::String);
    assert_eq!(profiles["blank"].dtype, ColumnKind::Empty);
    assert!(profiles["blank"].sample_values.is_empty());
}

#[test]
fn table_names_are_safe_identifiers() {
    assert_eq!(suggest_table_name(Path::new("Sales Report.csv")), "sales_report");
    assert_eq!(suggest_table_name(Path::new("2024-orders.tsv")), "table_2024_orders");
    assert_eq!(suggest_table_name(Path::new("###.csv")), "imported_data");
}

#[test]
fn stats_describe_numeric_columns() {
    let dataset = TabularDataset::new(vec![integer_column(
        "n",
        [Some(1), Some(2), Some(3), Some(4), None],
    )])
    .unwrap();
    let stats = column_stats(&dataset, "n").unwrap();
    assert_eq!(stats.count, 4);
    assert_eq!(stats.missing_count, 1);
    let numeric = stats.numeric.expect("numeric summary");
    assert_eq!(numeric.min, 1.0);
    assert_eq!(numeric.max, 4.0);
    assert_eq!(numeric.mean, 2.5);
    assert_eq!(numeric.median, 2.5);
    assert!(stats.lengths.is_none());
    assert!(column_stats(&dataset, "missing").is_err());
}

proptest! {
    #[test]
    fn profiling_is_deterministic(values in prop::collection::vec(prop::option::of(any::<i64>()), 0..40)) {
        let dataset = TabularDataset::new(vec![integer_column("n", values.clone())]).unwrap();
        let first = profile::profile(&dataset);
        let second = profile::profile(&dataset);
        prop_assert_eq!(&first, &second);

        let column = &first["n"];
        prop_assert_eq!(column.missing_count, values.iter().filter(|v| v.is_none()).count());
        prop_assert!(column.sample_values.len() <= profile::SAMPLE_VALUES);
        if values.iter().all(Option::is_none) {
            prop_assert_eq!(column.suggested_type, TargetType::String);
        } else {
            prop_assert!(matches!(column.suggested_type, TargetType::Integer | TargetType::Bigint));
        }
    }

    #[test]
    fn free_text_always_gets_a_suggestion(cells in prop::collection::vec(prop::option::of("[a-zA-Z0-9 ]{0,20}"), 1..30)) {
        let borrowed: Vec<Option<&str>> = cells.iter().map(|c| c.as_deref()).collect();
        let dataset = text_dataset(&[("free", borrowed.as_slice())]);
        let suggested = profile::profile(&dataset)["free"].suggested_type;
        prop_assert!(matches!(
            suggested,
            TargetType::String | TargetType::Text | TargetType::Date | TargetType::Boolean
        ));
    }
}
