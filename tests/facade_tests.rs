//! Analysis facade tests
//!
//! Source loading, the sales/inventory presets and configuration overrides.

use pretty_assertions::assert_eq;
use royalbit_insight::config::{AnalysisConfig, PresetColumns};
use royalbit_insight::core::{AnalysisFacade, Aggregation, PivotSpec};
use royalbit_insight::error::InsightError;
use royalbit_insight::parser::Source;
use royalbit_insight::types::{GroupKey, KeyPart, Record, Table, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sales_records() -> Vec<Record> {
    vec![
        record(&[
            ("Product", "Widget".into()),
            ("Region", "North".into()),
            ("Quarter", "Q1".into()),
            ("Sales", Value::Number(500.0)),
        ]),
        record(&[
            ("Product", "Gadget".into()),
            ("Region", "South".into()),
            ("Quarter", "Q1".into()),
            ("Sales", Value::Number(300.0)),
        ]),
        record(&[
            ("Product", "Widget".into()),
            ("Region", "South".into()),
            ("Quarter", "Q2".into()),
            ("Sales", Value::Number(100.0)),
        ]),
        record(&[
            ("Product", "Gizmo".into()),
            ("Region", "North".into()),
            ("Quarter", "Q2".into()),
            ("Sales", Value::Number(100.0)),
        ]),
    ]
}

fn sales_table() -> Table {
    AnalysisFacade::default()
        .load(Source::Records(sales_records()))
        .unwrap()
}

fn text_key(value: &str) -> GroupKey {
    GroupKey::new(vec![KeyPart::Text(value.to_string())])
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_load_records() {
    let table = sales_table();
    assert_eq!(table.row_count(), 4);
    // Record keys are ordered by name
    assert_eq!(
        table.column_names(),
        vec!["Product", "Quarter", "Region", "Sales"]
    );
}

#[test]
fn test_load_non_uniform_records() {
    let mut records = sales_records();
    records[2].remove("Region");

    let err = AnalysisFacade::default()
        .load(Source::Records(records))
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidSource(ref m) if m.contains("Region")));
}

#[test]
fn test_load_columns() {
    let table = AnalysisFacade::default()
        .load(Source::Columns(vec![
            ("Item".to_string(), vec!["Bolts".into(), "Nuts".into()]),
            (
                "Turnover".to_string(),
                vec![Value::Number(8.0), Value::Number(2.0)],
            ),
        ]))
        .unwrap();

    assert_eq!(table.column_names(), vec!["Item", "Turnover"]);
    assert_eq!(table.row_count(), 2);
}

#[test]
fn test_load_columns_with_different_lengths() {
    let err = AnalysisFacade::default()
        .load(Source::Columns(vec![
            ("Item".to_string(), vec!["Bolts".into(), "Nuts".into()]),
            ("Turnover".to_string(), vec![Value::Number(8.0)]),
        ]))
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidSource(_)));
}

#[test]
fn test_load_table_passes_through() {
    let table = sales_table();
    let loaded = AnalysisFacade::default()
        .load(Source::Table(table.clone()))
        .unwrap();
    assert_eq!(loaded, table);
}

#[test]
fn test_load_csv_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.csv");
    fs::write(&path, "Product,Sales\nWidget,10\nGadget,5\n").unwrap();

    let table = AnalysisFacade::default().load(Source::Path(path)).unwrap();
    assert_eq!(table.name, "sales");
    assert_eq!(
        table.numeric_values("Sales").unwrap(),
        vec![Some(10.0), Some(5.0)]
    );
}

#[test]
fn test_pareto_on_empty_record_source() {
    let facade = AnalysisFacade::default();
    let table = facade.load(Source::Records(Vec::new())).unwrap();
    assert!(table.is_empty());

    let err = facade.pareto(&table, "Product", "Sales").unwrap_err();
    assert!(matches!(err, InsightError::EmptyInput(_)));
}

#[test]
fn test_pareto_on_null_yaml_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.yaml");
    fs::write(&path, "~\n").unwrap();
    let facade = AnalysisFacade::default();

    let table = facade.load(Source::Path(path)).unwrap();
    let err = facade.pareto(&table, "Product", "Sales").unwrap_err();
    assert!(matches!(err, InsightError::EmptyInput(_)));
}

#[test]
fn test_load_unsupported_extension() {
    let err = AnalysisFacade::default()
        .load(Source::Path(PathBuf::from("sales.parquet")))
        .unwrap_err();
    assert!(matches!(err, InsightError::InvalidSource(_)));
}

#[test]
fn test_load_missing_file() {
    let err = AnalysisFacade::default()
        .load(Source::Path(PathBuf::from("/nonexistent/sales.csv")))
        .unwrap_err();
    assert!(matches!(err, InsightError::Io(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// PRESETS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_analyze_sales_by_product() {
    let summary = AnalysisFacade::default()
        .analyze_sales_by_product(&sales_table())
        .unwrap();

    // Widget 600 (60%), Gadget 300 (90%), Gizmo 100
    assert_eq!(summary.total_categories, 3);
    assert_eq!(summary.vital_few_count, 2);
    assert!((summary.vital_few_share - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.result.category_column, "Product");
    assert_eq!(summary.result.value_column, "Sales");
    assert_eq!(summary.result.rows[0].value, 600.0);
    assert_eq!(summary.top_categories, summary.result.rows[..1].to_vec());
}

#[test]
fn test_analyze_inventory_turnover() {
    let table = AnalysisFacade::default()
        .load(Source::Columns(vec![
            (
                "Item".to_string(),
                vec!["Bolts".into(), "Nuts".into(), "Washers".into(), "Screws".into()],
            ),
            (
                "Turnover".to_string(),
                [45.0, 35.0, 12.0, 8.0].into_iter().map(Value::Number).collect(),
            ),
        ]))
        .unwrap();

    let summary = AnalysisFacade::default()
        .analyze_inventory_turnover(&table)
        .unwrap();

    assert_eq!(summary.total_categories, 4);
    assert_eq!(summary.vital_few_count, 2);
    assert_eq!(summary.vital_few_share, 50.0);
    // Bolts 45%, Nuts 80%; Washers at 92% falls outside
    let fast_movers: Vec<KeyPart> = summary
        .top_categories
        .iter()
        .map(|r| r.category.clone())
        .collect();
    assert_eq!(
        fast_movers,
        vec![
            KeyPart::Text("Bolts".to_string()),
            KeyPart::Text("Nuts".to_string())
        ]
    );
}

#[test]
fn test_preset_missing_column() {
    let err = AnalysisFacade::default()
        .analyze_inventory_turnover(&sales_table())
        .unwrap_err();
    assert!(matches!(err, InsightError::MissingColumn { ref column, .. } if column == "Item"));
}

#[test]
fn test_preset_columns_from_config() {
    let config = AnalysisConfig {
        sales: PresetColumns::new("Region", "Sales"),
        ..AnalysisConfig::default()
    };
    let summary = AnalysisFacade::new(config)
        .analyze_sales_by_product(&sales_table())
        .unwrap();

    // North 600, South 400
    assert_eq!(summary.result.category_column, "Region");
    assert_eq!(summary.total_categories, 2);
    assert_eq!(summary.result.rows[0].category, KeyPart::Text("North".to_string()));
}

#[test]
fn test_pareto_uses_configured_threshold() {
    let facade = AnalysisFacade::new(AnalysisConfig::default().with_threshold(0.5));
    let result = facade.pareto(&sales_table(), "Product", "Sales").unwrap();

    assert_eq!(result.threshold, 0.5);
    assert_eq!(result.categories_to_reach_threshold, 1);
}

#[test]
fn test_invalid_configured_threshold() {
    let facade = AnalysisFacade::new(AnalysisConfig::default().with_threshold(0.0));
    let err = facade.pareto(&sales_table(), "Product", "Sales").unwrap_err();
    assert!(matches!(err, InsightError::InvalidThreshold(_)));
}

#[test]
fn test_create_sales_pivot_analysis() {
    let result = AnalysisFacade::default()
        .create_sales_pivot_analysis(
            &sales_table(),
            "Region",
            Some("Quarter"),
            "Sales",
            Aggregation::Sum,
        )
        .unwrap();

    assert_eq!(result.margins_name, "Grand Total");
    assert!(result.has_margins());
    assert_eq!(result.get(&text_key("North"), &text_key("Q1")), Some(500.0));
    assert_eq!(result.get(&text_key("South"), &text_key("Q2")), Some(100.0));
    assert_eq!(result.row_total(&text_key("South")), Some(400.0));
    assert_eq!(result.column_total(&text_key("Q2")), Some(200.0));
    assert_eq!(result.grand_total(), Some(1000.0));
}

#[test]
fn test_create_sales_pivot_analysis_mean() {
    let result = AnalysisFacade::default()
        .create_sales_pivot_analysis(&sales_table(), "Region", None, "Sales", Aggregation::Mean)
        .unwrap();

    assert_eq!(
        result.get(&text_key("North"), &GroupKey::empty()),
        Some(300.0)
    );
    assert_eq!(result.grand_total(), Some(250.0));
}

#[test]
fn test_pivot_passes_through() {
    let spec = PivotSpec::new(["Product"], "Sales").aggregation(Aggregation::Count);
    let result = AnalysisFacade::default()
        .pivot(&sales_table(), &spec)
        .unwrap();

    assert_eq!(result.get(&text_key("Widget"), &GroupKey::empty()), Some(2.0));
    assert!(!result.has_margins());
}

#[test]
fn test_render_chart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chart.xlsx");
    let facade = AnalysisFacade::default();
    let summary = facade.analyze_sales_by_product(&sales_table()).unwrap();

    facade
        .render_chart(&summary.result, "Sales Pareto", &path)
        .unwrap();
    assert!(path.exists());
}
