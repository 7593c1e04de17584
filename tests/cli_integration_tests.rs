//! CLI Integration Tests
//!
//! Tests the `insight` binary directly using assert_cmd.
//!
//! # Coverage Exclusion
//! These tests are skipped during coverage runs. Run without coverage for
//! full testing.

// Skip all CLI tests during coverage builds
#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn insight() -> Command {
    let mut cmd = Command::cargo_bin("insight").unwrap();
    cmd.env_remove("INSIGHT_THRESHOLD").env_remove("RUST_LOG");
    cmd
}

fn sales_csv(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sales.csv");
    fs::write(
        &path,
        "Product,Region,Quarter,Sales\n\
         Widget,North,Q1,500\n\
         Gadget,South,Q1,300\n\
         Widget,South,Q2,100\n\
         Gizmo,North,Q2,100\n",
    )
    .unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    insight()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("insight"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    insight()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("insight"));
}

#[test]
fn test_subcommand_help() {
    for (subcommand, expected) in [
        ("pareto", "Rank categories"),
        ("pivot", "Summarize a measure"),
        ("sales", "products"),
        ("inventory", "inventory turnover"),
        ("sales-pivot", "grand totals"),
    ] {
        insight()
            .args([subcommand, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PARETO
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_pareto_command() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pareto", input.to_str().unwrap(), "-c", "Product", "-v", "Sales"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pareto Analysis"))
        .stdout(predicate::str::contains("Widget"))
        .stdout(predicate::str::contains("of 3 categories"));
}

#[test]
fn test_pareto_report_and_chart() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);
    let report = dir.path().join("pareto.json");
    let chart = dir.path().join("pareto.xlsx");

    insight()
        .args(["pareto", input.to_str().unwrap(), "-c", "Product", "-v", "Sales"])
        .args(["-o", report.to_str().unwrap()])
        .args(["--chart", chart.to_str().unwrap()])
        .assert()
        .success();

    assert!(chart.exists());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["categories_to_reach_threshold"], 2);
    assert_eq!(json["rows"][0]["category"], "Widget");
}

#[test]
fn test_pareto_missing_column_suggests() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pareto", input.to_str().unwrap(), "-c", "product", "-v", "Sales"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did you mean 'Product'"));
}

#[test]
fn test_threshold_from_environment() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);
    let report = dir.path().join("pareto.yaml");

    insight()
        .env("INSIGHT_THRESHOLD", "0.5")
        .args(["pareto", input.to_str().unwrap(), "-c", "Product", "-v", "Sales"])
        .args(["-o", report.to_str().unwrap()])
        .assert()
        .success();

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(yaml["threshold"].as_f64(), Some(0.5));
    assert_eq!(yaml["categories_to_reach_threshold"].as_u64(), Some(1));
}

#[test]
fn test_invalid_threshold_fails() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pareto", input.to_str().unwrap(), "-c", "Product", "-v", "Sales"])
        .args(["--threshold", "80"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid threshold"));
}

#[test]
fn test_config_file_overrides_presets() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);
    let config = dir.path().join("insight.yaml");
    let report = dir.path().join("sales.json");
    fs::write(
        &config,
        "threshold: 0.9\nsales:\n  category_column: Region\n  value_column: Sales\n",
    )
    .unwrap();

    insight()
        .args(["--config", config.to_str().unwrap()])
        .args(["sales", input.to_str().unwrap()])
        .args(["-o", report.to_str().unwrap()])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["result"]["category_column"], "Region");
    assert_eq!(json["total_categories"], 2);
    assert_eq!(json["vital_few_count"], 2);
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["--config", "/nonexistent/insight.yaml"])
        .args(["sales", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_sales_command() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["sales", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sales by Product"))
        .stdout(predicate::str::contains("Top products"));
}

#[test]
fn test_inventory_command_missing_columns() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["inventory", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Column 'Item' not found"));
}

// ═══════════════════════════════════════════════════════════════════════════
// PIVOT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_pivot_command_with_margins() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pivot", input.to_str().unwrap()])
        .args(["-r", "Region", "--columns", "Quarter", "-v", "Sales", "--margins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Q1"))
        .stdout(predicate::str::contains("Total"))
        .stdout(predicate::str::contains("1000"));
}

#[test]
fn test_pivot_yaml_report() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);
    let report = dir.path().join("pivot.yaml");

    insight()
        .args(["pivot", input.to_str().unwrap()])
        .args(["-r", "Region,Product", "-v", "Sales", "-a", "count"])
        .args(["-o", report.to_str().unwrap()])
        .assert()
        .success();

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(yaml["aggregation"].as_str(), Some("count"));
    assert_eq!(yaml["row_dims"][1].as_str(), Some("Product"));
    assert_eq!(yaml["cells"].as_sequence().map(Vec::len), Some(4));
}

#[test]
fn test_pivot_unsupported_aggregation() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pivot", input.to_str().unwrap()])
        .args(["-r", "Region", "-v", "Sales", "-a", "average"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported aggregation 'average'"));
}

#[test]
fn test_pivot_requires_rows() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);

    insight()
        .args(["pivot", input.to_str().unwrap(), "-v", "Sales"])
        .assert()
        .failure();
}

#[test]
fn test_sales_pivot_xlsx() {
    let dir = TempDir::new().unwrap();
    let input = sales_csv(&dir);
    let output = dir.path().join("sales_pivot.xlsx");

    insight()
        .args(["sales-pivot", input.to_str().unwrap()])
        .args(["-r", "Region", "--columns", "Quarter"])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grand Total"));

    assert!(output.exists());
}

#[test]
fn test_unsupported_input_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.parquet");
    fs::write(&input, "not a table").unwrap();

    insight()
        .args(["sales", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}
