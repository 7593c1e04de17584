use crate::core::{AnalysisFacade, Aggregation, ParetoResult, ParetoSummary, PivotResult, PivotSpec};
use crate::error::{InsightError, InsightResult};
use crate::excel::ExcelExporter;
use crate::parser::Source;
use crate::types::Table;
use crate::writer;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Width of numeric columns in terminal tables
const NUMBER_WIDTH: usize = 14;

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places for display
    let rounded = (n * 1e6).round() / 1e6;
    // Format with up to 6 decimal places, removing trailing zeros
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn format_percent(fraction: f64) -> String {
    format!("{}%", format_number(fraction * 100.0))
}

fn load_table(facade: &AnalysisFacade, file: &Path) -> InsightResult<Table> {
    println!("   File: {}", file.display());
    let table = facade.load(Source::Path(file.to_path_buf()))?;
    println!(
        "   Rows: {}  Columns: {}\n",
        table.row_count(),
        table.column_names().join(", ").cyan()
    );
    Ok(table)
}

/// Execute the pareto command
pub fn pareto(
    facade: &AnalysisFacade,
    file: PathBuf,
    category: String,
    value: String,
    chart: Option<PathBuf>,
    output: Option<PathBuf>,
) -> InsightResult<()> {
    println!("{}", "📊 Insight - Pareto Analysis".bold().green());
    let table = load_table(facade, &file)?;

    let result = facade.pareto(&table, &category, &value)?;
    print_pareto_table(&result);
    print_pareto_summary(&result);

    let title = format!("Pareto Analysis: {} by {}", value, category);
    finish_pareto(facade, &result, &title, chart, output.as_deref(), &result)
}

/// Execute the sales command (Pareto over the sales preset columns)
pub fn sales(
    facade: &AnalysisFacade,
    file: PathBuf,
    chart: Option<PathBuf>,
    output: Option<PathBuf>,
) -> InsightResult<()> {
    println!("{}", "📊 Insight - Sales by Product".bold().green());
    let table = load_table(facade, &file)?;

    let summary = facade.analyze_sales_by_product(&table)?;
    print_preset_summary(&summary, "products");
    finish_pareto(
        facade,
        &summary.result,
        "Sales Pareto Analysis",
        chart,
        output.as_deref(),
        &summary,
    )
}

/// Execute the inventory command (Pareto over the inventory preset columns)
pub fn inventory(
    facade: &AnalysisFacade,
    file: PathBuf,
    chart: Option<PathBuf>,
    output: Option<PathBuf>,
) -> InsightResult<()> {
    println!("{}", "📦 Insight - Inventory Turnover".bold().green());
    let table = load_table(facade, &file)?;

    let summary = facade.analyze_inventory_turnover(&table)?;
    print_preset_summary(&summary, "items");
    finish_pareto(
        facade,
        &summary.result,
        "Inventory Turnover Pareto Analysis",
        chart,
        output.as_deref(),
        &summary,
    )
}

/// Execute the pivot command
#[allow(clippy::too_many_arguments)]
pub fn pivot(
    facade: &AnalysisFacade,
    file: PathBuf,
    rows: Vec<String>,
    columns: Vec<String>,
    value: String,
    agg: String,
    margins: bool,
    fill: Option<f64>,
    output: Option<PathBuf>,
) -> InsightResult<()> {
    println!("{}", "🧮 Insight - Pivot Table".bold().green());
    let aggregation: Aggregation = agg.parse()?;
    let table = load_table(facade, &file)?;

    let spec = PivotSpec::new(rows, value)
        .columns(columns)
        .aggregation(aggregation)
        .margins(margins)
        .fill_value(fill)
        .margins_name(facade.config().margins_name.as_str());
    let result = facade.pivot(&table, &spec)?;

    print_pivot_table(&result);
    finish_pivot(&result, output.as_deref())
}

/// Execute the sales-pivot command
pub fn sales_pivot(
    facade: &AnalysisFacade,
    file: PathBuf,
    rows: String,
    columns: Option<String>,
    value: String,
    agg: String,
    output: Option<PathBuf>,
) -> InsightResult<()> {
    println!("{}", "🧮 Insight - Sales Pivot".bold().green());
    let aggregation: Aggregation = agg.parse()?;
    let table = load_table(facade, &file)?;

    let result = facade.create_sales_pivot_analysis(
        &table,
        &rows,
        columns.as_deref(),
        &value,
        aggregation,
    )?;

    print_pivot_table(&result);
    finish_pivot(&result, output.as_deref())
}

//==============================================================================
// Output files
//==============================================================================

fn finish_pareto<T: serde::Serialize>(
    facade: &AnalysisFacade,
    result: &ParetoResult,
    title: &str,
    chart: Option<PathBuf>,
    output: Option<&Path>,
    report: &T,
) -> InsightResult<()> {
    if let Some(chart_path) = chart {
        facade.render_chart(result, title, &chart_path)?;
        println!(
            "{}",
            format!("✅ Chart exported to {}", chart_path.display())
                .bold()
                .green()
        );
    }
    if let Some(output_path) = output {
        writer::write_report(output_path, report)?;
        println!(
            "{}",
            format!("✅ Report written to {}", output_path.display())
                .bold()
                .green()
        );
    }
    Ok(())
}

fn finish_pivot(result: &PivotResult, output: Option<&Path>) -> InsightResult<()> {
    let Some(output_path) = output else {
        return Ok(());
    };

    let extension = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => {
            ExcelExporter::new().export_pivot(result, output_path)?;
            println!(
                "{}",
                format!("✅ Pivot exported to {}", output_path.display())
                    .bold()
                    .green()
            );
        }
        "yaml" | "yml" | "json" => {
            writer::write_report(output_path, result)?;
            println!(
                "{}",
                format!("✅ Report written to {}", output_path.display())
                    .bold()
                    .green()
            );
        }
        _ => {
            return Err(InsightError::Export(format!(
                "Unsupported output format: {}. Use .xlsx, .yaml or .json",
                output_path.display()
            )));
        }
    }
    Ok(())
}

//==============================================================================
// Terminal tables
//==============================================================================

/// Print ranked categories; rows inside the threshold are highlighted
fn print_pareto_table(result: &ParetoResult) {
    let labels: Vec<String> = result.rows.iter().map(|r| r.category.to_string()).collect();
    let width = labels
        .iter()
        .map(String::len)
        .chain([result.category_column.len()])
        .max()
        .unwrap_or(0);

    println!(
        "{}",
        format!(
            "   {:>4}  {:<width$}  {:>nw$}  {:>nw$}  {:>8}",
            "Rank",
            result.category_column,
            result.value_column,
            "Cumulative",
            "Cum. %",
            width = width,
            nw = NUMBER_WIDTH
        )
        .bold()
    );
    println!("   {}", "─".repeat(width + 2 * NUMBER_WIDTH + 20));

    for (row, label) in result.rows.iter().zip(&labels) {
        let line = format!(
            "   {:>4}  {:<width$}  {:>nw$}  {:>nw$}  {:>7.1}%",
            row.rank,
            label,
            format_number(row.value),
            format_number(row.cumulative_value),
            row.cumulative_percentage,
            width = width,
            nw = NUMBER_WIDTH
        );
        if row.rank <= result.categories_to_reach_threshold {
            println!("{}", line.green());
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
}

fn print_pareto_summary(result: &ParetoResult) {
    println!(
        "{} {} of {} categories ({}) account for {} of {} (total {})",
        "✅".green(),
        result.categories_to_reach_threshold.to_string().bold().green(),
        result.len(),
        format_percent(result.share_of_categories() / 100.0),
        format_percent(result.threshold),
        result.value_column.bright_blue(),
        format_number(result.total).bold()
    );
}

fn print_preset_summary(summary: &ParetoSummary, noun: &str) {
    let result = &summary.result;
    print_pareto_table(result);
    print_pareto_summary(result);

    let top: Vec<String> = summary
        .top_categories
        .iter()
        .map(|r| r.category.to_string())
        .collect();
    if !top.is_empty() {
        println!(
            "   Top {} (within {} cumulative): {}",
            noun,
            format_percent(result.threshold),
            top.join(", ").bright_blue()
        );
    }
    println!();
}

/// Print a pivot grid: one line per row key, one column per column key
fn print_pivot_table(result: &PivotResult) {
    let col_labels: Vec<String> = result
        .col_keys()
        .iter()
        .map(|k| {
            if k.is_empty() {
                format!("{}({})", result.aggregation, result.value_column)
            } else {
                k.to_string()
            }
        })
        .collect();
    let row_labels: Vec<String> = result.row_keys().iter().map(ToString::to_string).collect();
    let row_header = result.row_dims.join(" / ");
    let width = row_labels
        .iter()
        .map(String::len)
        .chain([row_header.len(), result.margins_name.len()])
        .max()
        .unwrap_or(0);
    let col_width = col_labels
        .iter()
        .map(String::len)
        .chain([NUMBER_WIDTH, result.margins_name.len()])
        .max()
        .unwrap_or(NUMBER_WIDTH);

    let mut header = format!("   {:<width$}", row_header, width = width);
    for label in &col_labels {
        header.push_str(&format!("  {:>cw$}", label, cw = col_width));
    }
    if result.has_margins() {
        header.push_str(&format!("  {:>cw$}", result.margins_name, cw = col_width));
    }
    println!("{}", header.bold());
    println!("   {}", "─".repeat(header.len().saturating_sub(3)));

    let cell = |value: Option<f64>| value.map_or_else(|| "-".to_string(), format_number);

    for (row_key, label) in result.row_keys().iter().zip(&row_labels) {
        let mut line = format!("   {:<width$}", label, width = width);
        for col_key in result.col_keys() {
            line.push_str(&format!(
                "  {:>cw$}",
                cell(result.get(row_key, col_key)),
                cw = col_width
            ));
        }
        if result.has_margins() {
            line.push_str(&format!(
                "  {:>cw$}",
                cell(result.row_total(row_key)),
                cw = col_width
            ));
        }
        println!("{}", line);
    }

    if result.has_margins() {
        let mut line = format!("   {:<width$}", result.margins_name, width = width);
        for col_key in result.col_keys() {
            line.push_str(&format!(
                "  {:>cw$}",
                cell(result.column_total(col_key)),
                cw = col_width
            ));
        }
        line.push_str(&format!(
            "  {:>cw$}",
            cell(result.grand_total()),
            cw = col_width
        ));
        println!("{}", line.bold());
    }
    println!();
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
