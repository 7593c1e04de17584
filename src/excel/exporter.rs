//! Excel exporter implementation - results → Excel (.xlsx)

use crate::core::pareto::ParetoResult;
use crate::core::pivot::PivotResult;
use crate::error::{InsightError, InsightResult};
use crate::types::{KeyPart, Value};
use rust_xlsxwriter::{Chart, ChartType, Format, Workbook, Worksheet};
use std::path::Path;
use tracing::debug;

const PARETO_SHEET: &str = "Pareto";
const PIVOT_SHEET: &str = "Pivot";

/// Widest sheet Excel accepts (XFD)
const MAX_COLUMNS: usize = 16_384;

fn export_err(what: &str, e: rust_xlsxwriter::XlsxError) -> InsightError {
    InsightError::Export(format!("Failed to {}: {}", what, e))
}

fn column_index(index: usize) -> InsightResult<u16> {
    u16::try_from(index)
        .ok()
        .filter(|&c| usize::from(c) < MAX_COLUMNS)
        .ok_or_else(|| {
            InsightError::Export(format!(
                "Column {} is beyond the Excel limit of {} columns",
                index + 1,
                MAX_COLUMNS
            ))
        })
}

/// Writes analysis results to Excel workbooks
pub struct ExcelExporter {
    number_format: Format,
    percent_format: Format,
    header_format: Format,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcelExporter {
    /// Create a new Excel exporter
    pub fn new() -> Self {
        Self {
            number_format: Format::new().set_num_format("#,##0.00"),
            percent_format: Format::new().set_num_format("0.0"),
            header_format: Format::new().set_bold(),
        }
    }

    /// Write a Pareto table and chart.
    ///
    /// The chart is a column series of category values combined with a line of
    /// cumulative percentages and a flat threshold line on the secondary axis.
    pub fn export_pareto(
        &self,
        result: &ParetoResult,
        title: &str,
        output_path: &Path,
    ) -> InsightResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(PARETO_SHEET)
            .map_err(|e| export_err("set worksheet name", e))?;

        let headers = [
            "Rank",
            "Category",
            result.value_column.as_str(),
            "Cumulative Value",
            "Cumulative %",
            "Threshold %",
        ];
        self.write_header(worksheet, &headers)?;

        let threshold_percent = result.threshold * 100.0;
        for (idx, row) in result.rows.iter().enumerate() {
            let r = (idx + 1) as u32;
            worksheet
                .write_number(r, 0, row.rank as f64)
                .map_err(|e| export_err("write rank", e))?;
            self.write_key(worksheet, r, 1, &row.category)?;
            worksheet
                .write_number_with_format(r, 2, row.value, &self.number_format)
                .map_err(|e| export_err("write value", e))?;
            worksheet
                .write_number_with_format(r, 3, row.cumulative_value, &self.number_format)
                .map_err(|e| export_err("write cumulative value", e))?;
            worksheet
                .write_number_with_format(r, 4, row.cumulative_percentage, &self.percent_format)
                .map_err(|e| export_err("write cumulative percentage", e))?;
            worksheet
                .write_number(r, 5, threshold_percent)
                .map_err(|e| export_err("write threshold", e))?;
        }

        if !result.rows.is_empty() {
            let last = result.rows.len() as u32;

            let mut chart = Chart::new(ChartType::Column);
            chart
                .add_series()
                .set_name(result.value_column.as_str())
                .set_categories((PARETO_SHEET, 1, 1, last, 1))
                .set_values((PARETO_SHEET, 1, 2, last, 2));
            chart.title().set_name(title);
            chart.x_axis().set_name("Categories");
            chart.y_axis().set_name(result.value_column.as_str());

            let threshold_label = format!("{}% threshold", threshold_percent);
            let mut line = Chart::new(ChartType::Line);
            line.add_series()
                .set_name("Cumulative Percentage (%)")
                .set_categories((PARETO_SHEET, 1, 1, last, 1))
                .set_values((PARETO_SHEET, 1, 4, last, 4))
                .set_secondary_axis(true);
            line.add_series()
                .set_name(threshold_label.as_str())
                .set_categories((PARETO_SHEET, 1, 1, last, 1))
                .set_values((PARETO_SHEET, 1, 5, last, 5))
                .set_secondary_axis(true);
            line.y2_axis()
                .set_name("Cumulative Percentage (%)")
                .set_min(0.0)
                .set_max(105.0);

            chart.combine(&line);

            worksheet
                .insert_chart(1, 7, &chart)
                .map_err(|e| export_err("insert chart", e))?;
        }

        workbook
            .save(output_path)
            .map_err(|e| export_err("save Excel file", e))?;

        debug!(path = %output_path.display(), rows = result.rows.len(), "Exported Pareto chart");
        Ok(())
    }

    /// Write a pivot result as a grid: one row per row key, one column per column key,
    /// plus a margin row and column when the result has totals.
    pub fn export_pivot(&self, result: &PivotResult, output_path: &Path) -> InsightResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(PIVOT_SHEET)
            .map_err(|e| export_err("set worksheet name", e))?;

        let dim_count = result.row_dims.len();
        let col_keys = result.col_keys();

        // Header row: row dimension names, then one label per column key
        let mut headers: Vec<String> = result.row_dims.clone();
        for key in col_keys {
            headers.push(if key.is_empty() {
                format!("{} ({})", result.value_column, result.aggregation)
            } else {
                key.to_string()
            });
        }
        if result.has_margins() {
            headers.push(result.margins_name.clone());
        }
        if headers.len() > MAX_COLUMNS {
            return Err(InsightError::Export(format!(
                "Pivot needs {} columns; Excel sheets hold at most {}",
                headers.len(),
                MAX_COLUMNS
            )));
        }
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        self.write_header(worksheet, &header_refs)?;

        let mut r = 1u32;
        for row_key in result.row_keys() {
            for (c, part) in row_key.parts().iter().enumerate() {
                self.write_key(worksheet, r, column_index(c)?, part)?;
            }
            for (c, col_key) in col_keys.iter().enumerate() {
                if let Some(value) = result.get(row_key, col_key) {
                    self.write_measure(worksheet, r, column_index(dim_count + c)?, value)?;
                }
            }
            if let Some(total) = result.row_total(row_key) {
                self.write_measure(worksheet, r, column_index(dim_count + col_keys.len())?, total)?;
            }
            r += 1;
        }

        if result.has_margins() {
            worksheet
                .write_string_with_format(r, 0, &result.margins_name, &self.header_format)
                .map_err(|e| export_err("write margin label", e))?;
            for (c, col_key) in col_keys.iter().enumerate() {
                if let Some(total) = result.column_total(col_key) {
                    self.write_measure(worksheet, r, column_index(dim_count + c)?, total)?;
                }
            }
            if let Some(grand) = result.grand_total() {
                self.write_measure(worksheet, r, column_index(dim_count + col_keys.len())?, grand)?;
            }
        }

        workbook
            .save(output_path)
            .map_err(|e| export_err("save Excel file", e))?;

        debug!(path = %output_path.display(), cells = result.cell_count(), "Exported pivot table");
        Ok(())
    }

    fn write_header(&self, worksheet: &mut Worksheet, headers: &[&str]) -> InsightResult<()> {
        for (col, name) in headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, column_index(col)?, *name, &self.header_format)
                .map_err(|e| export_err("write header", e))?;
        }
        Ok(())
    }

    fn write_measure(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: f64,
    ) -> InsightResult<()> {
        worksheet
            .write_number_with_format(row, col, value, &self.number_format)
            .map_err(|e| export_err("write number", e))?;
        Ok(())
    }

    /// Write a dimension label with its natural cell type
    fn write_key(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        key: &KeyPart,
    ) -> InsightResult<()> {
        let written = match key.to_value() {
            Value::Number(n) => worksheet.write_number(row, col, n),
            Value::Boolean(b) => worksheet.write_boolean(row, col, b),
            _ => worksheet.write_string(row, col, key.to_string()),
        };
        written.map_err(|e| export_err("write label", e))?;
        Ok(())
    }
}
