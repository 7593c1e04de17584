//! Excel importer implementation - Excel (.xlsx) → Table

use crate::error::{InsightError, InsightResult};
use crate::parser::table_from_columns;
use crate::types::{Table, Value};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use std::path::Path;
use tracing::debug;

/// Excel importer for reading a worksheet as a table
pub struct ExcelImporter {
    path: std::path::PathBuf,
}

impl ExcelImporter {
    /// Create a new Excel importer
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Import one worksheet (the first when `sheet` is `None`)
    ///
    /// The first row is the header. Empty cells become `Absent`.
    pub fn import(&self, sheet: Option<&str>) -> InsightResult<Table> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|e| InsightError::Import(format!("Failed to open Excel file: {}", e)))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let sheet_name = match sheet {
            Some(name) => sheet_names
                .iter()
                .find(|s| s.as_str() == name)
                .cloned()
                .ok_or_else(|| {
                    InsightError::Import(format!(
                        "Sheet '{}' not found (available: {})",
                        name,
                        sheet_names.join(", ")
                    ))
                })?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| InsightError::Import("Workbook has no sheets".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            InsightError::Import(format!("Failed to read sheet '{}': {}", sheet_name, e))
        })?;

        debug!(path = %self.path.display(), sheet = %sheet_name, "Importing worksheet");
        self.range_to_table(&sheet_name, &range)
    }

    fn range_to_table(
        &self,
        sheet_name: &str,
        range: &Range<Data>,
    ) -> InsightResult<Table> {
        let (height, width) = range.get_size();
        let table_name = self.sanitize_table_name(sheet_name);

        if height == 0 {
            return table_from_columns(&table_name, Vec::new());
        }

        // Read header row (row 0)
        let mut column_names: Vec<String> = Vec::with_capacity(width);
        for col in 0..width {
            let name = match range.get((0, col)) {
                Some(Data::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Data::Int(i)) => i.to_string(),
                Some(Data::Float(f)) => f.to_string(),
                _ => format!("col_{}", col),
            };
            column_names.push(name);
        }

        let mut columns: Vec<(String, Vec<Value>)> = column_names
            .into_iter()
            .map(|name| (name, Vec::with_capacity(height.saturating_sub(1))))
            .collect();

        for row in 1..height {
            for (col, (_, values)) in columns.iter_mut().enumerate() {
                let value = range
                    .get((row, col))
                    .map_or(Value::Absent, Self::convert_cell);
                values.push(value);
            }
        }

        table_from_columns(&table_name, columns)
    }

    /// Convert one Excel cell to a value
    fn convert_cell(cell: &Data) -> Value {
        match cell {
            Data::Empty | Data::Error(_) => Value::Absent,
            Data::Int(i) => Value::Number(*i as f64),
            Data::Float(f) if f.is_nan() => Value::Absent,
            Data::Float(f) => Value::Number(*f),
            Data::Bool(b) => Value::Boolean(*b),
            Data::String(s) if s.trim().is_empty() => Value::Absent,
            Data::String(s) => Value::Text(s.clone()),
            Data::DateTime(dt) => Self::serial_to_date(dt.as_f64())
                .map_or(Value::Number(dt.as_f64()), Value::Date),
            Data::DateTimeIso(s) => crate::parser::infer_value(s),
            Data::DurationIso(s) => Value::Text(s.clone()),
        }
    }

    /// Convert an Excel 1900-system serial to a calendar date
    fn serial_to_date(serial: f64) -> Option<NaiveDate> {
        if !serial.is_finite() || serial < 1.0 {
            return None;
        }
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        epoch.checked_add_signed(Duration::days(serial.floor() as i64))
    }

    /// Sanitize sheet name to a table name
    fn sanitize_table_name(&self, sheet_name: &str) -> String {
        sheet_name
            .to_lowercase()
            .replace(' ', "_")
            .replace('&', "and")
            .replace('-', "_")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_importer() -> ExcelImporter {
        ExcelImporter::new(PathBuf::from("test.xlsx"))
    }

    #[test]
    fn test_sanitize_table_name() {
        let importer = create_test_importer();

        assert_eq!(importer.sanitize_table_name("Sheet1"), "sheet1");
        assert_eq!(
            importer.sanitize_table_name("Sales & Returns"),
            "sales_and_returns"
        );
        assert_eq!(importer.sanitize_table_name("Q1-2024"), "q1_2024");
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(ExcelImporter::convert_cell(&Data::Empty), Value::Absent);
        assert_eq!(ExcelImporter::convert_cell(&Data::Int(3)), Value::Number(3.0));
        assert_eq!(
            ExcelImporter::convert_cell(&Data::Float(2.5)),
            Value::Number(2.5)
        );
        assert_eq!(
            ExcelImporter::convert_cell(&Data::String("North".to_string())),
            Value::Text("North".to_string())
        );
        assert_eq!(
            ExcelImporter::convert_cell(&Data::String("  ".to_string())),
            Value::Absent
        );
        assert_eq!(
            ExcelImporter::convert_cell(&Data::Bool(true)),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_serial_to_date() {
        // 45292 is 2024-01-01 in the 1900 date system
        assert_eq!(
            ExcelImporter::serial_to_date(45292.0),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(ExcelImporter::serial_to_date(0.5), None);
    }

    #[test]
    fn test_import_missing_file() {
        let importer = ExcelImporter::new("does-not-exist.xlsx");
        assert!(matches!(
            importer.import(None),
            Err(InsightError::Import(_))
        ));
    }
}
