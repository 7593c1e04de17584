use crate::error::{InsightError, InsightResult};
use crate::excel::ExcelImporter;
use crate::types::{Column, Record, Table, Value};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// Where a table comes from
#[derive(Debug, Clone)]
pub enum Source {
    /// An already materialized table
    Table(Table),
    /// Records that must all share one key set
    Records(Vec<Record>),
    /// Named columns of equal length (dictionary form)
    Columns(Vec<(String, Vec<Value>)>),
    /// A `.csv`, `.yaml`/`.yml` or `.xlsx` file
    Path(PathBuf),
}

/// Materialize a source into a validated table.
///
/// # Errors
/// `InvalidSource` when records are not uniformly keyed, columns differ in
/// length, or the file extension is not recognised. File and format errors
/// propagate from the individual readers.
pub fn load_source(source: Source) -> InsightResult<Table> {
    let table = match source {
        Source::Table(table) => {
            table.require_uniform()?;
            table
        }
        Source::Records(records) => Table::from_records("records", records)?,
        Source::Columns(columns) => table_from_columns("columns", columns)?,
        Source::Path(path) => read_table(&path)?,
    };

    info!(
        table = %table.name,
        rows = table.row_count(),
        columns = table.columns().len(),
        "Loaded table"
    );
    Ok(table)
}

/// Read a table file, choosing the reader from the extension
pub fn read_table(path: &Path) -> InsightResult<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "yaml" | "yml" => read_yaml(path),
        "xlsx" => ExcelImporter::new(path).import(None),
        _ => Err(InsightError::InvalidSource(format!(
            "Unsupported file type '{}' (expected .csv, .yaml, .yml or .xlsx)",
            path.display()
        ))),
    }
}

fn table_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}

//==============================================================================
// Delimited text
//==============================================================================

/// Read a CSV file with a header row
pub fn read_csv(path: &Path) -> InsightResult<Table> {
    let file = std::fs::File::open(path)?;
    parse_csv(&table_name_for(path), file)
}

/// Parse CSV data with a header row; every field is type-inferred
pub fn parse_csv<R: Read>(name: &str, reader: R) -> InsightResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    check_column_names(&headers)?;

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(InsightError::InvalidSource(format!(
                "CSV row {} has {} fields, header has {}",
                index + 1,
                record.len(),
                headers.len()
            )));
        }
        for (slot, field) in record.iter().enumerate() {
            values[slot].push(infer_value(field));
        }
    }

    table_from_columns(name, headers.into_iter().zip(values).collect())
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"))
}

/// Infer a typed value from a text field
///
/// Empty → Absent, number → Number (NaN → Absent), `YYYY-MM-DD` → Date,
/// `true`/`false` → Boolean, anything else → Text.
pub fn infer_value(field: &str) -> Value {
    let field = field.trim();
    if field.is_empty() {
        return Value::Absent;
    }

    if let Ok(n) = field.parse::<f64>() {
        return if n.is_nan() {
            Value::Absent
        } else {
            Value::Number(n)
        };
    }

    if iso_date_pattern().is_match(field) {
        if let Ok(date) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
            return Value::Date(date);
        }
    }

    match field.to_lowercase().as_str() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::Text(field.to_string()),
    }
}

//==============================================================================
// YAML
//==============================================================================

/// Read a YAML table file
pub fn read_yaml(path: &Path) -> InsightResult<Table> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&table_name_for(path), &content)
}

/// Parse a YAML table in either column form or record form.
///
/// Column form maps each column name to an array:
///
/// ```yaml
/// Product: [A, B, C]
/// Sales: [120.5, 80, ~]
/// ```
///
/// Record form is a sequence of uniformly keyed mappings:
///
/// ```yaml
/// - { Product: A, Sales: 120.5 }
/// - { Product: B, Sales: 80 }
/// ```
///
/// Either form may be nested under a single top-level `table:` key.
pub fn parse_yaml(name: &str, content: &str) -> InsightResult<Table> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    yaml_to_table(name, unwrap_table_key(yaml))
}

fn unwrap_table_key(yaml: serde_yaml::Value) -> serde_yaml::Value {
    let nested = match &yaml {
        serde_yaml::Value::Mapping(map) if map.len() == 1 => map
            .get("table")
            .filter(|inner| {
                inner.is_mapping()
                    || inner
                        .as_sequence()
                        .is_some_and(|seq| !seq.is_empty() && seq.iter().all(|v| v.is_mapping()))
            })
            .cloned(),
        _ => None,
    };
    nested.unwrap_or(yaml)
}

fn yaml_to_table(name: &str, yaml: serde_yaml::Value) -> InsightResult<Table> {
    match yaml {
        serde_yaml::Value::Mapping(map) => {
            let mut columns = Vec::with_capacity(map.len());
            for (key, value) in map {
                let col_name = key.as_str().ok_or_else(|| {
                    InsightError::InvalidSource("Column name must be a string".to_string())
                })?;
                let serde_yaml::Value::Sequence(seq) = value else {
                    return Err(InsightError::InvalidSource(format!(
                        "Column '{}' in table '{}' must be an array",
                        col_name, name
                    )));
                };
                let values = seq
                    .into_iter()
                    .enumerate()
                    .map(|(row, v)| yaml_scalar(col_name, row, v))
                    .collect::<InsightResult<Vec<_>>>()?;
                columns.push((col_name.to_string(), values));
            }
            table_from_columns(name, columns)
        }
        serde_yaml::Value::Sequence(seq) => {
            let mut records = Vec::with_capacity(seq.len());
            for (row, item) in seq.into_iter().enumerate() {
                let serde_yaml::Value::Mapping(map) = item else {
                    return Err(InsightError::InvalidSource(format!(
                        "Record {} in table '{}' must be a mapping",
                        row, name
                    )));
                };
                let mut record = Record::new();
                for (key, value) in map {
                    let col_name = key.as_str().ok_or_else(|| {
                        InsightError::InvalidSource("Column name must be a string".to_string())
                    })?;
                    record.insert(col_name.to_string(), yaml_scalar(col_name, row, value)?);
                }
                records.push(record);
            }
            Table::from_records(name, records)
        }
        serde_yaml::Value::Null => Ok(Table::new(name)),
        _ => Err(InsightError::InvalidSource(format!(
            "Table '{}' must be a mapping of columns or a sequence of records",
            name
        ))),
    }
}

fn yaml_scalar(column: &str, row: usize, value: serde_yaml::Value) -> InsightResult<Value> {
    if value.is_mapping() || value.is_sequence() {
        return Err(InsightError::InvalidSource(format!(
            "Column '{}' row {}: expected a scalar value",
            column, row
        )));
    }
    let value: Value = serde_yaml::from_value(value).map_err(|e| {
        InsightError::InvalidSource(format!("Column '{}' row {}: {}", column, row, e))
    })?;
    // Bare numbers that look like NaN (.nan) are treated as missing
    Ok(match value {
        Value::Number(n) if n.is_nan() => Value::Absent,
        other => other,
    })
}

//==============================================================================
// Column collections
//==============================================================================

fn check_column_names(names: &[String]) -> InsightResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(InsightError::InvalidSource(
                "Column names must not be empty".to_string(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(InsightError::InvalidSource(format!(
                "Duplicate column name '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Build a table from named columns of equal length
pub fn table_from_columns(
    name: &str,
    columns: Vec<(String, Vec<Value>)>,
) -> InsightResult<Table> {
    let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
    check_column_names(&names)?;

    let mut table = Table::new(name);
    for (col_name, values) in columns {
        table.add_column(Column::new(col_name, values));
    }

    table.require_uniform()?;
    Ok(table)
}
