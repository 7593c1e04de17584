//! Pivot aggregation
//!
//! Groups records by row-dimension columns crossed with column-dimension
//! columns, aggregates a measure per cell and optionally adds margins. Margins
//! are computed from the raw records of each row, column, or the whole table,
//! never from already aggregated cells.

use crate::core::aggregate::{Accumulator, Aggregation};
use crate::error::{InsightError, InsightResult};
use crate::types::{Column, GroupKey, Table, Value};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Default label for margin rows and columns
pub const DEFAULT_MARGINS_NAME: &str = "Total";

/// Parameters of a pivot aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotSpec {
    pub row_dims: Vec<String>,
    pub col_dims: Vec<String>,
    pub value_column: String,
    pub aggregation: Aggregation,
    pub include_margins: bool,
    /// When set, missing (row, column) combinations are filled with this value
    pub fill_value: Option<f64>,
    pub margins_name: String,
}

impl PivotSpec {
    /// Sum `value_column` by `row_dims`, no column dimensions, no margins
    pub fn new<I, S>(row_dims: I, value_column: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            row_dims: row_dims.into_iter().map(Into::into).collect(),
            col_dims: Vec::new(),
            value_column: value_column.into(),
            aggregation: Aggregation::Sum,
            include_margins: false,
            fill_value: None,
            margins_name: DEFAULT_MARGINS_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, col_dims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.col_dims = col_dims.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    #[must_use]
    pub fn margins(mut self, include_margins: bool) -> Self {
        self.include_margins = include_margins;
        self
    }

    #[must_use]
    pub fn fill_value(mut self, fill_value: Option<f64>) -> Self {
        self.fill_value = fill_value;
        self
    }

    #[must_use]
    pub fn margins_name(mut self, name: impl Into<String>) -> Self {
        self.margins_name = name.into();
        self
    }
}

/// Aggregated pivot matrix with optional margins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotResult {
    pub row_dims: Vec<String>,
    pub col_dims: Vec<String>,
    pub value_column: String,
    pub aggregation: Aggregation,
    pub margins_name: String,
    row_keys: Vec<GroupKey>,
    col_keys: Vec<GroupKey>,
    #[serde(serialize_with = "serialize_cells")]
    cells: BTreeMap<(GroupKey, GroupKey), f64>,
    #[serde(serialize_with = "serialize_totals")]
    row_totals: Option<BTreeMap<GroupKey, f64>>,
    #[serde(serialize_with = "serialize_totals")]
    column_totals: Option<BTreeMap<GroupKey, f64>>,
    grand_total: Option<f64>,
}

impl PivotResult {
    /// Observed row keys in sorted order
    pub fn row_keys(&self) -> &[GroupKey] {
        &self.row_keys
    }

    /// Observed column keys in sorted order (one empty key when there are no column dimensions)
    pub fn col_keys(&self) -> &[GroupKey] {
        &self.col_keys
    }

    pub fn get(&self, row: &GroupKey, col: &GroupKey) -> Option<f64> {
        self.cells.get(&(row.clone(), col.clone())).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&GroupKey, &GroupKey, f64)> {
        self.cells.iter().map(|((r, c), v)| (r, c, *v))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn has_margins(&self) -> bool {
        self.row_totals.is_some()
    }

    pub fn row_total(&self, row: &GroupKey) -> Option<f64> {
        self.row_totals.as_ref()?.get(row).copied()
    }

    pub fn column_total(&self, col: &GroupKey) -> Option<f64> {
        self.column_totals.as_ref()?.get(col).copied()
    }

    pub fn grand_total(&self) -> Option<f64> {
        self.grand_total
    }

    /// Flatten into a table with one record per cell
    ///
    /// Columns are the row dimensions, the column dimensions, then the measure.
    /// If the measure name collides with a dimension it is suffixed with the
    /// aggregation name.
    pub fn to_table(&self) -> Table {
        let dims: Vec<&String> = self.row_dims.iter().chain(&self.col_dims).collect();
        let mut dim_values: Vec<Vec<Value>> = vec![Vec::with_capacity(self.cells.len()); dims.len()];
        let mut measures = Vec::with_capacity(self.cells.len());

        for ((row, col), value) in &self.cells {
            for (slot, part) in row.parts().iter().chain(col.parts()).enumerate() {
                dim_values[slot].push(part.to_value());
            }
            measures.push(Value::Number(*value));
        }

        let mut table = Table::new(format!("{}_{}", self.aggregation, self.value_column));
        for (name, values) in dims.iter().zip(dim_values) {
            table.add_column(Column::new((*name).clone(), values));
        }

        let measure_name = if dims.iter().any(|d| **d == self.value_column) {
            format!("{}_{}", self.value_column, self.aggregation)
        } else {
            self.value_column.clone()
        };
        table.add_column(Column::new(measure_name, measures));
        table
    }
}

#[derive(Serialize)]
struct CellEntry<'a> {
    row: &'a GroupKey,
    column: &'a GroupKey,
    value: f64,
}

#[derive(Serialize)]
struct TotalEntry<'a> {
    key: &'a GroupKey,
    value: f64,
}

fn serialize_cells<S: Serializer>(
    cells: &BTreeMap<(GroupKey, GroupKey), f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(cells.iter().map(|((row, column), value)| CellEntry {
        row,
        column,
        value: *value,
    }))
}

fn serialize_totals<S: Serializer>(
    totals: &Option<BTreeMap<GroupKey, f64>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match totals {
        Some(map) => serializer.collect_seq(map.iter().map(|(key, value)| TotalEntry {
            key,
            value: *value,
        })),
        None => serializer.serialize_none(),
    }
}

/// One measure cell as the aggregation sees it
#[derive(Debug, Clone, Copy)]
enum Sample {
    Absent,
    Number(f64),
    /// Present but non-numeric (only reachable for count)
    Other,
}

fn feed(acc: &mut Accumulator, sample: Sample) {
    match sample {
        Sample::Absent => {}
        Sample::Number(n) => acc.add(n),
        Sample::Other => acc.add_present(),
    }
}

fn read_samples(table: &Table, spec: &PivotSpec) -> InsightResult<Vec<Sample>> {
    if spec.aggregation.requires_numeric() {
        let values = table.numeric_values(&spec.value_column)?;
        return Ok(values
            .into_iter()
            .map(|v| v.map_or(Sample::Absent, Sample::Number))
            .collect());
    }

    let column = table.require_column(&spec.value_column)?;
    Ok(column
        .values
        .iter()
        .map(|v| match v {
            Value::Absent => Sample::Absent,
            Value::Number(n) if n.is_nan() => Sample::Absent,
            Value::Number(n) => Sample::Number(*n),
            _ => Sample::Other,
        })
        .collect())
}

fn finish_totals(
    totals: HashMap<GroupKey, Accumulator>,
    aggregation: Aggregation,
) -> BTreeMap<GroupKey, f64> {
    totals
        .into_iter()
        .filter_map(|(key, acc)| acc.finish(aggregation).map(|v| (key, v)))
        .collect()
}

/// Aggregate `table` according to `spec`
///
/// Cells exist only for (row, column) combinations observed in the data unless
/// `spec.fill_value` asks for a dense matrix. Groups whose measure cells are all
/// absent yield 0 for sum and count and no cell for mean, min and max.
///
/// # Errors
/// - `InvalidArgument` if `row_dims` is empty
/// - `InvalidSource` if the table's columns differ in length
/// - `MissingColumn` if any dimension or the measure column is not in the table
/// - `TypeMismatch` if the measure holds non-numbers and the aggregation is numeric
pub fn aggregate(table: &Table, spec: &PivotSpec) -> InsightResult<PivotResult> {
    if spec.row_dims.is_empty() {
        return Err(InsightError::InvalidArgument(
            "Pivot needs at least one row dimension".to_string(),
        ));
    }
    table.require_uniform()?;

    let row_columns = spec
        .row_dims
        .iter()
        .map(|d| table.require_column(d))
        .collect::<InsightResult<Vec<_>>>()?;
    let col_columns = spec
        .col_dims
        .iter()
        .map(|d| table.require_column(d))
        .collect::<InsightResult<Vec<_>>>()?;
    let samples = read_samples(table, spec)?;

    debug!(
        table = %table.name,
        rows = ?spec.row_dims,
        columns = ?spec.col_dims,
        value = %spec.value_column,
        aggregation = %spec.aggregation,
        margins = spec.include_margins,
        "Running pivot aggregation"
    );

    let mut groups: HashMap<(GroupKey, GroupKey), Accumulator> = HashMap::new();
    let mut row_totals: HashMap<GroupKey, Accumulator> = HashMap::new();
    let mut column_totals: HashMap<GroupKey, Accumulator> = HashMap::new();
    let mut grand = Accumulator::new();

    for (index, sample) in samples.iter().enumerate() {
        let row_key = table.key_at(index, &row_columns);
        let col_key = table.key_at(index, &col_columns);

        if spec.include_margins {
            feed(row_totals.entry(row_key.clone()).or_default(), *sample);
            feed(column_totals.entry(col_key.clone()).or_default(), *sample);
            feed(&mut grand, *sample);
        }
        feed(groups.entry((row_key, col_key)).or_default(), *sample);
    }

    let row_keys: Vec<GroupKey> = groups
        .keys()
        .map(|(r, _)| r.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_keys: Vec<GroupKey> = groups
        .keys()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells: BTreeMap<(GroupKey, GroupKey), f64> = groups
        .into_iter()
        .filter_map(|(key, acc)| acc.finish(spec.aggregation).map(|v| (key, v)))
        .collect();

    if let Some(fill) = spec.fill_value {
        for row in &row_keys {
            for col in &col_keys {
                cells.entry((row.clone(), col.clone())).or_insert(fill);
            }
        }
    }

    let (row_totals, column_totals, grand_total) = if spec.include_margins {
        (
            Some(finish_totals(row_totals, spec.aggregation)),
            Some(finish_totals(column_totals, spec.aggregation)),
            grand.finish(spec.aggregation),
        )
    } else {
        (None, None, None)
    };

    debug!(
        row_keys = row_keys.len(),
        col_keys = col_keys.len(),
        cells = cells.len(),
        "Pivot aggregation complete"
    );

    Ok(PivotResult {
        row_dims: spec.row_dims.clone(),
        col_dims: spec.col_dims.clone(),
        value_column: spec.value_column.clone(),
        aggregation: spec.aggregation,
        margins_name: spec.margins_name.clone(),
        row_keys,
        col_keys,
        cells,
        row_totals,
        column_totals,
        grand_total,
    })
}

/// Aggregate several measures over the same dimensions, one result per measure
pub fn aggregate_measures(
    table: &Table,
    spec: &PivotSpec,
    measures: &[(String, Aggregation)],
) -> InsightResult<Vec<PivotResult>> {
    measures
        .iter()
        .map(|(column, aggregation)| {
            let measure_spec = PivotSpec {
                value_column: column.clone(),
                aggregation: *aggregation,
                ..spec.clone()
            };
            aggregate(table, &measure_spec)
        })
        .collect()
}
