use crate::error::{InsightError, InsightResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

//==============================================================================
// Scalar Values
//==============================================================================

/// A single cell value
///
/// Columns are not statically typed, so a column may mix variants. Operations
/// that need a numeric measure check the column before computing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    /// Calendar date (ISO `YYYY-MM-DD` in text sources)
    Date(NaiveDate),
    Text(String),
    /// Explicit missing-value marker
    Absent,
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
            Value::Date(_) => "Date",
            Value::Text(_) => "Text",
            Value::Absent => "Absent",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert into the hashable, ordered form used for grouping
    pub fn to_key_part(&self) -> KeyPart {
        match self {
            Value::Number(n) => KeyPart::Number(KeyPart::canonical_number_bits(*n)),
            Value::Boolean(b) => KeyPart::Boolean(*b),
            Value::Date(d) => KeyPart::Date(*d),
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Absent => KeyPart::Blank,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Absent => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Absent, Into::into)
    }
}

//==============================================================================
// Grouping Keys
//==============================================================================

/// One component of a grouping key
///
/// Numbers are keyed by a canonical bit pattern so they can be hashed.
/// Ordering puts numbers first, then dates, text, booleans, and blanks last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Number(u64),
    Date(NaiveDate),
    Text(String),
    Boolean(bool),
    Blank,
}

impl KeyPart {
    /// Canonical bits for a numeric key: `0.0` and `-0.0` are one key, all NaNs are one key.
    pub fn canonical_number_bits(n: f64) -> u64 {
        if n == 0.0 {
            return 0.0_f64.to_bits();
        }
        if n.is_nan() {
            return f64::NAN.to_bits();
        }
        n.to_bits()
    }

    fn kind_rank(&self) -> u8 {
        match self {
            KeyPart::Number(_) => 0,
            KeyPart::Date(_) => 1,
            KeyPart::Text(_) => 2,
            KeyPart::Boolean(_) => 3,
            KeyPart::Blank => 4,
        }
    }

    /// Convert back into a cell value
    pub fn to_value(&self) -> Value {
        match self {
            KeyPart::Number(bits) => Value::Number(f64::from_bits(*bits)),
            KeyPart::Date(d) => Value::Date(*d),
            KeyPart::Text(s) => Value::Text(s.clone()),
            KeyPart::Boolean(b) => Value::Boolean(*b),
            KeyPart::Blank => Value::Absent,
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => {
                f64::from_bits(*a).total_cmp(&f64::from_bits(*b))
            }
            (KeyPart::Date(a), KeyPart::Date(b)) => a.cmp(b),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Boolean(a), KeyPart::Boolean(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Blank => write!(f, "(blank)"),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl Serialize for KeyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Ordered tuple of key parts, one per grouping column
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Key with no parts (used when there are no column dimensions)
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", labels.join(" / "))
    }
}

impl<const N: usize> From<[&str; N]> for GroupKey {
    fn from(parts: [&str; N]) -> Self {
        Self(
            parts
                .iter()
                .map(|s| KeyPart::Text((*s).to_string()))
                .collect(),
        )
    }
}

impl From<Vec<KeyPart>> for GroupKey {
    fn from(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }
}

//==============================================================================
// Tables
//==============================================================================

/// One record: column name to value
pub type Record = BTreeMap<String, Value>;

/// A named column of values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered sequence of uniformly keyed records, stored column-wise
///
/// Row `i` of the table is the record built from `values[i]` of every column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column, replacing any existing column with the same name
    pub fn add_column(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Build a table from records, which must all share one key set
    pub fn from_records(name: impl Into<String>, records: Vec<Record>) -> InsightResult<Self> {
        let mut table = Table::new(name);
        let Some(first) = records.first() else {
            return Ok(table);
        };

        let names: Vec<String> = first.keys().cloned().collect();
        let expected: HashSet<&String> = first.keys().collect();

        for (i, record) in records.iter().enumerate() {
            let keys: HashSet<&String> = record.keys().collect();
            if keys != expected {
                let mut missing: Vec<&str> = expected
                    .difference(&keys)
                    .map(|s| s.as_str())
                    .collect();
                let mut extra: Vec<&str> = keys.difference(&expected).map(|s| s.as_str()).collect();
                missing.sort_unstable();
                extra.sort_unstable();
                return Err(InsightError::InvalidSource(format!(
                    "Record {} is not keyed like record 0 (missing: [{}], unexpected: [{}])",
                    i,
                    missing.join(", "),
                    extra.join(", ")
                )));
            }
        }

        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(n.clone(), Vec::with_capacity(records.len())))
            .collect();
        for mut record in records {
            for column in &mut columns {
                let value = record.remove(&column.name).unwrap_or(Value::Absent);
                column.values.push(value);
            }
        }

        table.columns = columns;
        Ok(table)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with `MissingColumn` if the schema lacks it
    pub fn require_column(&self, name: &str) -> InsightResult<&Column> {
        self.column(name)
            .ok_or_else(|| InsightError::missing_column(name, &self.column_names()))
    }

    /// Read a measure column as numbers, `None` for absent cells
    ///
    /// Any present non-numeric cell fails the whole read. NaN reads as absent.
    pub fn numeric_values(&self, name: &str) -> InsightResult<Vec<Option<f64>>> {
        let column = self.require_column(name)?;
        column
            .values
            .iter()
            .enumerate()
            .map(|(row, value)| match value {
                // NaN is a missing measurement, not a number to sum
                Value::Number(n) if n.is_nan() => Ok(None),
                Value::Number(n) => Ok(Some(*n)),
                Value::Absent => Ok(None),
                other => Err(InsightError::TypeMismatch {
                    column: name.to_string(),
                    row,
                    expected: "Number",
                    found: other.type_name(),
                }),
            })
            .collect()
    }

    /// Get the number of rows (length of first column, all should be same)
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Materialize row `index` as a record
    pub fn record(&self, index: usize) -> Option<Record> {
        if index >= self.row_count() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| {
                    let value = c.values.get(index).cloned().unwrap_or(Value::Absent);
                    (c.name.clone(), value)
                })
                .collect(),
        )
    }

    /// Validate all columns have the same length
    pub fn validate_lengths(&self) -> Result<(), String> {
        let row_count = self.row_count();
        for column in &self.columns {
            if column.len() != row_count {
                return Err(format!(
                    "Column '{}' has {} rows, expected {} rows",
                    column.name,
                    column.len(),
                    row_count
                ));
            }
        }
        Ok(())
    }

    /// Like `validate_lengths`, failing with `InvalidSource`
    pub fn require_uniform(&self) -> InsightResult<()> {
        self.validate_lengths()
            .map_err(|e| InsightError::InvalidSource(format!("Table '{}': {}", self.name, e)))
    }

    /// Grouping key of row `index` over the given columns
    ///
    /// Callers validate the columns first; a missing column yields blanks.
    pub fn key_at(&self, index: usize, columns: &[&Column]) -> GroupKey {
        GroupKey(
            columns
                .iter()
                .map(|c| c.values.get(index).map_or(KeyPart::Blank, Value::to_key_part))
                .collect(),
        )
    }
}
