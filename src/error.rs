use thiserror::Error;

pub type InsightResult<T> = Result<T, InsightError>;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("{}", missing_column_message(.column, .available))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Type mismatch in column '{column}' row {row}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Unsupported aggregation '{0}' (expected one of: sum, mean, count, min, max)")]
    UnsupportedAggregation(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid threshold {0}: must be greater than 0 and at most 1")]
    InvalidThreshold(f64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InsightError {
    /// Build a `MissingColumn` error against a table's column list
    pub fn missing_column(column: impl Into<String>, available: &[String]) -> Self {
        InsightError::MissingColumn {
            column: column.into(),
            available: available.to_vec(),
        }
    }
}

/// Find the closest available column name for a "did you mean" hint.
///
/// Tries, in order: case-insensitive exact match, prefix match, substring match.
pub fn find_similar_column(target: &str, available: &[String]) -> Option<String> {
    let target_lower = target.to_lowercase();
    if target_lower.is_empty() {
        return None;
    }

    if let Some(exact) = available
        .iter()
        .find(|c| c.to_lowercase() == target_lower)
    {
        return Some(exact.clone());
    }

    if let Some(prefix) = available
        .iter()
        .find(|c| c.to_lowercase().starts_with(&target_lower))
    {
        return Some(prefix.clone());
    }

    available
        .iter()
        .find(|c| c.to_lowercase().contains(&target_lower))
        .cloned()
}

fn missing_column_message(column: &str, available: &[String]) -> String {
    let mut message = format!("Column '{}' not found", column);

    if let Some(similar) = find_similar_column(column, available) {
        message.push_str(&format!(" (did you mean '{}'?)", similar));
    }

    // Long schemas are noise in a one-line error
    if !available.is_empty() && available.len() <= 10 {
        message.push_str(&format!(". Available columns: {}", available.join(", ")));
    }

    message
}
