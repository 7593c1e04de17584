//! Pareto (80/20) contribution analysis
//!
//! Groups a table by a category column, sums a measure per category, ranks the
//! categories by that sum and finds the shortest ranked prefix whose cumulative
//! share reaches a threshold.

use crate::error::{InsightError, InsightResult};
use crate::types::{KeyPart, Table};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Default cumulative share threshold (the "80" in 80/20)
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Slack when comparing cumulative percentages against the threshold
const PERCENT_TOLERANCE: f64 = 1e-9;

/// One ranked category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    /// 1-based rank
    pub rank: usize,
    pub category: KeyPart,
    pub value: f64,
    pub cumulative_value: f64,
    pub cumulative_percentage: f64,
}

/// Ranked categories with their cumulative shares
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoResult {
    pub category_column: String,
    pub value_column: String,
    pub threshold: f64,
    pub total: f64,
    pub rows: Vec<ParetoRow>,
    /// Smallest N such that row N's cumulative percentage reaches the threshold
    pub categories_to_reach_threshold: usize,
}

impl ParetoResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The leading categories that together reach the threshold
    pub fn vital_few(&self) -> &[ParetoRow] {
        &self.rows[..self.categories_to_reach_threshold.min(self.rows.len())]
    }

    /// Percentage of all categories needed to reach the threshold
    pub fn share_of_categories(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.categories_to_reach_threshold as f64 / self.rows.len() as f64 * 100.0
    }

    /// Rows whose cumulative percentage stays at or below `percent`
    pub fn rows_within(&self, percent: f64) -> Vec<&ParetoRow> {
        self.rows
            .iter()
            .filter(|r| r.cumulative_percentage <= percent + PERCENT_TOLERANCE)
            .collect()
    }
}

/// Pareto analyzer with a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParetoAnalyzer {
    threshold: f64,
}

impl Default for ParetoAnalyzer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ParetoAnalyzer {
    /// Create an analyzer; `threshold` must be in `(0, 1]`
    pub fn new(threshold: f64) -> InsightResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(InsightError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Rank the categories of `category_column` by the summed `value_column`.
    ///
    /// Ties keep the order in which categories first appear in the table.
    /// Absent measure cells are skipped; a category with only absent cells is
    /// still listed, with value 0.
    ///
    /// # Errors
    /// - `InvalidSource` if the table's columns differ in length
    /// - `EmptyInput` if the table has no rows
    /// - `MissingColumn` if either column is not in the table
    /// - `TypeMismatch` if any present measure cell is not a number
    /// - `DegenerateInput` if the measure totals zero or overflows
    pub fn analyze(
        &self,
        table: &Table,
        category_column: &str,
        value_column: &str,
    ) -> InsightResult<ParetoResult> {
        table.require_uniform()?;
        if table.is_empty() {
            return Err(InsightError::EmptyInput(format!(
                "Table '{}' has no rows to rank",
                table.name
            )));
        }

        let categories = table.require_column(category_column)?;
        let values = table.numeric_values(value_column)?;

        debug!(
            table = %table.name,
            category_column,
            value_column,
            threshold = self.threshold,
            rows = table.row_count(),
            "Running Pareto analysis"
        );

        // Groups in first-occurrence order
        let mut index: HashMap<KeyPart, usize> = HashMap::new();
        let mut groups: Vec<(KeyPart, f64)> = Vec::new();
        for (category, value) in categories.values.iter().zip(&values) {
            let key = category.to_key_part();
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, 0.0));
                    groups.len() - 1
                }
            };
            if let Some(v) = value {
                groups[slot].1 += v;
            }
        }

        // Stable sort keeps first-occurrence order among equal sums
        groups.sort_by(|a, b| b.1.total_cmp(&a.1));

        let total: f64 = groups.iter().map(|(_, v)| v).sum();
        if total == 0.0 {
            return Err(InsightError::DegenerateInput(format!(
                "Column '{}' totals zero; cumulative percentages are undefined",
                value_column
            )));
        }
        if !total.is_finite() {
            return Err(InsightError::DegenerateInput(format!(
                "Column '{}' total is not finite ({}); cumulative percentages are undefined",
                value_column, total
            )));
        }

        let mut rows = Vec::with_capacity(groups.len());
        let mut cumulative = 0.0;
        for (i, (category, value)) in groups.into_iter().enumerate() {
            cumulative += value;
            rows.push(ParetoRow {
                rank: i + 1,
                category,
                value,
                cumulative_value: cumulative,
                cumulative_percentage: cumulative / total * 100.0,
            });
        }

        let target = self.threshold * 100.0 - PERCENT_TOLERANCE;
        let categories_to_reach_threshold = rows
            .iter()
            .position(|r| r.cumulative_percentage >= target)
            .map_or(rows.len(), |i| i + 1);

        debug!(
            categories = rows.len(),
            categories_to_reach_threshold, total, "Pareto analysis complete"
        );

        Ok(ParetoResult {
            category_column: category_column.to_string(),
            value_column: value_column.to_string(),
            threshold: self.threshold,
            total,
            rows,
            categories_to_reach_threshold,
        })
    }
}
