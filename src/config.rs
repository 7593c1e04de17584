//! Analysis configuration
//!
//! Defaults cover the common sales/inventory column conventions. A YAML file can
//! override any subset of fields:
//!
//! ```yaml
//! threshold: 0.9
//! sales:
//!   category_column: SKU
//!   value_column: Revenue
//! ```

use crate::core::pareto::DEFAULT_THRESHOLD;
use crate::core::pivot::DEFAULT_MARGINS_NAME;
use crate::error::{InsightError, InsightResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Category/measure column pair used by a Pareto preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetColumns {
    pub category_column: String,
    pub value_column: String,
}

impl PresetColumns {
    pub fn new(category_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            category_column: category_column.into(),
            value_column: value_column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cumulative share threshold for Pareto analyses, in `(0, 1]`
    pub threshold: f64,
    /// Margin label for ad-hoc pivots
    pub margins_name: String,
    pub sales: PresetColumns,
    pub inventory: PresetColumns,
    /// Margin label for the sales pivot preset
    pub sales_pivot_margins_name: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            margins_name: DEFAULT_MARGINS_NAME.to_string(),
            sales: PresetColumns::new("Product", "Sales"),
            inventory: PresetColumns::new("Item", "Turnover"),
            sales_pivot_margins_name: "Grand Total".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration file; fields it omits keep their defaults
    pub fn load(path: &Path) -> InsightResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_yaml::from_str(&content).map_err(|e| {
            InsightError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        debug!(path = %path.display(), threshold = config.threshold, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> InsightResult<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(InsightError::InvalidThreshold(self.threshold));
        }
        for (preset, columns) in [("sales", &self.sales), ("inventory", &self.inventory)] {
            if columns.category_column.is_empty() || columns.value_column.is_empty() {
                return Err(InsightError::Config(format!(
                    "Preset '{}' needs both category_column and value_column",
                    preset
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}
