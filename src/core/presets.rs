//! Analysis facade and the sales/inventory presets
//!
//! The facade keeps only configuration. Tables are always passed in, so there is
//! no hidden "load before analyze" ordering.

use crate::config::{AnalysisConfig, PresetColumns};
use crate::core::aggregate::Aggregation;
use crate::core::pareto::{ParetoAnalyzer, ParetoResult, ParetoRow};
use crate::core::pivot::{self, PivotResult, PivotSpec};
use crate::error::InsightResult;
use crate::excel::ExcelExporter;
use crate::parser::{self, Source};
use crate::types::Table;
use serde::Serialize;
use std::path::Path;

/// Pareto result plus the headline numbers the presets report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoSummary {
    pub result: ParetoResult,
    pub total_categories: usize,
    /// Categories needed to reach the threshold
    pub vital_few_count: usize,
    /// `vital_few_count` as a percentage of all categories
    pub vital_few_share: f64,
    /// Rows whose cumulative share stays within the threshold
    pub top_categories: Vec<ParetoRow>,
}

impl From<ParetoResult> for ParetoSummary {
    fn from(result: ParetoResult) -> Self {
        Self {
            total_categories: result.len(),
            vital_few_count: result.categories_to_reach_threshold,
            vital_few_share: result.share_of_categories(),
            top_categories: result
                .rows_within(result.threshold * 100.0)
                .into_iter()
                .cloned()
                .collect(),
            result,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisFacade {
    config: AnalysisConfig,
}

impl AnalysisFacade {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Materialize and validate a source
    pub fn load(&self, source: Source) -> InsightResult<Table> {
        parser::load_source(source)
    }

    /// Pareto analysis with the configured threshold
    pub fn pareto(
        &self,
        table: &Table,
        category_column: &str,
        value_column: &str,
    ) -> InsightResult<ParetoResult> {
        ParetoAnalyzer::new(self.config.threshold)?.analyze(table, category_column, value_column)
    }

    pub fn pivot(&self, table: &Table, spec: &PivotSpec) -> InsightResult<PivotResult> {
        pivot::aggregate(table, spec)
    }

    /// Write a Pareto chart workbook; the result itself is untouched
    pub fn render_chart(&self, result: &ParetoResult, title: &str, path: &Path) -> InsightResult<()> {
        ExcelExporter::new().export_pareto(result, title, path)
    }

    /// Which products drive the configured share of sales
    pub fn analyze_sales_by_product(&self, table: &Table) -> InsightResult<ParetoSummary> {
        self.preset_pareto(table, &self.config.sales)
    }

    /// Which items drive the configured share of inventory turnover (the fast movers)
    pub fn analyze_inventory_turnover(&self, table: &Table) -> InsightResult<ParetoSummary> {
        self.preset_pareto(table, &self.config.inventory)
    }

    /// Sales pivot with margins labelled for reporting
    pub fn create_sales_pivot_analysis(
        &self,
        table: &Table,
        row_dimension: &str,
        column_dimension: Option<&str>,
        value_metric: &str,
        aggregation: Aggregation,
    ) -> InsightResult<PivotResult> {
        let spec = PivotSpec::new([row_dimension], value_metric)
            .columns(column_dimension)
            .aggregation(aggregation)
            .margins(true)
            .margins_name(self.config.sales_pivot_margins_name.as_str());
        pivot::aggregate(table, &spec)
    }

    fn preset_pareto(&self, table: &Table, columns: &PresetColumns) -> InsightResult<ParetoSummary> {
        self.pareto(table, &columns.category_column, &columns.value_column)
            .map(ParetoSummary::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, GroupKey, Value};

    fn sales_table() -> Table {
        let mut table = Table::new("sales");
        table.add_column(Column::new(
            "Product",
            vec!["A".into(), "B".into(), "A".into(), "C".into()],
        ));
        table.add_column(Column::new(
            "Region",
            vec!["North".into(), "South".into(), "South".into(), "North".into()],
        ));
        table.add_column(Column::new(
            "Sales",
            [60.0, 25.0, 10.0, 5.0].into_iter().map(Value::Number).collect(),
        ));
        table
    }

    #[test]
    fn test_sales_preset_summary() {
        let summary = AnalysisFacade::default()
            .analyze_sales_by_product(&sales_table())
            .unwrap();

        assert_eq!(summary.total_categories, 3);
        // A = 70 (70%), B = 25 (95%)
        assert_eq!(summary.vital_few_count, 2);
        assert!((summary.vital_few_share - 200.0 / 3.0).abs() < 1e-9);
        // Only A stays within 80%
        let top: Vec<String> = summary
            .top_categories
            .iter()
            .map(|r| r.category.to_string())
            .collect();
        assert_eq!(top, vec!["A"]);
    }

    #[test]
    fn test_configured_threshold_applies() {
        let facade = AnalysisFacade::new(AnalysisConfig::default().with_threshold(0.7));
        let summary = facade.analyze_sales_by_product(&sales_table()).unwrap();
        assert_eq!(summary.vital_few_count, 1);
    }

    #[test]
    fn test_sales_pivot_without_column_dimension() {
        let result = AnalysisFacade::default()
            .create_sales_pivot_analysis(&sales_table(), "Region", None, "Sales", Aggregation::Sum)
            .unwrap();

        assert_eq!(result.margins_name, "Grand Total");
        assert_eq!(
            result.get(&GroupKey::from(["North"]), &GroupKey::empty()),
            Some(65.0)
        );
        assert_eq!(result.grand_total(), Some(100.0));
    }
}
