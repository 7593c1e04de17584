//! Core analytics: Pareto ranking and pivot aggregation

pub mod aggregate;
pub mod pareto;
pub mod pivot;
pub mod presets;

pub use aggregate::{Accumulator, Aggregation};
pub use pareto::{ParetoAnalyzer, ParetoResult, ParetoRow};
pub use pivot::{aggregate, aggregate_measures, PivotResult, PivotSpec};
pub use presets::{AnalysisFacade, ParetoSummary};
