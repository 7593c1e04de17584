//! Excel import/export module
//!
//! - Import: a worksheet (.xlsx) → Table
//! - Export: Pareto result → worksheet + combined bar/line chart,
//!   pivot result → grid worksheet with margins

mod exporter;
mod importer;

pub use exporter::ExcelExporter;
pub use importer::ExcelImporter;
