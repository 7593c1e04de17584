//! Insight - Pareto and pivot analysis over tabular business data
//!
//! This library loads tables from CSV, YAML or Excel, ranks categories by their
//! contribution to a total (80/20 analysis), and summarizes measures across
//! dimensions with optional margins.
//!
//! # Features
//!
//! - Pareto ranking with a configurable cumulative threshold
//! - Multi-dimension pivots with sum, mean, count, min and max
//! - Margins computed from the underlying records
//! - Excel charts and pivot grids, YAML/JSON reports
//!
//! # Example
//!
//! ```no_run
//! use royalbit_insight::core::AnalysisFacade;
//! use royalbit_insight::parser::Source;
//! use std::path::PathBuf;
//!
//! let facade = AnalysisFacade::default();
//! let table = facade.load(Source::Path(PathBuf::from("sales.csv")))?;
//! let summary = facade.analyze_sales_by_product(&table)?;
//!
//! println!(
//!     "{} of {} products drive 80% of sales",
//!     summary.vital_few_count, summary.total_categories
//! );
//! # Ok::<(), royalbit_insight::error::InsightError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use error::{InsightError, InsightResult};
pub use types::{Column, GroupKey, KeyPart, Record, Table, Value};
