//! CLI command handlers

pub mod commands;

pub use commands::{inventory, pareto, pivot, sales, sales_pivot};
