//! Report writer - analysis results → YAML or JSON files

use crate::error::{InsightError, InsightResult};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Serialized report format, chosen from the output extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Yaml,
    Json,
}

impl ReportFormat {
    /// `.yaml`/`.yml` → YAML, `.json` → JSON, anything else is `None`
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(ReportFormat::Yaml),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Render a report to a string
pub fn render_report<T: Serialize>(format: ReportFormat, report: &T) -> InsightResult<String> {
    Ok(match format {
        ReportFormat::Yaml => serde_yaml::to_string(report)?,
        ReportFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            json
        }
    })
}

/// Write a report, picking YAML or JSON from the file extension
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> InsightResult<()> {
    let format = ReportFormat::from_path(path).ok_or_else(|| {
        InsightError::Export(format!(
            "Unsupported report format: {}. Use .yaml, .yml or .json",
            path.display()
        ))
    })?;

    let content = render_report(format, report)?;
    fs::write(path, content)?;

    debug!(path = %path.display(), ?format, "Wrote report");
    Ok(())
}
