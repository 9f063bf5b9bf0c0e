use crate::model::ScanReport;
use anyhow::Result;

/// Renders the inventory document on one line, as collectors expect.
pub fn to_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}
