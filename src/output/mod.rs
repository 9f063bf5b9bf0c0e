mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::to_json;

use crate::model::ScanReport;
use anyhow::Result;

/// Output format for scan reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Inventory JSON for collectors
    Json,
    /// Human-readable tables
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => Err(format!("Unknown format: {}. Use 'json' or 'table'", s)),
        }
    }
}

/// Prints the report. An empty report prints nothing in JSON format.
pub fn print_result(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            if let Some(json) = render_result(report, format)? {
                println!("{}", json);
            }
            Ok(())
        }
        OutputFormat::Table => print_cli_table(report),
    }
}

/// Renders the report for output, or `None` when there is no document to emit.
///
/// A JSON report with no image is not emitted; tables always render.
pub fn render_result(report: &ScanReport, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Json if report.is_empty() => Ok(None),
        _ => format_result_to_string(report, format).map(Some),
    }
}

/// Formats the report, including an empty one.
pub fn format_result_to_string(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Table => Ok(cli::render_table(report)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageReport, OsRelease, PackageRecord, ProviderKind};
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("TABLE").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("sarif").is_err());
    }

    #[test]
    fn test_empty_report_emits_no_json_document() {
        assert!(render_result(&ScanReport::new(), OutputFormat::Json).unwrap().is_none());
    }

    #[test]
    fn test_empty_report_still_renders_table() {
        let text = render_result(&ScanReport::new(), OutputFormat::Table).unwrap().unwrap();
        assert!(text.contains("No images reported."));
    }

    #[test]
    fn test_reported_image_emits_json_document() {
        let mut report = ScanReport::new();
        report.push(ImageReport {
            image: "alpine:3.19".to_string(),
            packages: vec![PackageRecord::new(ProviderKind::Alpine, "musl", "1.2.4-r2")],
            metadata: serde_json::json!([{"Id": "sha256:abc"}]),
            os_release: OsRelease::parse("ID=alpine\n"),
        });

        let text = render_result(&report, OutputFormat::Json).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["alpine:3.19"]["pkg_list"][0]["package"], "musl");
    }
}
