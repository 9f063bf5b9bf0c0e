use crate::model::{ImageReport, ProviderKind, ScanReport};
use crate::probe::classify;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Packages")]
    packages: usize,
}

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
}

pub fn print_cli_table(report: &ScanReport) -> Result<()> {
    print!("{}", render_table(report));
    Ok(())
}

pub(crate) fn render_table(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Scan completed at: {}",
        report.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    if report.is_empty() {
        let _ = writeln!(out, "No images reported.");
        return out;
    }

    let rows: Vec<ImageRow> = report
        .images
        .iter()
        .map(|r| ImageRow {
            image: truncate(&r.image, 60),
            os: r
                .os_release
                .pretty_name()
                .or(r.os_release.id())
                .unwrap_or("-")
                .to_string(),
            provider: classify(&r.os_release).to_string(),
            packages: known_packages(r),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    let _ = writeln!(out, "{}", table);

    for image in &report.images {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", image.image);

        if known_packages(image) == 0 {
            let _ = writeln!(out, "  No package manager detected.");
            continue;
        }

        let rows: Vec<PackageRow> = image
            .packages
            .iter()
            .filter(|p| !p.is_sentinel())
            .map(|p| PackageRow {
                provider: p.provider.to_string(),
                name: truncate(p.name.as_deref().unwrap_or("-"), 50),
                version: format_version(p.version.as_deref()),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        let _ = writeln!(out, "{}", table);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Images reported: {}", report.images.len());
    let _ = writeln!(out, "  Total packages: {}", report.total_packages());

    let by_provider = count_by_provider(report);
    if by_provider.len() > 1 {
        let summary: Vec<String> = by_provider
            .iter()
            .map(|(provider, count)| format!("{} {}", count, provider))
            .collect();
        let _ = writeln!(out, "  By provider: {}", summary.join(", "));
    }

    out
}

fn known_packages(report: &ImageReport) -> usize {
    report.packages.iter().filter(|p| !p.is_sentinel()).count()
}

fn count_by_provider(report: &ScanReport) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for record in report.images.iter().flat_map(|r| &r.packages) {
        if record.provider != ProviderKind::Unknown && !record.is_sentinel() {
            *counts.entry(record.provider.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", kept)
    }
}

fn format_version(version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OsRelease, PackageRecord};
    use serde_json::json;

    fn sample() -> ScanReport {
        let mut report = ScanReport::new();
        report.push(ImageReport {
            image: "debian:12".to_string(),
            packages: vec![
                PackageRecord::new(ProviderKind::Debian, "bash", "5.2.15-2"),
                PackageRecord::new(ProviderKind::Pip, "requests", "2.31.0"),
            ],
            metadata: json!([{"Id": "sha256:abc"}]),
            os_release: OsRelease::parse("PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n"),
        });
        report.push(ImageReport {
            image: "static:1".to_string(),
            packages: vec![PackageRecord::sentinel(ProviderKind::Unknown)],
            metadata: json!([{"Id": "sha256:def"}]),
            os_release: OsRelease::default(),
        });
        report
    }

    #[test]
    fn test_render_table_lists_images_and_packages() {
        let text = render_table(&sample());

        assert!(text.contains("Debian GNU/Linux 12 (bookworm)"));
        assert!(text.contains("bash"));
        assert!(text.contains("requests"));
        assert!(text.contains("No package manager detected."));
        assert!(text.contains("By provider: 1 debian, 1 pip"));
    }

    #[test]
    fn test_render_table_empty_report() {
        assert!(render_table(&ScanReport::new()).contains("No images reported."));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(Some("1.0")), "1.0");
        assert_eq!(format_version(Some("")), "-");
        assert_eq!(format_version(None), "-");
    }
}
