use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{OsRelease, PackageRecord};

/// Everything collected for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub image: String,
    /// Discovery order: OS packages, then pip, then npm.
    pub packages: Vec<PackageRecord>,
    pub metadata: serde_json::Value,
    pub os_release: OsRelease,
}

#[derive(Serialize)]
struct ImageEntry<'a> {
    pkg_list: &'a [PackageRecord],
    inspect_data: &'a serde_json::Value,
    os_hash: &'a OsRelease,
}

impl ImageReport {
    /// True when nothing at all could be learned about the image.
    ///
    /// The os-release map is empty, the first record has no version and the
    /// inspect data is an empty collection. This is distinct from an image
    /// with an unknown OS, which still reports its sentinel record.
    pub fn is_total_failure(&self) -> bool {
        let no_version = self
            .packages
            .first()
            .map_or(true, |record| record.version.is_none());

        self.os_release.is_empty() && no_version && is_empty_blob(&self.metadata)
    }

    fn entry(&self) -> ImageEntry<'_> {
        ImageEntry {
            pkg_list: &self.packages,
            inspect_data: &self.metadata,
            os_hash: &self.os_release,
        }
    }
}

fn is_empty_blob(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Inventory for one invocation, keyed by image in scan order.
///
/// Serializes to `{ <image>: { pkg_list, inspect_data, os_hash }, ... }`.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub scan_time: DateTime<Utc>,
    pub images: Vec<ImageReport>,
}

impl ScanReport {
    pub fn new() -> Self {
        Self {
            scan_time: Utc::now(),
            images: Vec::new(),
        }
    }

    pub fn push(&mut self, report: ImageReport) {
        self.images.push(report);
    }

    pub fn get(&self, image: &str) -> Option<&ImageReport> {
        self.images.iter().find(|r| r.image == image)
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn total_packages(&self) -> usize {
        self.images.iter().map(|r| r.packages.len()).sum()
    }
}

impl Default for ScanReport {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ScanReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.images.len()))?;
        for report in &self.images {
            map.serialize_entry(&report.image, &report.entry())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderKind;
    use serde_json::json;

    fn report(image: &str, packages: Vec<PackageRecord>, metadata: serde_json::Value, os: OsRelease) -> ImageReport {
        ImageReport {
            image: image.to_string(),
            packages,
            metadata,
            os_release: os,
        }
    }

    #[test]
    fn test_total_failure_detected() {
        let r = report(
            "missing:latest",
            vec![PackageRecord::sentinel(ProviderKind::Unknown)],
            json!([]),
            OsRelease::default(),
        );
        assert!(r.is_total_failure());
    }

    #[test]
    fn test_unknown_os_with_metadata_is_not_total_failure() {
        let r = report(
            "scratch-app:1",
            vec![PackageRecord::sentinel(ProviderKind::Unknown)],
            json!([{"Id": "sha256:abc"}]),
            OsRelease::default(),
        );
        assert!(!r.is_total_failure());
    }

    #[test]
    fn test_os_release_present_is_not_total_failure() {
        let os = OsRelease::parse("ID=arch\n");
        let r = report("arch:latest", vec![PackageRecord::sentinel(ProviderKind::Unknown)], json!([]), os);
        assert!(!r.is_total_failure());
    }

    #[test]
    fn test_report_serializes_in_scan_order() {
        let mut scan = ScanReport::new();
        scan.push(report(
            "zeta:1",
            vec![PackageRecord::new(ProviderKind::Alpine, "musl", "1.2.3-r0")],
            json!([{"Id": "sha256:1"}]),
            OsRelease::parse("ID=alpine\n"),
        ));
        scan.push(report(
            "alpha:1",
            vec![PackageRecord::sentinel(ProviderKind::Unknown)],
            json!([{"Id": "sha256:2"}]),
            OsRelease::default(),
        ));

        let text = serde_json::to_string(&scan).unwrap();
        assert!(text.find("zeta:1").unwrap() < text.find("alpha:1").unwrap());

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["zeta:1"]["pkg_list"][0]["package"], "musl");
        assert_eq!(value["zeta:1"]["os_hash"]["ID"], "alpine");
        assert_eq!(value["alpha:1"]["inspect_data"][0]["Id"], "sha256:2");
        assert_eq!(value["alpha:1"]["os_hash"], json!({}));
    }

    #[test]
    fn test_total_packages() {
        let mut scan = ScanReport::new();
        scan.push(report(
            "a",
            vec![
                PackageRecord::new(ProviderKind::Debian, "bash", "5.1-2"),
                PackageRecord::new(ProviderKind::Pip, "requests", "2.31.0"),
            ],
            json!([]),
            OsRelease::default(),
        ));
        assert_eq!(scan.total_packages(), 2);
        assert!(scan.get("a").is_some());
        assert!(scan.get("b").is_none());
    }
}
