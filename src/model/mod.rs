//! Core data types for scanned images.
//!
//! - [`ProviderKind`] - The package ecosystem a listing belongs to
//! - [`PackageRecord`] - One discovered package
//! - [`OsRelease`] - Parsed os-release key/value pairs
//! - [`ImageReport`] - Everything collected for one image
//! - [`ScanReport`] - The inventory for a whole invocation
//!
//! # Example
//!
//! ```
//! use imagescan::model::{OsRelease, PackageRecord, ProviderKind};
//!
//! let release = OsRelease::parse("ID=alpine\nVERSION_ID=3.19.1\n");
//! assert_eq!(release.id(), Some("alpine"));
//!
//! let record = PackageRecord::new(ProviderKind::Alpine, "musl", "1.2.4-r2");
//! assert!(!record.is_sentinel());
//! ```

mod package;
mod release;
mod report;

pub use package::*;
pub use release::*;
pub use report::*;
