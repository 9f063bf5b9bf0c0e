//! Probing a running container for its distribution and installed packages.
//!
//! Detection runs as a small pipeline:
//!
//! 1. [`OsDetector::detect`] reads the release file into an [`OsRelease`](crate::model::OsRelease)
//! 2. [`classify`] turns it into a [`ProviderKind`](crate::model::ProviderKind)
//! 3. [`PackageManagerDispatcher::collect`] runs the matching listing plus the
//!    pip and npm listings, parsing each with [`PackageRecordParser`]
//!
//! # Example
//!
//! ```
//! use imagescan::model::ProviderKind;
//! use imagescan::probe::parse_packages;
//!
//! let records = parse_packages(ProviderKind::Debian, "bash\t5.2.15-2\n").unwrap();
//! assert_eq!(records[0].name.as_deref(), Some("bash"));
//! ```

mod dispatch;
mod os;
mod parser;

pub use dispatch::{
    os_listing, parse_busybox_banner, Listing, PackageManagerDispatcher, AUXILIARY_LISTINGS,
    BUSYBOX_BANNER, NPM_LISTING, PIP_LISTING,
};
pub use os::{classify, OsDetector, OS_RELEASE_PATH};
pub use parser::{parse_packages, NpmVersion, PackageRecordParser};
