//! Provider to listing-command dispatch.
//!
//! | Provider | Command |
//! |----------|---------|
//! | alpine | `apk list --installed --quiet` |
//! | centos, fedora | `rpm -qa` |
//! | debian, ubuntu | `dpkg-query -W -f '${Package}\t${Version}\n'` |
//! | distroless | dpkg status fragments filtered to `Package`/`Version`, plus the BusyBox banner |
//! | unknown | none, yields the sentinel record |
//!
//! The pip and npm listings run for every image with a known provider.
//! They may fail or print nothing without affecting the scan.

use super::parser::PackageRecordParser;
use crate::error::ScanError;
use crate::model::{PackageRecord, ProviderKind};
use crate::runtime::ContainerSession;

/// A command run inside the container, and the grammar for its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub provider: ProviderKind,
    pub argv: &'static [&'static str],
}

const APK: &[&str] = &["apk", "list", "--installed", "--quiet"];
const RPM: &[&str] = &["rpm", "-qa"];
const DPKG: &[&str] = &["dpkg-query", "-W", "-f", "${Package}\\t${Version}\\n"];
const DPKG_STATUS_D: &[&str] = &[
    "sh",
    "-c",
    "cat /var/lib/dpkg/status.d/* | grep -E '^(Package|Version):'",
];

/// Prints `BusyBox v1.36.1` on images that embed BusyBox.
pub const BUSYBOX_BANNER: &[&str] = &["sh", "-c", "busybox | grep 'BusyBox v' | awk '{print $1,$2}'"];

pub const PIP_LISTING: Listing = Listing {
    provider: ProviderKind::Pip,
    argv: &["sh", "-c", "python3 -m pip list --format freeze || true"],
};

pub const NPM_LISTING: Listing = Listing {
    provider: ProviderKind::Npm,
    argv: &["sh", "-c", "npm ls -p -l || true"],
};

/// Auxiliary listings in the order their records are reported.
pub const AUXILIARY_LISTINGS: [Listing; 2] = [PIP_LISTING, NPM_LISTING];

/// Returns the OS package listing for `provider`, if it has one.
///
/// The language ecosystems are not operating systems and have none.
pub fn os_listing(provider: ProviderKind) -> Option<Listing> {
    let argv = match provider {
        ProviderKind::Alpine => APK,
        ProviderKind::Centos | ProviderKind::Fedora => RPM,
        ProviderKind::Debian | ProviderKind::Ubuntu => DPKG,
        ProviderKind::Distroless => DPKG_STATUS_D,
        ProviderKind::Pip | ProviderKind::Npm | ProviderKind::Unknown => return None,
    };
    Some(Listing { provider, argv })
}

/// Runs the listings for a classified image and collects its records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageManagerDispatcher {
    parser: PackageRecordParser,
}

impl PackageManagerDispatcher {
    pub fn new(parser: PackageRecordParser) -> Self {
        Self { parser }
    }

    /// Collects OS packages, then pip, then npm.
    ///
    /// An image without an OS listing yields exactly one sentinel record and
    /// no command is run.
    ///
    /// # Errors
    ///
    /// Fails if the OS listing cannot be executed or its output does not
    /// parse. Auxiliary listing failures are logged and skipped.
    pub async fn collect(
        &self,
        session: &ContainerSession<'_>,
        provider: ProviderKind,
    ) -> Result<Vec<PackageRecord>, ScanError> {
        let Some(listing) = os_listing(provider) else {
            tracing::info!(image = session.image(), %provider, "no package manager for image");
            return Ok(vec![PackageRecord::sentinel(provider)]);
        };

        let mut records = Vec::new();

        if provider == ProviderKind::Distroless {
            records.extend(self.busybox(session).await);
        }

        let output = session.exec(listing.argv).await?;
        if !output.success() {
            tracing::warn!(
                image = session.image(),
                %provider,
                stderr = %output.stderr_lossy().trim(),
                "package listing exited with failure"
            );
        }
        let os_records = self.parser.parse(provider, &output.stdout_lossy())?;
        tracing::debug!(image = session.image(), %provider, count = os_records.len(), "os packages");
        records.extend(os_records);

        for aux in AUXILIARY_LISTINGS {
            records.extend(self.auxiliary(session, aux).await);
        }

        Ok(records)
    }

    async fn auxiliary(&self, session: &ContainerSession<'_>, listing: Listing) -> Vec<PackageRecord> {
        let output = match session.exec(listing.argv).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(image = session.image(), provider = %listing.provider, error = %e, "auxiliary listing failed");
                return Vec::new();
            }
        };

        if output.stdout.is_empty() {
            return Vec::new();
        }

        match self.parser.parse(listing.provider, &output.stdout_lossy()) {
            Ok(records) => {
                tracing::debug!(image = session.image(), provider = %listing.provider, count = records.len(), "auxiliary packages");
                records
            }
            Err(e) => {
                tracing::warn!(image = session.image(), provider = %listing.provider, error = %e, "skipping unparseable auxiliary listing");
                Vec::new()
            }
        }
    }

    async fn busybox(&self, session: &ContainerSession<'_>) -> Option<PackageRecord> {
        match session.exec(BUSYBOX_BANNER).await {
            Ok(output) => parse_busybox_banner(&output.stdout_lossy()),
            Err(e) => {
                tracing::debug!(image = session.image(), error = %e, "busybox banner unavailable");
                None
            }
        }
    }
}

/// Reads `BusyBox v1.36.1` into a distroless record.
pub fn parse_busybox_banner(text: &str) -> Option<PackageRecord> {
    let mut fields = text.split_whitespace();
    let name = fields.next()?;
    let version = fields.next()?;
    Some(PackageRecord::new(ProviderKind::Distroless, name, version))
}
