//! Line grammars for package listings.
//!
//! | Provider | Line shape | Name | Version |
//! |----------|------------|------|---------|
//! | alpine, centos, fedora | `musl-1.2.3-r0 x86_64 ...` | before the first `-` of the first token | rest of that token |
//! | debian, ubuntu | `bash\t5.1-2` | before the tab | after the tab |
//! | pip | `requests==2.31.0` | before `==` | after `==` |
//! | npm | `/usr/lib/node_modules/npm:npm@9.1.0:...` | before the first `:` | see [`NpmVersion`] |
//! | distroless | `Package: foo` then `Version: 1.0` | stitched across lines | stitched across lines |
//!
//! Blank lines are skipped for every provider.

use crate::error::ScanError;
use crate::model::{PackageRecord, ProviderKind};
use serde::{Deserialize, Serialize};

/// How the version of an npm record is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpmVersion {
    /// Version repeats the name portion, matching the historical report format.
    #[default]
    Literal,
    /// Version is taken from the field after the first `:`.
    Field,
}

/// Converts listing output into package records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageRecordParser {
    npm_version: NpmVersion,
}

impl PackageRecordParser {
    pub fn new(npm_version: NpmVersion) -> Self {
        Self { npm_version }
    }

    /// Parses `text` with the grammar for `provider`.
    ///
    /// Records come out in input order. `Unknown` has no grammar and yields
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Parse`] for the first line that breaks the grammar.
    pub fn parse(&self, provider: ProviderKind, text: &str) -> Result<Vec<PackageRecord>, ScanError> {
        let lines = text.lines().filter(|line| !line.trim().is_empty());

        match provider {
            ProviderKind::Alpine | ProviderKind::Centos | ProviderKind::Fedora => {
                Ok(lines.map(|line| parse_dashed(provider, line)).collect())
            }
            ProviderKind::Debian | ProviderKind::Ubuntu => {
                lines.map(|line| parse_tabbed(provider, line)).collect()
            }
            ProviderKind::Pip => lines.map(parse_frozen).collect(),
            ProviderKind::Npm => Ok(lines.map(|line| parse_npm(line, self.npm_version)).collect()),
            ProviderKind::Distroless => parse_stanzas(lines),
            ProviderKind::Unknown => Ok(Vec::new()),
        }
    }
}

/// Parses with the default options.
pub fn parse_packages(provider: ProviderKind, text: &str) -> Result<Vec<PackageRecord>, ScanError> {
    PackageRecordParser::default().parse(provider, text)
}

fn parse_dashed(provider: ProviderKind, line: &str) -> PackageRecord {
    let token = line.split_whitespace().next().unwrap_or_default();
    let (name, version) = token.split_once('-').unwrap_or((token, ""));
    PackageRecord::new(provider, name, version)
}

fn parse_tabbed(provider: ProviderKind, line: &str) -> Result<PackageRecord, ScanError> {
    let (name, version) = line
        .split_once('\t')
        .ok_or_else(|| ScanError::parse(provider, line, "missing tab separator"))?;
    Ok(PackageRecord::new(provider, name.trim(), version.trim()))
}

fn parse_frozen(line: &str) -> Result<PackageRecord, ScanError> {
    let (name, version) = line
        .split_once("==")
        .ok_or_else(|| ScanError::parse(ProviderKind::Pip, line, "missing '==' separator"))?;
    Ok(PackageRecord::new(ProviderKind::Pip, name.trim(), version.trim()))
}

fn parse_npm(line: &str, mode: NpmVersion) -> PackageRecord {
    let line = line.trim();
    let (name, rest) = match line.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (line, None),
    };

    let version = match mode {
        NpmVersion::Literal => Some(name.to_owned()),
        NpmVersion::Field => rest.map(|rest| {
            let field = rest.split(':').next().unwrap_or_default();
            match field.rsplit_once('@') {
                Some((pkg, version)) if !pkg.is_empty() => version.to_owned(),
                _ => field.to_owned(),
            }
        }),
    };

    PackageRecord {
        provider: ProviderKind::Npm,
        name: Some(name.to_owned()),
        version,
    }
}

/// Stitching state for dpkg status stanzas.
enum Stanza {
    AwaitingPackage,
    AwaitingVersion(String),
}

/// Pairs `Package:` lines with the next `Version:` line.
///
/// A `Package:` line replaces any pending name that never saw its version,
/// so an incomplete entry is dropped. A `Version:` line with nothing pending
/// is ignored, as are other keys.
fn parse_stanzas<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<PackageRecord>, ScanError> {
    let mut records = Vec::new();
    let mut state = Stanza::AwaitingPackage;

    for line in lines {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ScanError::parse(ProviderKind::Distroless, line, "missing ':' separator"))?;
        let value = value.trim();

        state = match (key.trim(), state) {
            ("Package", _) => Stanza::AwaitingVersion(value.to_owned()),
            ("Version", Stanza::AwaitingVersion(name)) => {
                records.push(PackageRecord::new(ProviderKind::Debian, name, value));
                Stanza::AwaitingPackage
            }
            (_, state) => state,
        };
    }

    Ok(records)
}
