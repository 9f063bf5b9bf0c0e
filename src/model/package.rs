use serde::{Deserialize, Serialize};

/// Package-management ecosystem a listing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Alpine,
    Centos,
    Debian,
    Distroless,
    Fedora,
    Pip,
    Npm,
    Ubuntu,
    Unknown,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 9] = [
        ProviderKind::Alpine,
        ProviderKind::Centos,
        ProviderKind::Debian,
        ProviderKind::Distroless,
        ProviderKind::Fedora,
        ProviderKind::Pip,
        ProviderKind::Npm,
        ProviderKind::Ubuntu,
        ProviderKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Alpine => "alpine",
            ProviderKind::Centos => "centos",
            ProviderKind::Debian => "debian",
            ProviderKind::Distroless => "distroless",
            ProviderKind::Fedora => "fedora",
            ProviderKind::Pip => "pip",
            ProviderKind::Npm => "npm",
            ProviderKind::Ubuntu => "ubuntu",
            ProviderKind::Unknown => "unknown",
        }
    }

    /// Maps an os-release `ID` to a distribution provider.
    ///
    /// Only the distributions with a known package listing are recognised.
    /// Anything else, including the language ecosystems, is `Unknown`.
    pub fn from_os_id(id: &str) -> Self {
        match id {
            "alpine" => ProviderKind::Alpine,
            "centos" => ProviderKind::Centos,
            "debian" => ProviderKind::Debian,
            "fedora" => ProviderKind::Fedora,
            "ubuntu" => ProviderKind::Ubuntu,
            _ => ProviderKind::Unknown,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One installed package, as reported by a listing inside the container.
///
/// A record with neither name nor version is the sentinel for "no package
/// manager could be determined". When present it is the only record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub provider: ProviderKind,
    #[serde(rename = "package")]
    pub name: Option<String>,
    pub version: Option<String>,
}

impl PackageRecord {
    pub fn new(provider: ProviderKind, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            provider,
            name: Some(name.into()),
            version: Some(version.into()),
        }
    }

    pub fn sentinel(provider: ProviderKind) -> Self {
        Self {
            provider,
            name: None,
            version: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.name.is_none() && self.version.is_none()
    }
}
