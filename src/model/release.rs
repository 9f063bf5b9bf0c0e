use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker `PRETTY_NAME` used by distroless base images.
pub const DISTROLESS_PRETTY_NAME: &str = "Distroless";

/// Key/value pairs read from the image's os-release file.
///
/// No key is required. An empty map is a valid state and means the file
/// could not be read or contained nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsRelease(BTreeMap<String, String>);

impl OsRelease {
    /// Parses os-release text.
    ///
    /// Each non-empty line is split on its first `=`; whitespace and quote
    /// characters are trimmed from both sides. Lines without `=` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            entries.insert(unquote(key).to_owned(), unquote(value).to_owned());
        }

        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("ID")
    }

    pub fn pretty_name(&self) -> Option<&str> {
        self.get("PRETTY_NAME")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for OsRelease {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}
