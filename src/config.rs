//! Configuration file handling.
//!
//! This module provides loading and saving of imagescan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/imagescan/config.toml`
//! - macOS: `~/Library/Application Support/imagescan/config.toml`
//! - Windows: `%APPDATA%\imagescan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! runtime = "docker"
//! release_file = "/etc/os-release"
//! keep_alive_secs = 30
//! exec_timeout_secs = 120
//! start_timeout_secs = 600
//! default_format = "json"
//! remove_images = true
//! prune_after_scan = true
//! npm_version = "literal"
//!
//! [ignore]
//! images = ["registry.internal/*", "*:debug"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ScanError;
use crate::probe::{NpmVersion, OS_RELEASE_PATH};
use crate::runtime::DEFAULT_KEEP_ALIVE_SECS;

/// Application configuration.
///
/// Loaded from a TOML file, with defaults for every missing field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Container runtime CLI binary.
    ///
    /// Default: "docker"
    pub runtime: String,

    /// Release descriptor read inside each container.
    ///
    /// Default: "/etc/os-release"
    pub release_file: String,

    /// How long a disposable container sleeps before exiting on its own.
    ///
    /// Default: 30 seconds
    pub keep_alive_secs: u64,

    /// Upper bound for each command run inside a container.
    ///
    /// Default: 120 seconds
    pub exec_timeout_secs: u64,

    /// Upper bound for starting a container, including any image pull.
    ///
    /// Default: 600 seconds
    pub start_timeout_secs: u64,

    /// Output format when no `--format` flag is provided.
    ///
    /// Valid values: "json", "table"
    /// Default: "json"
    pub default_format: String,

    /// Whether to remove each image after it has been scanned.
    ///
    /// Default: true
    pub remove_images: bool,

    /// Whether to run a system-wide prune once all images are scanned.
    ///
    /// Default: true
    pub prune_after_scan: bool,

    /// How npm record versions are derived.
    ///
    /// Default: "literal"
    pub npm_version: NpmVersion,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Images that are never scanned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Image references to skip. Supports `*` wildcards (e.g. "registry.internal/*").
    pub images: Vec<String>,
}

impl IgnoreConfig {
    pub fn should_ignore_image(&self, image: &str) -> bool {
        self.images.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, image)
            } else {
                pattern == image
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            release_file: OS_RELEASE_PATH.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            exec_timeout_secs: 120,
            start_timeout_secs: 600,
            default_format: "json".to_string(),
            remove_images: true,
            prune_after_scan: true,
            npm_version: NpmVersion::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read, parsed
    /// or validated.
    pub fn load() -> Result<Self, ScanError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ScanError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ScanError::Config {
            field: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to `path`, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ScanError> {
        let io_err = |source: std::io::Error| ScanError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        fs::write(path, self.render()).map_err(io_err)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ScanError> {
        self.save_to(&Self::config_path())
    }

    /// Rejects values that would make every scan fail.
    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |field: &str, reason: &str| ScanError::Config {
            field: field.to_owned(),
            reason: reason.to_owned(),
        };

        if self.runtime.trim().is_empty() {
            return Err(invalid("runtime", "must not be empty"));
        }
        if self.keep_alive_secs == 0 {
            return Err(invalid("keep_alive_secs", "must be greater than 0"));
        }
        if self.exec_timeout_secs == 0 {
            return Err(invalid("exec_timeout_secs", "must be greater than 0"));
        }
        if self.start_timeout_secs == 0 {
            return Err(invalid("start_timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imagescan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        Config::default().render()
    }

    fn render(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("alpine:3.19", "alpine:3.19"));
        assert!(!glob_match("alpine:3.19", "alpine:3.18"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("registry.internal/*", "registry.internal/app:1"));
        assert!(!glob_match("registry.internal/*", "docker.io/library/app:1"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*:debug", "gcr.io/distroless/base:debug"));
        assert!(!glob_match("*:debug", "gcr.io/distroless/base:latest"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*distroless*", "gcr.io/distroless/static:nonroot"));
        assert!(!glob_match("*distroless*", "debian:12"));
    }

    #[test]
    fn test_ignore_config_images() {
        let config = IgnoreConfig {
            images: vec!["busybox:latest".to_string(), "internal/*".to_string()],
        };

        assert!(config.should_ignore_image("busybox:latest"));
        assert!(config.should_ignore_image("internal/api:2"));
        assert!(!config.should_ignore_image("busybox:1.36"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.runtime, "docker");
        assert_eq!(config.release_file, "/etc/os-release");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.default_format, "json");
        assert!(config.remove_images);
        assert!(config.prune_after_scan);
        assert_eq!(config.npm_version, NpmVersion::Literal);
        assert!(config.ignore.images.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.exec_timeout_secs, 120);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "runtime = \"podman\"\nexec_timeout_secs = 15\nnpm_version = \"field\"\n\n[ignore]\nimages = [\"scratch\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.runtime, "podman");
        assert_eq!(config.exec_timeout(), Duration::from_secs(15));
        assert_eq!(config.npm_version, NpmVersion::Field);
        assert!(config.ignore.should_ignore_image("scratch"));
        assert!(config.prune_after_scan);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "exec_timeout_secs = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("exec_timeout_secs"));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "runtime = [\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ScanError::Config { .. })));
    }

    #[test]
    fn test_save_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.keep_alive_secs = 90;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap().keep_alive_secs, 90);
    }
}
