//! Error types for image scanning.
//!
//! [`ScanError`] covers every failure the scanning core can produce. Only
//! the binary wraps it in `anyhow`; library code returns it directly.
//!
//! Failures are isolated per image: the orchestrator catches a `ScanError`,
//! still closes the container session and runs cleanup, then leaves the image
//! out of the report. Callers must treat an absent image as a failed scan.
//!
//! An unclassifiable distribution is not an error. It resolves to
//! [`ProviderKind::Unknown`](crate::model::ProviderKind::Unknown).

use crate::model::ProviderKind;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The process could not be spawned, or the container runtime itself failed.
    #[error("command execution error: {program}: {reason}")]
    CommandExecution { program: String, reason: String },

    /// A command did not finish within its time bound and was killed.
    #[error("command timed out: {program} after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    /// A listing line does not follow its provider's grammar.
    #[error("parse error: {provider}: '{line}': {reason}")]
    Parse {
        provider: ProviderKind,
        line: String,
        reason: String,
    },

    /// The image could not be started as a disposable container.
    #[error("session start error: {image}: {reason}")]
    SessionStart { image: String, reason: String },

    /// Image inspection failed or returned something that is not JSON.
    #[error("metadata fetch error: {image}: {reason}")]
    MetadataFetch { image: String, reason: String },

    /// Best-effort cleanup failed. Never fatal.
    #[error("cleanup error: {image}: {reason}")]
    Cleanup { image: String, reason: String },

    #[error("config error: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn parse(provider: ProviderKind, line: &str, reason: &str) -> Self {
        ScanError::Parse {
            provider,
            line: line.to_owned(),
            reason: reason.to_owned(),
        }
    }
}
