use crate::model::{OsRelease, ProviderKind, DISTROLESS_PRETTY_NAME};
use crate::runtime::ContainerSession;

/// Default location of the release descriptor inside an image.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Reads and classifies the base distribution of a running container.
#[derive(Debug, Clone)]
pub struct OsDetector {
    release_file: String,
}

impl OsDetector {
    pub fn new(release_file: impl Into<String>) -> Self {
        Self {
            release_file: release_file.into(),
        }
    }

    /// Reads the release file from the container.
    ///
    /// Never fails. If the file cannot be read the result is empty, which
    /// classifies as [`ProviderKind::Unknown`].
    pub async fn detect(&self, session: &ContainerSession<'_>) -> OsRelease {
        match session.exec(&["cat", &self.release_file]).await {
            Ok(output) => {
                if !output.success() {
                    tracing::debug!(
                        image = session.image(),
                        stderr = %output.stderr_lossy().trim(),
                        "release file not readable"
                    );
                }
                OsRelease::parse(&output.stdout_lossy())
            }
            Err(e) => {
                tracing::warn!(image = session.image(), error = %e, "os detection failed");
                OsRelease::default()
            }
        }
    }
}

impl Default for OsDetector {
    fn default() -> Self {
        Self::new(OS_RELEASE_PATH)
    }
}

/// Picks the provider for a parsed release file.
///
/// The distroless marker wins over `ID`; an unrecognised or missing `ID`
/// is `Unknown`.
pub fn classify(release: &OsRelease) -> ProviderKind {
    if release.pretty_name() == Some(DISTROLESS_PRETTY_NAME) {
        return ProviderKind::Distroless;
    }

    match release.id() {
        Some(id) => ProviderKind::from_os_id(id),
        None => ProviderKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::{failed, ok, MockRunner};
    use crate::runtime::ContainerRuntime;

    fn release(pairs: &[(&str, &str)]) -> OsRelease {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_distroless_marker() {
        let os = release(&[("PRETTY_NAME", "Distroless")]);
        assert_eq!(classify(&os), ProviderKind::Distroless);
    }

    #[test]
    fn test_classify_distroless_wins_over_id() {
        let os = release(&[("PRETTY_NAME", "Distroless"), ("ID", "debian")]);
        assert_eq!(classify(&os), ProviderKind::Distroless);
    }

    #[test]
    fn test_classify_by_id() {
        let os = release(&[("ID", "alpine"), ("VERSION_ID", "3.19.1")]);
        assert_eq!(classify(&os), ProviderKind::Alpine);
    }

    #[test]
    fn test_classify_empty_is_unknown() {
        assert_eq!(classify(&OsRelease::default()), ProviderKind::Unknown);
    }

    #[test]
    fn test_classify_unrecognised_id_is_unknown() {
        let os = release(&[("ID", "rocky")]);
        assert_eq!(classify(&os), ProviderKind::Unknown);
    }

    #[tokio::test]
    async fn test_detect_reads_release_file() {
        let runner = MockRunner::new(|args| match args[0].as_str() {
            "run" => ok("c1\n"),
            "exec" => ok("ID=ubuntu\nVERSION_ID=\"22.04\"\n"),
            _ => ok(""),
        });
        let runtime = ContainerRuntime::new(runner.clone(), "docker");
        let session = ContainerSession::open(&runtime, "ubuntu:22.04").await.unwrap();

        let os = OsDetector::default().detect(&session).await;
        session.close().await;

        assert_eq!(os.id(), Some("ubuntu"));
        assert_eq!(os.get("VERSION_ID"), Some("22.04"));
        assert_eq!(
            runner.calls_starting_with(&["exec"])[0],
            vec!["exec", "c1", "cat", "/etc/os-release"]
        );
    }

    #[tokio::test]
    async fn test_detect_missing_file_is_empty() {
        let runner = MockRunner::new(|args| match args[0].as_str() {
            "run" => ok("c1\n"),
            "exec" => failed("cat: /etc/os-release: No such file or directory"),
            _ => ok(""),
        });
        let runtime = ContainerRuntime::new(runner, "docker");
        let session = ContainerSession::open(&runtime, "scratch-app:1").await.unwrap();

        let os = OsDetector::default().detect(&session).await;
        session.close().await;

        assert!(os.is_empty());
        assert_eq!(classify(&os), ProviderKind::Unknown);
    }
}
