//! Best-effort removal of what a scan leaves behind.
//!
//! Nothing here fails a scan: errors are logged and reported as
//! [`CleanupOutcome::Failed`].

use crate::error::ScanError;
use crate::runtime::ContainerRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// A running container still uses the image.
    InUse,
    Skipped,
    Failed,
}

pub struct CleanupManager<'r> {
    runtime: &'r ContainerRuntime,
    remove_images: bool,
    prune: bool,
}

impl<'r> CleanupManager<'r> {
    pub fn new(runtime: &'r ContainerRuntime) -> Self {
        Self {
            runtime,
            remove_images: true,
            prune: true,
        }
    }

    pub fn with_image_removal(mut self, enabled: bool) -> Self {
        self.remove_images = enabled;
        self
    }

    pub fn with_prune(mut self, enabled: bool) -> Self {
        self.prune = enabled;
        self
    }

    /// Force-removes `image` unless a running container descends from it.
    ///
    /// Call only after the image's own session is closed.
    pub async fn cleanup_image(&self, image: &str) -> CleanupOutcome {
        if !self.remove_images {
            return CleanupOutcome::Skipped;
        }

        match self.try_remove(image).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(image, error = %e, "image cleanup failed");
                CleanupOutcome::Failed
            }
        }
    }

    async fn try_remove(&self, image: &str) -> Result<CleanupOutcome, ScanError> {
        let running = self.runtime.running_descendants(image).await?;
        if !running.is_empty() {
            tracing::info!(image, containers = running.len(), "image still in use, not removing");
            return Ok(CleanupOutcome::InUse);
        }

        let output = self.runtime.remove_image(image).await?;
        if !output.success() {
            return Err(ScanError::Cleanup {
                image: image.to_owned(),
                reason: output.stderr_lossy().trim().to_owned(),
            });
        }

        tracing::debug!(image, "image removed");
        Ok(CleanupOutcome::Removed)
    }

    /// System-wide prune of stopped containers, networks, build cache and volumes.
    pub async fn cleanup_all(&self) -> CleanupOutcome {
        if !self.prune {
            return CleanupOutcome::Skipped;
        }

        match self.runtime.system_prune().await {
            Ok(output) if output.success() => {
                tracing::debug!("system prune complete");
                CleanupOutcome::Removed
            }
            Ok(output) => {
                tracing::warn!(stderr = %output.stderr_lossy().trim(), "system prune failed");
                CleanupOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "system prune failed");
                CleanupOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::{failed, ok, MockRunner};

    #[tokio::test]
    async fn test_cleanup_image_removes_unused_image() {
        let runner = MockRunner::new(|_| ok(""));
        let runtime = ContainerRuntime::new(runner.clone(), "docker");

        let outcome = CleanupManager::new(&runtime).cleanup_image("alpine:3.19").await;

        assert_eq!(outcome, CleanupOutcome::Removed);
        assert_eq!(
            runner.calls_starting_with(&["rmi"]),
            vec![vec!["rmi", "alpine:3.19", "--force"]]
        );
    }

    #[tokio::test]
    async fn test_cleanup_image_noop_when_in_use() {
        let runner = MockRunner::new(|args| match args[0].as_str() {
            "ps" => ok("abc123\n"),
            _ => ok(""),
        });
        let runtime = ContainerRuntime::new(runner.clone(), "docker");

        let outcome = CleanupManager::new(&runtime).cleanup_image("alpine:3.19").await;

        assert_eq!(outcome, CleanupOutcome::InUse);
        assert!(runner.calls_starting_with(&["rmi"]).is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_image_failure_is_not_fatal() {
        let runner = MockRunner::new(|args| match args[0].as_str() {
            "rmi" => failed("conflict: unable to remove repository reference"),
            _ => ok(""),
        });
        let runtime = ContainerRuntime::new(runner, "docker");

        let outcome = CleanupManager::new(&runtime).cleanup_image("alpine:3.19").await;
        assert_eq!(outcome, CleanupOutcome::Failed);
    }

    #[tokio::test]
    async fn test_cleanup_image_disabled() {
        let runner = MockRunner::new(|_| ok(""));
        let runtime = ContainerRuntime::new(runner.clone(), "docker");

        let outcome = CleanupManager::new(&runtime)
            .with_image_removal(false)
            .cleanup_image("alpine:3.19")
            .await;

        assert_eq!(outcome, CleanupOutcome::Skipped);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_all_prunes() {
        let runner = MockRunner::new(|_| ok("Total reclaimed space: 0B\n"));
        let runtime = ContainerRuntime::new(runner.clone(), "docker");

        assert_eq!(CleanupManager::new(&runtime).cleanup_all().await, CleanupOutcome::Removed);
        assert_eq!(runner.calls()[0], vec!["system", "prune", "-af", "--volumes"]);
    }

    #[tokio::test]
    async fn test_cleanup_all_disabled() {
        let runner = MockRunner::new(|_| ok(""));
        let runtime = ContainerRuntime::new(runner.clone(), "docker");

        let outcome = CleanupManager::new(&runtime).with_prune(false).cleanup_all().await;
        assert_eq!(outcome, CleanupOutcome::Skipped);
        assert!(runner.calls().is_empty());
    }
}
