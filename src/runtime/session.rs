use super::{CommandOutput, ContainerRuntime};
use crate::error::ScanError;

/// One disposable container, owned for the duration of one image's scan.
///
/// The container runs a bounded sleep so it exits on its own even if the
/// session is never closed. [`close`](Self::close) consumes the session and
/// must be called on every path once [`open`](Self::open) has succeeded.
pub struct ContainerSession<'r> {
    runtime: &'r ContainerRuntime,
    image: String,
    id: String,
    closed: bool,
}

impl<'r> ContainerSession<'r> {
    /// Starts a detached container from `image`.
    pub async fn open(runtime: &'r ContainerRuntime, image: &str) -> Result<Self, ScanError> {
        let id = runtime.run_detached(image).await?;
        tracing::debug!(image, container = %id, "container session opened");

        Ok(Self {
            runtime,
            image: image.to_owned(),
            id,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Runs `argv` inside the container and waits for it to finish.
    pub async fn exec(&self, argv: &[&str]) -> Result<CommandOutput, ScanError> {
        tracing::debug!(container = %self.id, ?argv, "exec");
        self.runtime.exec(&self.id, argv).await
    }

    /// Kills the container.
    ///
    /// Never fails: a container that already exited is fine, and any other
    /// runtime error is logged.
    pub async fn close(mut self) {
        self.closed = true;

        match self.runtime.kill(&self.id).await {
            Ok(output) if output.success() => {
                tracing::debug!(image = %self.image, container = %self.id, "container session closed");
            }
            Ok(output) => {
                // Exited on its own (keep-alive elapsed) or already removed.
                tracing::debug!(
                    container = %self.id,
                    stderr = %output.stderr_lossy().trim(),
                    "kill reported failure"
                );
            }
            Err(e) => {
                tracing::warn!(container = %self.id, error = %e, "failed to kill container");
            }
        }
    }
}

impl Drop for ContainerSession<'_> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                image = %self.image,
                container = %self.id,
                "container session dropped without close; relying on keep-alive"
            );
        }
    }
}
