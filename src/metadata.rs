//! Image metadata from the runtime's `image inspect`.

use crate::error::ScanError;
use crate::runtime::ContainerRuntime;

/// Fetches inspect data for an image reference. No container is needed.
pub struct MetadataFetcher<'r> {
    runtime: &'r ContainerRuntime,
}

impl<'r> MetadataFetcher<'r> {
    pub fn new(runtime: &'r ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// Returns the inspect output as a generic JSON document.
    ///
    /// An unknown image makes the runtime print `[]`, which is returned as
    /// an empty array rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::MetadataFetch`] if the output is empty or not JSON.
    pub async fn fetch(&self, image: &str) -> Result<serde_json::Value, ScanError> {
        let output = self.runtime.inspect_image(image).await?;
        let stdout = output.stdout_lossy();

        if stdout.trim().is_empty() {
            return Err(ScanError::MetadataFetch {
                image: image.to_owned(),
                reason: format!("empty response: {}", output.stderr_lossy().trim()),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&stdout).map_err(|e| ScanError::MetadataFetch {
                image: image.to_owned(),
                reason: e.to_string(),
            })?;

        if !output.success() {
            tracing::debug!(image, stderr = %output.stderr_lossy().trim(), "image inspect exited with failure");
        }
        Ok(value)
    }
}
