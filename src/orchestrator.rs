//! Drives the scan of each image from container start to report entry.
//!
//! Per image: open a session, detect the OS, collect packages, close the
//! session, fetch metadata, clean up the image, then decide whether the
//! image belongs in the report. Images are scanned one at a time in the
//! order given. A system-wide prune runs once after the last image.
//!
//! An image whose container fails to start is treated as an unknown OS:
//! it gets the sentinel record and its metadata is still fetched.
//!
//! Errors never cross image boundaries. A failed image is logged and left
//! out of the report, so a caller must treat a missing image as a failure.

use crate::cleanup::CleanupManager;
use crate::error::ScanError;
use crate::metadata::MetadataFetcher;
use crate::model::{ImageReport, OsRelease, PackageRecord, ProviderKind, ScanReport};
use crate::probe::{classify, OsDetector, PackageManagerDispatcher};
use crate::runtime::{ContainerRuntime, ContainerSession};
use std::collections::HashSet;

/// Where one image's scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    OsDetected,
    PackagesCollected,
    MetadataCollected,
    CleanedUp,
    Reported,
    Skipped,
}

/// Result of scanning one image.
#[derive(Debug)]
pub enum ImageOutcome {
    Reported(ImageReport),
    /// Nothing could be learned about the image.
    Excluded(ImageReport),
    Failed(ScanError),
}

impl ImageOutcome {
    pub fn state(&self) -> ScanState {
        match self {
            ImageOutcome::Reported(_) => ScanState::Reported,
            ImageOutcome::Excluded(_) | ImageOutcome::Failed(_) => ScanState::Skipped,
        }
    }
}

/// Drops repeated image references, keeping the first occurrence of each.
pub fn unique_images(images: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    images
        .iter()
        .filter(|image| {
            let first = seen.insert(image.as_str());
            if !first {
                tracing::debug!(image = %image, "duplicate image reference, scanned once");
            }
            first
        })
        .cloned()
        .collect()
}

pub struct ScanOrchestrator<'r> {
    runtime: &'r ContainerRuntime,
    detector: OsDetector,
    dispatcher: PackageManagerDispatcher,
    cleanup: CleanupManager<'r>,
}

impl<'r> ScanOrchestrator<'r> {
    pub fn new(runtime: &'r ContainerRuntime) -> Self {
        Self {
            runtime,
            detector: OsDetector::default(),
            dispatcher: PackageManagerDispatcher::default(),
            cleanup: CleanupManager::new(runtime),
        }
    }

    pub fn with_detector(mut self, detector: OsDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: PackageManagerDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupManager<'r>) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Scans every image and returns the report of those that produced results.
    ///
    /// `on_image` is called after each image with its outcome.
    pub async fn scan_all<F>(&self, images: &[String], mut on_image: F) -> ScanReport
    where
        F: FnMut(&str, &ImageOutcome),
    {
        let mut report = ScanReport::new();
        let images = unique_images(images);

        for image in &images {
            let outcome = self.scan_image(image).await;
            on_image(image, &outcome);

            match outcome {
                ImageOutcome::Reported(entry) => report.push(entry),
                ImageOutcome::Excluded(_) => {
                    tracing::warn!(image = %image, "nothing could be learned about image, excluded from report");
                }
                ImageOutcome::Failed(e) => {
                    tracing::warn!(image = %image, error = %e, "image scan failed, excluded from report");
                }
            }
        }

        self.cleanup.cleanup_all().await;

        tracing::info!(
            scanned = images.len(),
            reported = report.images.len(),
            packages = report.total_packages(),
            "scan complete"
        );
        report
    }

    /// Scans one image. Cleanup for the image runs exactly once on every path.
    pub async fn scan_image(&self, image: &str) -> ImageOutcome {
        tracing::info!(image, state = ?ScanState::Idle, "scanning image");

        let collected = self.collect(image).await;
        self.cleanup.cleanup_image(image).await;
        tracing::debug!(image, state = ?ScanState::CleanedUp, "image cleaned up");

        match collected {
            Ok(entry) if entry.is_total_failure() => ImageOutcome::Excluded(entry),
            Ok(entry) => ImageOutcome::Reported(entry),
            Err(e) => ImageOutcome::Failed(e),
        }
    }

    async fn collect(&self, image: &str) -> Result<ImageReport, ScanError> {
        let (os_release, packages) = match ContainerSession::open(self.runtime, image).await {
            Ok(session) => {
                let probed = self.probe(&session).await;
                session.close().await;
                probed?
            }
            // Images without a shell or `sleep` cannot run; they read as an unknown OS.
            Err(ScanError::SessionStart { reason, .. }) => {
                tracing::warn!(image, %reason, "container did not start, os unknown");
                (
                    OsRelease::default(),
                    vec![PackageRecord::sentinel(ProviderKind::Unknown)],
                )
            }
            Err(e) => return Err(e),
        };

        let metadata = MetadataFetcher::new(self.runtime).fetch(image).await?;
        tracing::debug!(image, state = ?ScanState::MetadataCollected, "metadata collected");

        Ok(ImageReport {
            image: image.to_owned(),
            packages,
            metadata,
            os_release,
        })
    }

    async fn probe(
        &self,
        session: &ContainerSession<'_>,
    ) -> Result<(OsRelease, Vec<PackageRecord>), ScanError> {
        let os_release = self.detector.detect(session).await;
        let provider = classify(&os_release);
        tracing::debug!(image = session.image(), %provider, state = ?ScanState::OsDetected, "os detected");

        let packages = self.dispatcher.collect(session, provider).await?;
        tracing::debug!(
            image = session.image(),
            count = packages.len(),
            state = ?ScanState::PackagesCollected,
            "packages collected"
        );

        Ok((os_release, packages))
    }
}
