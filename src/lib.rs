pub mod cleanup;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod probe;
pub mod runtime;

pub use cleanup::CleanupManager;
pub use config::Config;
pub use error::ScanError;
pub use metadata::MetadataFetcher;
pub use model::{ImageReport, OsRelease, PackageRecord, ProviderKind, ScanReport};
pub use orchestrator::{ImageOutcome, ScanOrchestrator, ScanState};
pub use runtime::{CommandRunner, ContainerRuntime, ContainerSession, ProcessRunner};
