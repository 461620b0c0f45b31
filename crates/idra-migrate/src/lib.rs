//! # idra-migrate
//!
//! Offline-to-online migration of IDRA inspection runs.
//!
//! A run exported from the offline SQLite store (one run row, its detection
//! rows, and their images) is moved into an object store bucket and the online
//! MySQL database:
//!
//! - **Image upload** with a bounded worker pool, skipped when already present
//! - **Record transformation** through a field mapping and default values
//! - **Dependent writes**: the report first, then its detections in one transaction
//! - **Identity maps** from offline ids to generated online ids, uploaded with
//!   a completion marker so a run is never ingested twice
//!
//! ## Example
//!
//! ```rust,no_run
//! use idra_migrate::{Config, Orchestrator, RunRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let request = RunRequest::resolve(7, None, Some(333), &config)?;
//!     let orchestrator = Orchestrator::from_config(config).await?;
//!     let result = orchestrator.migrate(&request).await?;
//!     println!("Run {} is {:?}", result.run_id, result.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod source;
pub mod state;
pub mod transform;
pub mod upload;
pub mod writer;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, ObjectStoreConfig, PathsConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    preview, BlobPhase, HealthReport, MigrationResult, Orchestrator, RunPhase, RunRequest,
    RunStatus, SkipReason,
};
pub use source::{ExportSummary, OfflineDb};
