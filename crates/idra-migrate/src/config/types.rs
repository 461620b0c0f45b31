//! Configuration type definitions with auto-tuning based on system resources.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();

        Self {
            cpu_cores: sys.cpus().len().max(1),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Online database configuration (MySQL).
    pub target: TargetConfig,

    /// Object store configuration.
    pub object_store: ObjectStoreConfig,

    /// Local paths for exported data, snapshots and mapping artifacts.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that weren't explicitly set in the config file.
    pub fn with_auto_tuning(mut self) -> Self {
        let resources = SystemResources::detect();
        self.migration = self.migration.with_auto_tuning(&resources);
        self
    }
}

/// Online database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreBackend {
    /// Amazon S3 or an S3-compatible endpoint.
    #[default]
    S3,

    /// A directory tree on the local filesystem (one subdirectory per bucket).
    Local,
}

/// Object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Backend (default: s3).
    #[serde(default)]
    pub backend: ObjectStoreBackend,

    /// Default bucket; the CLI may override it per invocation.
    pub bucket: String,

    /// AWS region. Falls back to the environment when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Root directory for the local backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Local filesystem layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Exported images, one `run_{id}` directory per run.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Exported run and detection snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Persisted identity maps, one `run_{id}` directory per run.
    #[serde(default = "default_mappings_dir")]
    pub mappings_dir: PathBuf,

    /// Field mapping JSON file (source field -> target field).
    #[serde(default = "default_field_map")]
    pub field_map: PathBuf,

    /// Default values JSON file (field -> default).
    #[serde(default = "default_default_values")]
    pub default_values: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            snapshot_dir: default_snapshot_dir(),
            mappings_dir: default_mappings_dir(),
            field_map: default_field_map(),
            default_values: default_default_values(),
        }
    }
}

impl PathsConfig {
    /// Directory holding the identity maps of a run.
    pub fn run_mappings_dir(&self, run_id: i64) -> PathBuf {
        self.mappings_dir.join(format!("run_{}", run_id))
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Owning user of the created reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Parallel upload workers. Auto-tuned based on CPU cores if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_workers: Option<usize>,

    /// Object store prefix for images (default: "FOD Images").
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    /// Object store prefix for identity maps (default: "FOD-Images-Map").
    #[serde(default = "default_mapping_prefix")]
    pub mapping_prefix: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            upload_workers: None,
            image_prefix: default_image_prefix(),
            mapping_prefix: default_mapping_prefix(),
        }
    }
}

impl MigrationConfig {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that are None (not explicitly set).
    pub fn with_auto_tuning(mut self, resources: &SystemResources) -> Self {
        // Uploads are network bound; one worker per core, 2-16 range
        if self.upload_workers.is_none() {
            self.upload_workers = Some(resources.cpu_cores.clamp(2, 16));
        }

        info!(
            "Auto-tuned config: upload_workers={}",
            self.get_upload_workers()
        );

        self
    }

    pub fn get_upload_workers(&self) -> usize {
        self.upload_workers.unwrap_or(5)
    }

    /// Object store prefix for the identity maps of a run.
    pub fn run_mapping_prefix(&self, run_id: i64) -> String {
        format!(
            "{}/run_{}",
            self.mapping_prefix.trim_end_matches('/'),
            run_id
        )
    }
}

// Default value functions for serde
fn default_mysql_port() -> u16 {
    3306
}

fn default_require() -> String {
    "require".to_string()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("app/images")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("app/offline-db/snapshots")
}

fn default_mappings_dir() -> PathBuf {
    PathBuf::from("app/online-db/mappings")
}

fn default_field_map() -> PathBuf {
    PathBuf::from("app/offline-db/mappings/field-map.json")
}

fn default_default_values() -> PathBuf {
    PathBuf::from("app/offline-db/mappings/default-values.json")
}

fn default_image_prefix() -> String {
    "FOD Images".to_string()
}

fn default_mapping_prefix() -> String {
    "FOD-Images-Map".to_string()
}
