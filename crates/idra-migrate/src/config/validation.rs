//! Configuration validation.

use super::{Config, ObjectStoreBackend};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }

    // Object store validation
    if config.object_store.bucket.is_empty() {
        return Err(MigrateError::Config("object_store.bucket is required".into()));
    }
    if config.object_store.backend == ObjectStoreBackend::Local
        && config.object_store.root.is_none()
    {
        return Err(MigrateError::Config(
            "object_store.root is required for the local backend".into(),
        ));
    }

    // Migration config validation - only check if explicitly set
    if let Some(0) = config.migration.upload_workers {
        return Err(MigrateError::Config(
            "migration.upload_workers must be at least 1".into(),
        ));
    }
    if config.migration.image_prefix.trim_matches('/').is_empty() {
        return Err(MigrateError::Config(
            "migration.image_prefix must not be empty".into(),
        ));
    }
    if config.migration.mapping_prefix.trim_matches('/').is_empty() {
        return Err(MigrateError::Config(
            "migration.mapping_prefix must not be empty".into(),
        ));
    }

    Ok(())
}
