//! Store implementations of the core traits.
//!
//! - [`mysql`]: online database ([`TargetConnector`](crate::core::TargetConnector))
//! - [`s3`]: Amazon S3 and S3-compatible object stores
//! - [`local`]: filesystem object store for local runs and tests

pub mod local;
pub mod mysql;
pub mod s3;

pub use local::LocalStore;
pub use mysql::{MysqlConnector, MysqlTarget};
pub use s3::S3Store;

use std::sync::Arc;

use crate::config::{ObjectStoreBackend, ObjectStoreConfig};
use crate::core::ObjectStore;
use crate::error::{MigrateError, Result};

/// Build the object store selected by the configuration.
pub async fn build_object_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        ObjectStoreBackend::S3 => Ok(Arc::new(S3Store::new(config).await)),
        ObjectStoreBackend::Local => {
            let root = config.root.as_ref().ok_or_else(|| {
                MigrateError::Config("object_store.root is required for the local backend".into())
            })?;
            Ok(Arc::new(LocalStore::new(root)))
        }
    }
}
