//! Capability traits for the stores the pipeline talks to.
//!
//! - [`ObjectStore`]: put/head/list against a bucketed object store
//! - [`TargetStore`]: typed writes and lookups against the online database
//! - [`TargetConnector`]: opens one [`TargetStore`] connection per run
//!
//! The orchestrator only sees these traits, so tests substitute in-memory
//! implementations for S3 and MySQL.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::Record;

/// Key of an object: `"{prefix}/{file_name}"`, tolerating a trailing slash on the prefix.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// Bucketed object storage.
///
/// Implementations must be `Send + Sync`; one instance is shared read-only by
/// all upload workers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` at `key`, overwriting any existing object.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;

    /// Check whether an object exists at `key`.
    async fn head(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Count objects under `prefix`, stopping at `limit`.
    async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> Result<usize>;

    /// Get the backend type name for logging/debugging.
    fn store_type(&self) -> &'static str;
}

/// One open connection to the online database.
///
/// Calls are strictly sequential; a store is never shared between runs.
#[async_trait]
pub trait TargetStore: Send {
    /// Insert a single record into its schema's table.
    async fn insert(&mut self, record: &Record) -> Result<()>;

    /// Insert all records into their table atomically: either every record is
    /// persisted or none is.
    async fn insert_many(&mut self, records: &[Record]) -> Result<()>;

    /// Most recent report id owned by `user_id`.
    async fn latest_report_id(&mut self, user_id: i64) -> Result<Option<i64>>;

    /// Generated detection ids of a report, ascending.
    async fn fod_ids(&mut self, report_id: i64) -> Result<Vec<i64>>;

    /// Round-trip a trivial query.
    async fn ping(&mut self) -> Result<()>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Factory for [`TargetStore`] connections.
#[async_trait]
pub trait TargetConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn TargetStore>>;

    /// Get the database type identifier (e.g., "mysql").
    fn db_type(&self) -> &'static str;
}
