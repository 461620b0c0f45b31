//! Bounded-concurrency upload of local files to the object store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::{object_key, ObjectStore};
use crate::error::{MigrateError, Result};

/// Result of uploading one file.
#[derive(Debug)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub key: String,
    pub result: Result<()>,
}

/// Per-file results of a batch, in input order.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.key.clone())
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Keys of the batch, or an [`MigrateError::Upload`] if any file failed.
    pub fn into_result(self) -> Result<Vec<String>> {
        let total = self.outcomes.len();
        let failed = self.failed();
        if failed == 0 {
            return Ok(self.outcomes.into_iter().map(|o| o.key).collect());
        }

        let first = self
            .outcomes
            .into_iter()
            .find_map(|o| o.result.err().map(|e| format!("{}: {}", o.key, e)))
            .unwrap_or_default();
        Err(MigrateError::Upload {
            failed,
            total,
            first,
        })
    }
}

/// Uploads files into one bucket.
#[derive(Clone)]
pub struct ObjectUploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    workers: usize,
}

impl ObjectUploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, workers: usize) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            workers: workers.max(1),
        }
    }

    /// Write an in-memory object at `key`, overwriting.
    pub async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.store.put(&self.bucket, key, body).await?;
        debug!("Wrote {}/{}", self.bucket, key);
        Ok(())
    }

    /// Upload files concurrently, at most `workers` at a time.
    ///
    /// A failed file never cancels the others; every file gets an outcome.
    pub async fn upload_all(&self, prefix: &str, paths: &[PathBuf]) -> UploadReport {
        info!(
            "Uploading {} files to {}/{} with {} workers ({})",
            paths.len(),
            self.bucket,
            prefix,
            self.workers,
            self.store.store_type()
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(paths.len());

        for path in paths {
            let permit = semaphore.clone().acquire_owned().await;
            let store = self.store.clone();
            let bucket = self.bucket.clone();
            let prefix = prefix.to_string();
            let path = path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                upload_file(store.as_ref(), &bucket, &prefix, &path).await
            });
            handles.push(handle);
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        for (path, handle) in paths.iter().zip(handles) {
            let key = object_key(prefix, &file_name(path));
            let result = match handle.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(MigrateError::storage("put", &self.bucket, &key, e)),
            };
            if let Err(e) = &result {
                warn!("Upload of {} failed: {}", path.display(), e);
            }
            outcomes.push(UploadOutcome {
                path: path.clone(),
                key,
                result,
            });
        }

        let report = UploadReport { outcomes };
        info!(
            "Uploaded {} of {} files to {}/{}",
            paths.len() - report.failed(),
            paths.len(),
            self.bucket,
            prefix
        );
        report
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn upload_file(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    path: &Path,
) -> Result<String> {
    let key = object_key(prefix, &file_name(path));
    let body = tokio::fs::read(path).await?;
    store.put(bucket, &key, body).await?;
    debug!("Uploaded {} to {}/{}", path.display(), bucket, key);
    Ok(key)
}
