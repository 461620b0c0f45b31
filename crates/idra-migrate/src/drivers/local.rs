//! Filesystem object store: `{root}/{bucket}/{key}`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::core::ObjectStore;
use crate::error::{MigrateError, Result};

/// [`ObjectStore`] on a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        if key.split('/').any(|part| part == "..") {
            return Err(MigrateError::storage(
                "resolve",
                bucket,
                key,
                "key escapes the bucket directory",
            ));
        }
        Ok(self.bucket_dir(bucket).join(key))
    }
}

/// Object keys under `dir`, relative to `base`, with `/` separators.
async fn collect_keys(base: &Path, dir: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(base) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MigrateError::storage("put", bucket, key, e))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| MigrateError::storage("put", bucket, key, e))?;
        debug!("Local store: wrote {}", path.display());
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MigrateError::storage("head", bucket, key, e)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> Result<usize> {
        let base = self.bucket_dir(bucket);
        let mut keys = Vec::new();
        collect_keys(&base, &base, &mut keys)
            .await
            .map_err(|e| MigrateError::storage("list", bucket, prefix, e))?;
        Ok(keys.iter().filter(|k| k.starts_with(prefix)).take(limit).count())
    }

    fn store_type(&self) -> &'static str {
        "local"
    }
}
