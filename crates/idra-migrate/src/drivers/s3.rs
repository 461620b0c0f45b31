//! Amazon S3 object store.

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::config::ObjectStoreConfig;
use crate::core::ObjectStore;
use crate::error::{MigrateError, Result};

/// [`ObjectStore`] over the AWS SDK. Credentials come from the default
/// provider chain.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub async fn new(config: &ObjectStoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            "Using S3 object store (region: {}, endpoint: {})",
            config.region.as_deref().unwrap_or("default"),
            config.endpoint.as_deref().unwrap_or("default")
        );
        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| MigrateError::storage("put", bucket, key, DisplayErrorContext(&e)))?;
        debug!("S3: put s3://{}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    return Ok(false);
                }
                Err(MigrateError::storage("head", bucket, key, DisplayErrorContext(&e)))
            }
        }
    }

    async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> Result<usize> {
        let max_keys = i32::try_from(limit).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| MigrateError::storage("list", bucket, prefix, DisplayErrorContext(&e)))?;

        let count = output.key_count().unwrap_or(0).max(0) as usize;
        Ok(count.min(limit))
    }

    fn store_type(&self) -> &'static str {
        "s3"
    }
}
