//! S3-backed object store.

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;

/// Object store backed by an S3 bucket with static credentials.
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Store {
    /// Build a client from static credentials in the storage config.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "lumen-static",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();
        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        }
    }

    fn store_error(operation: &'static str, key: &str, err: impl std::fmt::Display) -> StoreError {
        StoreError {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Self::store_error("put", key, DisplayErrorContext(&e)))?;
        tracing::debug!(key, bucket = %self.bucket, "Stored object");
        Ok(())
    }

    async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source_key))
            .key(dest_key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Self::store_error("copy", source_key, DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::store_error("delete", key, DisplayErrorContext(&e)))?;
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|err| err.is_not_found()) {
                    return Ok(false);
                }
                Err(Self::store_error("head", key, DisplayErrorContext(&e)))
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> S3Store {
        S3Store::new(&StorageConfig {
            bucket: "gallery".to_string(),
            region: "eu-central-1".to_string(),
            access_key_id: "AKIATEST".to_string(),
            secret_access_key: "secret".to_string(),
            rename_poll_attempts: 6,
            rename_poll_interval_ms: 5000,
        })
    }

    #[test]
    fn test_public_url_shape() {
        assert_eq!(
            store().public_url("album/cat.jpg"),
            "https://gallery.s3.eu-central-1.amazonaws.com/album/cat.jpg"
        );
    }
}
