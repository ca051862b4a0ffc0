//! Object store boundary and rename orchestration.
//!
//! The store is a narrow async trait so the pipeline and its tests never
//! touch the SDK directly; [`S3Store`] is the production implementation.

pub(crate) mod rename;
pub(crate) mod s3;

pub use rename::{rename, PollSettings};
pub use s3::S3Store;

use crate::error::StoreError;
use async_trait::async_trait;

/// Narrow interface over a bucket-oriented remote store.
///
/// Every successful `put_object`/`copy_object` leaves a publicly readable
/// object behind; there is no cleanup of orphans on partial failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store content at `key` with public-read visibility.
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Copy `source_key` to `dest_key`, preserving public-read visibility.
    async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), StoreError>;

    /// Delete the object at `key`.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Check whether an object currently exists at `key`.
    ///
    /// The store is eventually consistent; a fresh copy may not be visible
    /// yet and a fresh delete may still be.
    async fn object_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Deterministic public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
