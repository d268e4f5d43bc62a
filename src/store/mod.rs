//! Blob storage layer.
//!
//! The server treats durable storage as an external collaborator behind
//! the [`BlobStore`] trait: opaque byte blobs keyed by string, with no
//! assumptions about the backend beyond put/get/delete/exists semantics.

mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use s3::{create_s3_client, S3BlobStore};

/// Durable key -> bytes storage.
///
/// Implementations must be safe to share across tasks; the server never
/// synchronizes store calls itself.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store a blob under `key`, returning a backend-specific location
    /// string (e.g. an S3 URL).
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StoreError>;

    /// Fetch the blob stored under `key`.
    ///
    /// Returns `StoreError::NotFound` if no such object exists.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Delete the blob stored under `key`.
    ///
    /// Deleting a non-existent key is not an error (S3 semantics).
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
