//! Storage abstraction layer
//!
//! Ground-truth documents are written and read back through this interface

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

pub mod local;

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read object from storage
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write object to storage
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete object, a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if object exists
    async fn exists(&self, key: &str) -> Result<bool>;
}
