use async_trait::async_trait;

use super::error::StorageError;

/// Callback invoked with the overall completion percentage (0-100) as bytes
/// transfer. Implementations must emit non-decreasing values ending at 100.
pub type ProgressSink<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Path-keyed blob storage addressed by public URL on the read side.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return the blob's public URL.
    ///
    /// When `progress` is supplied the upload reports incremental progress
    /// through it; otherwise a single-shot write is acceptable.
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<String, StorageError>;

    /// Retrieve all bytes for a blob by key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete a blob by its public URL.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    /// A missing object is not an error; callers in cleanup paths treat
    /// `false` as success.
    async fn delete(&self, url: &str) -> Result<bool, StorageError>;
}
