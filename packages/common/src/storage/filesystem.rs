use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::StorageError;
use super::traits::{BlobStore, ProgressSink};

/// Write chunk size; each written chunk drives the progress sink once.
const CHUNK_SIZE: usize = 64 * 1024;

/// Filesystem-backed blob store keyed by relative path.
///
/// Blobs live at `{root}/{key}` and are served under `{public_base}/{key}`,
/// so the URL returned by `put` round-trips back to a key in `delete`.
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base: String,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at `root`.
    pub async fn new(
        root: PathBuf,
        public_base: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
            max_size,
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    /// Map a public URL back to its storage key.
    fn key_for_url(&self, url: &str) -> Result<String, StorageError> {
        let key = url
            .strip_prefix(&self.public_base)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidKey(format!("URL not served by this store: {url}")))?;
        validate_key(key)?;
        Ok(key.to_string())
    }
}

/// Reject keys that would escape the storage root or confuse URL mapping.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(StorageError::InvalidKey(
            "key must not start or end with '/'".into(),
        ));
    }
    if key.contains('\\') || key.chars().any(char::is_control) {
        return Err(StorageError::InvalidKey(
            "key contains forbidden characters".into(),
        ));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StorageError::InvalidKey(
            "key contains empty or traversal path segments".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<String, StorageError> {
        validate_key(key)?;

        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        if let Some(report) = progress {
            report(0);
        }

        let temp_path = self.temp_path();
        let result = async {
            let mut temp_file = fs::File::create(&temp_path).await?;

            let total = data.len();
            let mut written = 0usize;
            for chunk in data.chunks(CHUNK_SIZE) {
                temp_file.write_all(chunk).await?;
                written += chunk.len();
                if let Some(report) = progress {
                    report((written * 100 / total) as u8);
                }
            }
            temp_file.flush().await?;
            drop(temp_file);

            let blob_path = self.blob_path(key);
            if let Some(parent) = blob_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&temp_path, &blob_path).await?;

            Ok::<_, StorageError>(())
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Some(report) = progress {
            // Covers the empty-blob case; otherwise a repeat of the last value.
            report(100);
        }

        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(fs::try_exists(self.blob_path(key)).await?)
    }

    async fn delete(&self, url: &str) -> Result<bool, StorageError> {
        let key = self.key_for_url(url)?;
        match fs::remove_file(self.blob_path(&key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
