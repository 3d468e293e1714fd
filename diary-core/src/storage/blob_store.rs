//! Content-addressed blob storage
//!
//! Stores attachment files using their SHA-256 hash as key, in a two-level
//! directory structure, and hands out `<base_url>/<hash>` locations.
//!
//! Example: hash "abcd1234..." is stored at "blobs/ab/cd/abcd1234..."

use crate::api::ObjectStorage;
use crate::database::PendingFile;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Content-addressed blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    base_url: String,
}

impl BlobStore {
    /// Create a blob store at `root` whose files resolve under `base_url`
    pub fn new(root: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Write data to blob store, returns SHA-256 hash
    pub async fn write(&self, data: &[u8]) -> Result<String> {
        let hash = calculate_hash(data);

        if self.exists(&hash).await? {
            tracing::debug!("Blob already exists: {}", hash);
            return Ok(hash);
        }

        let path = self.get_path(&hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Temp file then rename, so a reader never sees a partial blob
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(temp_path, &path).await?;

        tracing::debug!("Wrote blob: {} ({} bytes)", hash, data.len());

        Ok(hash)
    }

    /// Read data from blob store
    pub async fn read(&self, hash: &str) -> Result<Vec<u8>> {
        if !self.exists(hash).await? {
            return Err(AppError::BlobStore(format!("Blob not found: {}", hash)));
        }

        let path = self.get_path(hash);
        let mut file = fs::File::open(&path).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;

        Ok(data)
    }

    /// Check if a blob exists
    pub async fn exists(&self, hash: &str) -> Result<bool> {
        Ok(is_hash(hash) && self.get_path(hash).exists())
    }

    /// Public location of a stored blob
    pub fn url_for(&self, hash: &str) -> String {
        format!("{}/{}", self.base_url, hash)
    }

    /// Hash component of a URL issued by this store
    pub fn hash_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|hash| is_hash(hash))
    }

    /// Get file path for a hash
    fn get_path(&self, hash: &str) -> PathBuf {
        let prefix1 = &hash[0..2];
        let prefix2 = &hash[2..4];
        self.root.join(prefix1).join(prefix2).join(hash)
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for BlobStore {
    async fn upload(&self, file: &PendingFile) -> Result<String> {
        let hash = self.write(&file.data).await?;
        let url = self.url_for(&hash);

        tracing::info!("Uploaded {} ({} bytes) to {}", file.filename, file.size(), url);

        Ok(url)
    }
}

/// SHA-256 of data as lowercase hex
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn is_hash(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("blobs"), "https://media.example/blobs/");
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;

        let data = b"Hello, World!";
        let hash = store.write(data).await.unwrap();

        let read_data = store.read(&hash).await.unwrap();
        assert_eq!(data, read_data.as_slice());
    }

    #[tokio::test]
    async fn test_hash_consistency() {
        let (store, _temp) = create_test_store().await;

        let hash1 = store.write(b"Test data").await.unwrap();
        let hash2 = store.write(b"Test data").await.unwrap();

        assert_eq!(hash1, hash2);
        assert!(store.exists(&hash1).await.unwrap());
        assert!(!store.exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_structure() {
        let (store, _temp) = create_test_store().await;

        let hash = store.write(b"Directory test").await.unwrap();

        let path = store.get_path(&hash);
        assert!(path.exists());

        let parent = path.parent().unwrap();
        let grandparent = parent.parent().unwrap();

        assert_eq!(parent.file_name().unwrap(), &hash[2..4]);
        assert_eq!(grandparent.file_name().unwrap(), &hash[0..2]);
    }

    #[tokio::test]
    async fn test_upload_returns_resolvable_url() {
        let (store, _temp) = create_test_store().await;

        let file = PendingFile::new("photo.png", "image/png", b"png bytes".to_vec());
        let url = store.upload(&file).await.unwrap();

        assert!(url.starts_with("https://media.example/blobs/"));

        let hash = store.hash_from_url(&url).unwrap();
        assert_eq!(store.read(hash).await.unwrap(), b"png bytes");

        assert_eq!(store.hash_from_url("https://elsewhere.example/abc"), None);
    }
}
