//! Object storage double that fails a chosen upload

use crate::api::ObjectStorage;
use crate::database::PendingFile;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to a [`BlobStore`] but fails the upload with the given
/// 1-based call number. Every other call succeeds.
pub struct FlakyStorage {
    inner: BlobStore,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(inner: BlobStore, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn upload(&self, file: &PendingFile) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(AppError::BlobStore("storage down".to_string()));
        }

        self.inner.upload(file).await
    }
}
