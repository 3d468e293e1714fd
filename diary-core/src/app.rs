//! Application state and initialization
//!
//! This module wires the bundled collaborators together.
//! Everything a presentation layer needs is reachable through AppState.

use crate::api::{DiaryApi, ObjectStorage};
use crate::config::DEFAULT_LOG_FILTER;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{EntriesService, LocalDiaryApi, ViewModeController};
use crate::storage::BlobStore;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub repo: Repository,
    pub blob_store: Arc<BlobStore>,
    pub api: Arc<LocalDiaryApi>,
}

impl AppState {
    /// Application setup - opens `<dir>/diary.db` and `<dir>/blobs`
    pub async fn setup(app_data_dir: &Path, public_base_url: &str) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        tokio::fs::create_dir_all(app_data_dir).await?;

        let pool = create_pool(&app_data_dir.join("diary.db")).await?;
        let repo = Repository::new(pool);

        let blob_store = BlobStore::new(app_data_dir.join("blobs"), public_base_url);
        blob_store.initialize().await?;

        let api = Arc::new(LocalDiaryApi::with_statistics_generator(repo.clone()));

        tracing::info!("Application initialized successfully");

        Ok(Self {
            app_data_dir: app_data_dir.to_path_buf(),
            repo,
            blob_store: Arc::new(blob_store),
            api,
        })
    }

    pub fn diary_api(&self) -> Arc<dyn DiaryApi> {
        self.api.clone()
    }

    pub fn object_storage(&self) -> Arc<dyn ObjectStorage> {
        self.blob_store.clone()
    }

    pub fn entries_service(&self) -> EntriesService {
        EntriesService::new(self.diary_api(), self.object_storage())
    }

    /// A fresh screen controller over the bundled collaborators
    pub fn controller(&self, today: NaiveDate) -> ViewModeController {
        ViewModeController::new(self.diary_api(), self.object_storage(), today)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this again after a
/// subscriber is installed does nothing.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
