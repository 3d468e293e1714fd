//! Entries service
//!
//! Submit and delete flows for diary entries. An update commits staged
//! attachment deletions only after the update call succeeds, and uploads
//! newly selected files only after the deletions went through.

use crate::api::{DiaryApi, ObjectStorage};
use crate::database::{Attachment, DateSpan, Draft, Entry};
use crate::error::Result;
use crate::services::attachments::upload_file;
use crate::services::drafts::{EditMode, EditSession};
use std::sync::Arc;

/// What a successful submit changed
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub entry: Entry,
    pub uploaded: Vec<Attachment>,
    /// Attachment ids removed by committing staged deletions
    pub deleted_attachments: Vec<i64>,
}

#[derive(Clone)]
pub struct EntriesService {
    api: Arc<dyn DiaryApi>,
    storage: Arc<dyn ObjectStorage>,
}

impl EntriesService {
    pub fn new(api: Arc<dyn DiaryApi>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { api, storage }
    }

    pub fn api(&self) -> &dyn DiaryApi {
        self.api.as_ref()
    }

    pub async fn list_entries(&self, span: Option<DateSpan>) -> Result<Vec<Entry>> {
        self.api.list_entries(span).await
    }

    pub async fn list_drafts(&self) -> Result<Vec<Draft>> {
        self.api.list_drafts().await
    }

    /// Open an existing entry for editing with its current attachments
    pub async fn open_entry(&self, entry: &Entry) -> Result<EditSession> {
        let attachments = self.api.list_attachments(entry.id).await?;
        Ok(EditSession::edit(entry, attachments))
    }

    /// Create or update the entry behind `session`.
    ///
    /// Once a create succeeds the session switches to edit mode for the new
    /// entry, so a retry after a failed upload updates instead of creating
    /// a second entry.
    pub async fn submit(&self, session: &mut EditSession) -> Result<SubmitOutcome> {
        match session.mode() {
            EditMode::Create => self.create(session).await,
            EditMode::Edit { entry_id } => self.update(session, entry_id).await,
        }
    }

    async fn create(&self, session: &mut EditSession) -> Result<SubmitOutcome> {
        let req = session.form().to_create_request()?;

        tracing::info!("Creating entry for {}", req.entry_date);
        let entry = self.api.create_entry(req).await?;
        tracing::info!("Entry created: {}", entry.id);

        session.mark_created(&entry);

        if let Some(draft_id) = session.take_source_draft() {
            match self.api.delete_draft(draft_id).await {
                Ok(()) => tracing::info!("Converted draft {} into entry {}", draft_id, entry.id),
                Err(e) => tracing::warn!(
                    "Failed to delete draft {} after creating entry {}: {}",
                    draft_id,
                    entry.id,
                    e
                ),
            }
        }

        let uploaded = self.upload(session, entry.id).await?;

        Ok(SubmitOutcome {
            entry,
            uploaded,
            deleted_attachments: Vec::new(),
        })
    }

    async fn update(&self, session: &mut EditSession, entry_id: i64) -> Result<SubmitOutcome> {
        let req = session.form().to_update_request(entry_id)?;

        tracing::info!("Updating entry: {}", entry_id);
        let entry = self.api.update_entry(req).await?;
        session.mark_saved(&entry);

        let deleted_attachments = session
            .attachments_mut()
            .commit(self.api.as_ref(), entry_id)
            .await?;
        let uploaded = self.upload(session, entry_id).await?;

        tracing::info!(
            "Entry updated: {} (-{} +{} attachments)",
            entry_id,
            deleted_attachments.len(),
            uploaded.len()
        );

        Ok(SubmitOutcome {
            entry,
            uploaded,
            deleted_attachments,
        })
    }

    /// Upload pending files one at a time. Each uploaded file leaves the
    /// pending list at once, so a retry after a failure only sends the rest.
    async fn upload(&self, session: &mut EditSession, entry_id: i64) -> Result<Vec<Attachment>> {
        let mut uploaded = Vec::with_capacity(session.pending_files().len());

        while let Some(file) = session.pending_files().first() {
            let attachment =
                upload_file(self.api.as_ref(), self.storage.as_ref(), entry_id, file).await?;

            session.remove_pending_file(0);
            session.attachments_mut().push_visible(attachment.clone());
            uploaded.push(attachment);
        }

        Ok(uploaded)
    }

    pub async fn delete_entry(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting entry: {}", id);

        self.api.delete_entry(id).await?;

        tracing::info!("Entry deleted: {}", id);
        Ok(())
    }

    pub async fn delete_draft(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting draft: {}", id);

        self.api.delete_draft(id).await
    }
}
